//! Outbound ports: user-facing notifications and navigation.
//!
//! Both are fire-and-forget. The core never inspects a return value.

use crate::notifications::NotificationEvent;
use crate::types::{ToastKind, View};
use std::sync::Arc;

/// Shows notifications to the user
pub trait Notifier: Send + Sync {
    /// Show a toast
    fn show(&self, kind: ToastKind, title: &str, detail: &str);

    /// Deliver a sequenced notification
    ///
    /// Defaults to showing it as a toast.
    fn deliver(&self, event: &NotificationEvent) {
        self.show(event.kind, &event.title, &event.detail);
    }
}

/// Moves the user between views
pub trait Navigator: Send + Sync {
    /// Switch to an in-app view
    fn go_to(&self, view: View);

    /// Open an external page in a new browsing context
    fn open_external(&self, url: &str);
}

/// Notifier that writes every notification to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn Notifier> {
        Arc::new(Self)
    }
}

impl Notifier for TracingNotifier {
    fn show(&self, kind: ToastKind, title: &str, detail: &str) {
        tracing::info!(?kind, title, detail, "Toast");
    }

    fn deliver(&self, event: &NotificationEvent) {
        tracing::info!(
            channel = ?event.channel,
            audience = %event.audience,
            fired_at = %event.fired_at,
            title = %event.title,
            detail = %event.detail,
            "Notification delivered"
        );
    }
}

/// Navigator that writes every navigation to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNavigator;

impl TracingNavigator {
    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn Navigator> {
        Arc::new(Self)
    }
}

impl Navigator for TracingNavigator {
    fn go_to(&self, view: View) {
        tracing::info!(%view, "Navigate");
    }

    fn open_external(&self, url: &str) {
        tracing::info!(url, "Open external page");
    }
}
