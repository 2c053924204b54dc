//! Test doubles for the booking ports.
//!
//! Recording implementations of [`Notifier`], [`Navigator`] and
//! [`BookingLedger`], a [`SessionProvider`] whose session can be swapped at
//! will, and a gateway that fails on purpose.

use crate::auth::SessionProvider;
use crate::error::SettlementError;
use crate::lifecycle::manager::BookingLedger;
use crate::notifications::NotificationEvent;
use crate::notifier::{Navigator, Notifier};
use crate::payment::{PaymentGateway, SettlementResult};
use crate::types::{Booking, PaymentAttempt, Session, ToastKind, View};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A toast as recorded by [`RecordingNotifier`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    /// Toast kind
    pub kind: ToastKind,
    /// Headline
    pub title: String,
    /// Body text
    pub detail: String,
}

/// Notifier that remembers everything it was asked to show
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts shown so far, oldest first
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.toasts).clone()
    }

    /// Sequenced notifications delivered so far, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<NotificationEvent> {
        lock(&self.events).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, kind: ToastKind, title: &str, detail: &str) {
        lock(&self.toasts).push(Toast {
            kind,
            title: title.to_string(),
            detail: detail.to_string(),
        });
    }

    fn deliver(&self, event: &NotificationEvent) {
        lock(&self.events).push(event.clone());
    }
}

/// Navigator that remembers where it was sent
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    views: Mutex<Vec<View>>,
    external: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-app views visited, oldest first
    #[must_use]
    pub fn views(&self) -> Vec<View> {
        lock(&self.views).clone()
    }

    /// External pages opened, oldest first
    #[must_use]
    pub fn external(&self) -> Vec<String> {
        lock(&self.external).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, view: View) {
        lock(&self.views).push(view);
    }

    fn open_external(&self, url: &str) {
        lock(&self.external).push(url.to_string());
    }
}

/// Session provider whose session the test controls
#[derive(Debug, Default)]
pub struct MockSessionProvider {
    session: Mutex<Option<Session>>,
}

impl MockSessionProvider {
    /// Provider with nobody signed in
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Provider with `session` signed in
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Replace the session
    pub fn set(&self, session: Option<Session>) {
        *lock(&self.session) = session;
    }
}

impl SessionProvider for MockSessionProvider {
    fn current_session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }
}

/// Gateway that always declines after a latency
#[derive(Clone, Debug)]
pub struct DecliningGateway {
    latency: Duration,
    reason: String,
}

impl DecliningGateway {
    /// Gateway declining with `reason` after `latency`
    #[must_use]
    pub fn new(latency: Duration, reason: impl Into<String>) -> Self {
        Self {
            latency,
            reason: reason.into(),
        }
    }
}

impl PaymentGateway for DecliningGateway {
    fn settle(
        &self,
        attempt: PaymentAttempt,
    ) -> Pin<Box<dyn Future<Output = SettlementResult> + Send>> {
        let latency = self.latency;
        let reason = self.reason.clone();
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            tracing::info!(attempt_id = %attempt.id, %reason, "Mock payment declined");
            Err(SettlementError::Declined(reason))
        })
    }
}

/// Ledger that keeps recorded bookings in memory
#[derive(Debug, Default)]
pub struct RecordingLedger {
    bookings: Mutex<Vec<Booking>>,
}

impl RecordingLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookings recorded so far, oldest first
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        lock(&self.bookings).clone()
    }
}

impl BookingLedger for RecordingLedger {
    fn record(&self, booking: Booking) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        lock(&self.bookings).push(booking);
        Box::pin(std::future::ready(()))
    }
}
