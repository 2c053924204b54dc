//! Authentication and session handling.
//!
//! [`AuthContext`] owns the signed-in [`Session`]. It restores the session
//! from a [`SessionStore`] on start, delegates identity checks to an
//! [`AuthBackend`] and announces every sign-in and sign-out to subscribers,
//! which is how the booking workflow learns that a session ended.

pub mod backend;
pub mod gate;
pub mod store;

pub use backend::{AuthBackend, AuthResult, DemoAuthBackend, LoginCredentials, RegistrationForm};
pub use gate::{SessionGate, SessionProvider};
pub use store::{InMemorySessionStore, JsonFileSessionStore, SessionStore};

use crate::config::TimingConfig;
use crate::error::AuthError;
use crate::notifier::{Navigator, Notifier};
use crate::types::{Session, ToastKind, View};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Check a registration form before it reaches the backend
///
/// Checks run in a fixed order and the first failure wins: matching
/// passwords, password length, then skill level.
///
/// # Errors
///
/// Returns the first [`AuthError`] found.
pub fn validate_registration(form: &RegistrationForm) -> Result<(), AuthError> {
    if form.password != form.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if form.skill_level.is_none() {
        return Err(AuthError::MissingSkillLevel);
    }
    Ok(())
}

/// How long the success toasts stay up before the profile view opens
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Redirects {
    /// After a sign-in
    pub login: Duration,
    /// After a registration
    pub registration: Duration,
    /// After a registration, before the welcome email toast
    pub welcome_email: Duration,
}

impl Default for Redirects {
    fn default() -> Self {
        Self {
            login: Duration::from_secs(1),
            registration: Duration::from_secs(2),
            welcome_email: Duration::from_secs(1),
        }
    }
}

impl From<&TimingConfig> for Redirects {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            login: timing.login_redirect,
            registration: timing.registration_redirect,
            welcome_email: timing.welcome_email_delay,
        }
    }
}

/// The authentication collaborator
pub struct AuthContext {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    session: watch::Sender<Option<Session>>,
    redirects: Redirects,
    pending_redirect: Mutex<Option<AbortHandle>>,
}

impl AuthContext {
    /// Start the context, restoring any stored session
    ///
    /// An unreadable store is logged and treated as signed out.
    #[must_use]
    pub fn init(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let restored = store.get().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not restore session");
            None
        });

        if let Some(session) = &restored {
            tracing::info!(user_id = %session.user_id(), "Session restored");
        }

        let (session, _) = watch::channel(restored);

        Self {
            backend,
            store,
            notifier,
            navigator,
            session,
            redirects: Redirects::default(),
            pending_redirect: Mutex::new(None),
        }
    }

    /// Use `redirects` instead of the default delays
    #[must_use]
    pub fn with_redirects(mut self, redirects: Redirects) -> Self {
        self.redirects = redirects;
        self
    }

    /// The signed-in user, if any
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Observe sign-ins and sign-outs
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Sign in, then move to the profile view after the login redirect delay
    ///
    /// # Errors
    ///
    /// Returns the backend's [`AuthError`]; an error toast has already been
    /// shown and no session exists.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Session, AuthError> {
        let session = match self.backend.login(credentials).await {
            Ok(session) => session,
            Err(e) => {
                self.notifier
                    .show(ToastKind::Error, "Could not sign in", &e.to_string());
                return Err(e);
            },
        };

        self.begin(&session);
        self.notifier.show(
            ToastKind::Success,
            "Welcome back!",
            &format!("Signed in as {}", session.display_name()),
        );

        let navigator = Arc::clone(&self.navigator);
        let delay = self.redirects.login;
        self.schedule_redirect(async move {
            tokio::time::sleep(delay).await;
            navigator.go_to(View::Profile);
        });
        Ok(session)
    }

    /// Create an account and sign it in
    ///
    /// The welcome email toast and the move to the profile view follow after
    /// their configured delays.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] from [`validate_registration`] or the backend.
    /// No session is created on error.
    pub async fn register(&self, form: RegistrationForm) -> Result<Session, AuthError> {
        let result = match validate_registration(&form) {
            Ok(()) => self.backend.register(form).await,
            Err(e) => Err(e),
        };

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                self.notifier
                    .show(ToastKind::Error, "Could not create account", &e.to_string());
                return Err(e);
            },
        };

        self.begin(&session);
        self.notifier.show(
            ToastKind::Success,
            "Account created!",
            &format!("Welcome, {}", session.display_name()),
        );

        let notifier = Arc::clone(&self.notifier);
        let navigator = Arc::clone(&self.navigator);
        let Redirects {
            registration,
            welcome_email,
            ..
        } = self.redirects;
        let email = session.email().to_string();
        self.schedule_redirect(async move {
            tokio::time::sleep(welcome_email).await;
            notifier.show(ToastKind::Info, "Welcome email sent", &format!("Sent to {email}"));
            tokio::time::sleep(registration.saturating_sub(welcome_email)).await;
            navigator.go_to(View::Profile);
        });
        Ok(session)
    }

    /// Sign out, forget the stored session and return home
    ///
    /// A profile redirect still pending from the sign-in is dropped.
    pub fn teardown(&self) {
        self.cancel_redirect();
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not clear stored session");
        }

        let previous = self.session.send_replace(None);
        if let Some(session) = previous {
            tracing::info!(user_id = %session.user_id(), "Session ended");
            crate::metrics::record_session("ended");
        }

        self.notifier
            .show(ToastKind::Info, "Session closed", "See you in the water soon");
        self.navigator.go_to(View::Home);
    }

    fn schedule_redirect<F>(&self, redirect: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(redirect).abort_handle();
        match self.pending_redirect.lock() {
            Ok(mut pending) => {
                if let Some(previous) = pending.replace(handle) {
                    previous.abort();
                }
            },
            Err(_) => tracing::error!("Redirect slot poisoned, redirect cannot be cancelled"),
        }
    }

    fn cancel_redirect(&self) {
        if let Ok(mut pending) = self.pending_redirect.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }

    fn begin(&self, session: &Session) {
        if let Err(e) = self.store.set(session) {
            tracing::warn!(error = %e, "Could not persist session");
        }
        self.session.send_replace(Some(session.clone()));
        tracing::info!(user_id = %session.user_id(), "Session started");
        crate::metrics::record_session("started");
    }
}

impl SessionProvider for AuthContext {
    fn current_session(&self) -> Option<Session> {
        Self::current_session(self)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}
