//! Identity backends.

use crate::error::AuthError;
use crate::types::{Session, SkillLevel};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Result of a backend call
pub type AuthResult = Result<Session, AuthError>;

/// Sign-in form
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Registration form
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Chosen password
    pub password: String,
    /// Password typed a second time
    pub confirm_password: String,
    /// Declared skill level
    pub skill_level: Option<SkillLevel>,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("skill_level", &self.skill_level)
            .finish_non_exhaustive()
    }
}

/// Where identities come from
pub trait AuthBackend: Send + Sync {
    /// Sign an existing user in
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the credentials are rejected.
    fn login(&self, credentials: LoginCredentials) -> Pin<Box<dyn Future<Output = AuthResult> + Send>>;

    /// Create an account and sign it in
    ///
    /// The form has already passed the password and level checks.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the account cannot be created.
    fn register(&self, form: RegistrationForm) -> Pin<Box<dyn Future<Output = AuthResult> + Send>>;
}

/// Backend that accepts any non-empty credentials after a fixed latency
///
/// Every sign-in returns the same demo profile under the given email.
#[derive(Clone, Debug)]
pub struct DemoAuthBackend {
    latency: Duration,
}

impl DemoAuthBackend {
    /// Backend answering after `latency`
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(latency: Duration) -> Arc<dyn AuthBackend> {
        Arc::new(Self::new(latency))
    }
}

impl Default for DemoAuthBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl AuthBackend for DemoAuthBackend {
    fn login(&self, credentials: LoginCredentials) -> Pin<Box<dyn Future<Output = AuthResult> + Send>> {
        let latency = self.latency;
        Box::pin(async move {
            if credentials.email.trim().is_empty() {
                return Err(AuthError::MissingField("email"));
            }
            if credentials.password.is_empty() {
                return Err(AuthError::MissingField("password"));
            }

            tokio::time::sleep(latency).await;

            let session = Session::new(
                "Juan Pérez",
                credentials.email,
                "+51 999 123 456",
                SkillLevel::Intermediate,
            )?
            .with_completed_classes(12);

            tracing::info!(user_id = %session.user_id(), "Demo login accepted");
            Ok(session)
        })
    }

    fn register(&self, form: RegistrationForm) -> Pin<Box<dyn Future<Output = AuthResult> + Send>> {
        let latency = self.latency;
        Box::pin(async move {
            let level = form.skill_level.ok_or(AuthError::MissingSkillLevel)?;

            tokio::time::sleep(latency).await;

            let session = Session::new(form.name, form.email, form.phone, level)?;
            tracing::info!(user_id = %session.user_id(), "Demo account registered");
            Ok(session)
        })
    }
}
