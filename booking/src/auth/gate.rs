//! Access gate for the booking workflow.

use crate::error::AccessDenied;
use crate::types::Session;
use std::sync::Arc;

/// Anything that knows who is signed in
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, if any
    fn current_session(&self) -> Option<Session>;
}

/// Refuses entry to callers without a session
#[derive(Clone)]
pub struct SessionGate {
    provider: Arc<dyn SessionProvider>,
}

impl SessionGate {
    /// Gate reading sessions from `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    /// The current session
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] if nobody is signed in.
    pub fn require_session(&self) -> Result<Session, AccessDenied> {
        self.provider.current_session().ok_or(AccessDenied)
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("signed_in", &self.provider.current_session().is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SkillLevel;

    struct Fixed(Option<Session>);

    impl SessionProvider for Fixed {
        fn current_session(&self) -> Option<Session> {
            self.0.clone()
        }
    }

    #[test]
    fn denies_without_session() {
        let gate = SessionGate::new(Arc::new(Fixed(None)));
        assert_eq!(gate.require_session(), Err(AccessDenied));
    }

    #[test]
    fn returns_session_when_signed_in() {
        let session = Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap();
        let gate = SessionGate::new(Arc::new(Fixed(Some(session.clone()))));
        assert_eq!(gate.require_session(), Ok(session));
    }
}
