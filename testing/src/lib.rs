//! # Classbook Testing
//!
//! Testing utilities and helpers for the Classbook reducer architecture.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `TokioClock`)
//! - The `ReducerTest` Given-When-Then builder
//! - Effect assertion helpers
//! - proptest strategies for form-style input
//!
//! ## Example
//!
//! ```ignore
//! use classbook_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(WorkflowReducer)
//!     .with_env(test_environment())
//!     .given_state(WorkflowState::signed_in(session))
//!     .when_action(WorkflowAction::SubmitDraft)
//!     .then_state(|s| assert!(s.phase.is_method_selection()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use classbook_core::environment::Clock;

pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use classbook_testing::mocks::FixedClock;
    /// use classbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that follows tokio's (possibly paused) time
    ///
    /// Reports `base` plus the tokio time elapsed since construction, so tests
    /// running under `#[tokio::test(start_paused = true)]` can assert exact
    /// offsets between timestamped events.
    ///
    /// Must be created inside a tokio runtime.
    #[derive(Debug, Clone)]
    pub struct TokioClock {
        base: DateTime<Utc>,
        origin: tokio::time::Instant,
    }

    impl TokioClock {
        /// Start a clock reading `base` at the current tokio instant
        #[must_use]
        pub fn starting_at(base: DateTime<Utc>) -> Self {
            Self {
                base,
                origin: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.origin.elapsed())
                .unwrap_or_else(|_| chrono::Duration::zero());
            self.base + elapsed
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Text a user might type into a form field: sometimes empty, sometimes
    /// only whitespace, usually a short printable value.
    pub fn field_text() -> impl Strategy<Value = String> {
        prop_oneof![
            1 => Just(String::new()),
            1 => Just("   ".to_string()),
            4 => "[A-Za-z0-9@. -]{1,24}",
        ]
    }
}

pub use mocks::{test_clock, FixedClock, TokioClock};
