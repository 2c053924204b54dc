//! # Classbook Core
//!
//! Core traits and types for the Classbook reducer architecture.
//!
//! Every stateful feature in the workspace (the booking workflow, the booking
//! lifecycle manager) is written as a reducer: a pure function that applies an
//! action to state and returns descriptions of the side effects to run.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (user intents and effect feedback)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use classbook_core::*;
//!
//! #[derive(Clone, Debug)]
//! enum TimerAction {
//!     Start,
//!     Elapsed,
//! }
//!
//! impl Reducer for TimerReducer {
//!     type State = TimerState;
//!     type Action = TimerAction;
//!     type Environment = TimerEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TimerState,
//!         action: TimerAction,
//!         env: &TimerEnvironment,
//!     ) -> SmallVec<[Effect<TimerAction>; 4]> {
//!         match action {
//!             TimerAction::Start => smallvec![delay! {
//!                 duration: Duration::from_secs(5),
//!                 action: TimerAction::Elapsed
//!             }],
//!             TimerAction::Elapsed => SmallVec::new(),
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for building effects
#[macro_use]
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce at most a handful of effects, so the return
        /// type keeps up to four inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution), composable, and cancellable.
pub mod effect {
    use serde::{Deserialize, Serialize};
    use std::borrow::Cow;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier grouping in-flight effects so they can be cancelled together
    ///
    /// Reducers wrap scheduled work in [`Effect::Cancellable`] under an id and
    /// later emit [`Effect::Cancel`] with the same id to abort whatever is still
    /// pending (for example a timer that must not fire after a reset).
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Create an id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, staged notifications, resets)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run an effect under a cancellation id
        ///
        /// Every task spawned while executing `effect` is registered under `id`
        /// until it finishes or is cancelled.
        Cancellable {
            /// Cancellation group
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Abort every pending task registered under `id`
        ///
        /// Cancelling an id with nothing pending is a no-op.
        Cancel {
            /// Cancellation group to abort
            id: EffectId,
        },
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel { id } => {
                    f.debug_struct("Effect::Cancel").field("id", id).finish()
                },
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap this effect so it can later be aborted with [`Effect::Cancel`]
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Visit this effect and every nested effect, depth first
        ///
        /// Useful for assertions that need to look inside `Parallel`,
        /// `Sequential` and `Cancellable` wrappers.
        pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a Effect<Action>)) {
            f(self);
            match self {
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    for effect in effects {
                        effect.visit(f);
                    }
                },
                Effect::Cancellable { effect, .. } => effect.visit(f),
                Effect::None
                | Effect::Delay { .. }
                | Effect::Future(_)
                | Effect::Cancel { .. } => {},
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = FixedClock::new(time);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use effect::{Effect, EffectId};
pub use environment::{Clock, SystemClock};
pub use reducer::Reducer;
