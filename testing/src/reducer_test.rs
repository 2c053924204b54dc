//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use classbook_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use classbook_testing::ReducerTest;
///
/// ReducerTest::new(LifecycleReducer)
///     .with_env(test_environment())
///     .given_state(LifecycleState::seeded())
///     .when_action(LifecycleAction::Cancel { id: BookingId::new(1) })
///     .then_state(|state| {
///         assert_eq!(state.bookings.len(), 5);
///     })
///     .then_effects(|effects| {
///         assertions::assert_effects_count(effects, 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When)
    ///
    /// May be called several times; actions are applied in order and the
    /// effect assertions see the effects of the last one only.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(!self.actions.is_empty(), "Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = smallvec::SmallVec::<[Effect<A>; 4]>::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
///
/// The `has_*` helpers look through `Parallel`, `Sequential` and
/// `Cancellable` wrappers.
pub mod assertions {
    use classbook_core::effect::{Effect, EffectId};

    fn any_nested<A>(effects: &[Effect<A>], pred: &dyn Fn(&Effect<A>) -> bool) -> bool {
        let mut found = false;
        for effect in effects {
            effect.visit(&mut |e| found |= pred(e));
        }
        found
    }

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            any_nested(effects, &|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain a Delay matching `pred`
    ///
    /// # Panics
    ///
    /// Panics if no matching Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay<A>(
        effects: &[Effect<A>],
        pred: impl Fn(std::time::Duration, &A) -> bool,
    ) {
        assert!(
            any_nested(effects, &|e| matches!(
                e,
                Effect::Delay { duration, action } if pred(*duration, action)
            )),
            "Expected a matching Delay effect, but none found"
        );
    }

    /// Assert that effects cancel the given id
    ///
    /// # Panics
    ///
    /// Panics if no `Cancel` for `id` is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A>(effects: &[Effect<A>], id: &EffectId) {
        assert!(
            any_nested(effects, &|e| matches!(e, Effect::Cancel { id: c } if c == id)),
            "Expected Effect::Cancel for {id}, but none found"
        );
    }

    /// Assert that effects schedule work under the given cancellation id
    ///
    /// # Panics
    ///
    /// Panics if no `Cancellable` for `id` is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_cancellable<A>(effects: &[Effect<A>], id: &EffectId) {
        assert!(
            any_nested(effects, &|e| matches!(e, Effect::Cancellable { id: c, .. } if c == id)),
            "Expected Effect::Cancellable for {id}, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classbook_core::effect::{Effect, EffectId};
    use classbook_core::reducer::Reducer;
    use std::time::Duration;

    const TICK: EffectId = EffectId::new("tick");

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
        Schedule,
        Stop,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.count -= 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::Schedule => smallvec::smallvec![Effect::Parallel(vec![
                    Effect::Delay {
                        duration: Duration::from_secs(1),
                        action: Box::new(TestAction::Increment),
                    }
                    .cancellable(TICK),
                ])],
                TestAction::Stop => smallvec::smallvec![Effect::Cancel { id: TICK }],
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_applies_actions_in_order() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Decrement)
            .when_action(TestAction::Decrement)
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_nested_assertions() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Schedule)
            .then_effects(|effects| {
                assertions::assert_has_cancellable(effects, &TICK);
                assertions::assert_has_delay(effects, |d, a| {
                    d == Duration::from_secs(1) && matches!(a, TestAction::Increment)
                });
            })
            .run();

        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Stop)
            .then_effects(|effects| assertions::assert_cancels(effects, &TICK))
            .run();
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<TestAction>::None], 1);
        assertions::assert_effects_count::<TestAction>(&[], 0);
    }
}
