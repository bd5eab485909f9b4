//! Ergonomic testing utilities for contract reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.
//! A call either commits (state and effects are checked) or aborts (the error is checked and
//! the state is expected to be untouched, as the host would leave it).

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use seatsale_core::{Address, CallContext, effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion = Box<dyn FnOnce(&[Effect])>;

/// Type alias for error assertion functions
type ErrorAssertion<E> = Box<dyn FnOnce(&E)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use seatsale_testing::ReducerTest;
///
/// ReducerTest::new(TicketSaleReducer)
///     .with_env(test_environment())
///     .given_state(open_sale())
///     .as_caller(CallContext::new(buyer, Amount::new(50)))
///     .when_action(SaleAction::Reserve { seat, identity: None })
///     .then_state(|state| {
///         assert_eq!(state.ticket(seat).unwrap().holder, buyer);
///     })
///     .then_effects(|effects| {
///         assertions::assert_returned(effects, &ReturnValue::Bool(true));
///     })
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    action: Option<R::Action>,
    call: CallContext,
    state_assertions: Vec<StateAssertion<R::State>>,
    effect_assertions: Vec<EffectAssertion>,
    error_assertions: Vec<ErrorAssertion<R::Error>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
    R::Error: std::fmt::Debug,
{
    /// Create a new reducer test with the given reducer
    ///
    /// The caller defaults to [`Address::ZERO`] with no attached value.
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            call: CallContext::from_sender(Address::ZERO),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
            error_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set who calls and how much value they attach
    #[must_use]
    pub fn as_caller(mut self, call: CallContext) -> Self {
        self.call = call;
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    ///
    /// After an abort the state under test is the untouched initial state.
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the call to abort, and check the error (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::Error) + 'static,
    {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set, if the
    /// call aborts without an error assertion, if it commits although an
    /// error assertion was given, or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let initial = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        // Work on a copy, like the host does
        let mut working = initial.clone();
        let result = self.reducer.reduce(&mut working, action, &self.call, &env);

        match result {
            Ok(effects) => {
                assert!(
                    self.error_assertions.is_empty(),
                    "Expected the call to abort, but it committed with effects {effects:?}"
                );

                for assertion in self.state_assertions {
                    assertion(&working);
                }

                for assertion in self.effect_assertions {
                    assertion(effects.as_slice());
                }
            }
            Err(error) => {
                assert!(
                    !self.error_assertions.is_empty(),
                    "Unexpected abort: {error:?}"
                );

                for assertion in self.error_assertions {
                    assertion(&error);
                }

                // Aborted calls leave no trace
                for assertion in self.state_assertions {
                    assertion(&initial);
                }

                let no_effects: &[Effect] = &[];
                for assertion in self.effect_assertions {
                    assertion(no_effects);
                }
            }
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use seatsale_core::effect::Effect;
    use seatsale_core::{Address, Amount, ReturnValue};

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects(effects: &[Effect]) {
        assert!(
            effects.is_empty(),
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
    pub fn assert_effects_count(effects: &[Effect], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert the value the call returned
    ///
    /// # Panics
    ///
    /// Panics if no return effect is found, or it carries another value.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_returned(effects: &[Effect], expected: &ReturnValue) {
        let returned = effects.iter().rev().find_map(Effect::returned);
        assert_eq!(
            returned,
            Some(expected),
            "Expected return value {expected:?} in {effects:?}"
        );
    }

    /// Assert that exactly `amount` is transferred to `to`
    ///
    /// # Panics
    ///
    /// Panics if the transfers to `to` don't add up to `amount`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_transfer(effects: &[Effect], to: Address, amount: Amount) {
        let total: u64 = effects
            .iter()
            .filter_map(|e| e.transfer_to(to))
            .map(Amount::value)
            .sum();
        assert_eq!(
            total,
            amount.value(),
            "Expected {amount} transferred to {to}, found {total} in {effects:?}"
        );
    }

    /// Assert that no value leaves the contract
    ///
    /// # Panics
    ///
    /// Panics if any transfer effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_transfers(effects: &[Effect]) {
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::Transfer { .. })),
            "Expected no transfers, but found {effects:?}"
        );
    }

    /// Assert that an event of `event_type` is emitted
    ///
    /// # Panics
    ///
    /// Panics if no matching emit effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_emitted(effects: &[Effect], event_type: &str) {
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::Emit(event) if event.event_type == event_type)),
            "Expected a {event_type} event, but found {effects:?}"
        );
    }

    /// Assert that no events are emitted
    ///
    /// # Panics
    ///
    /// Panics if any emit effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_events(effects: &[Effect]) {
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::Emit(_))),
            "Expected no events, but found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatsale_core::{Amount, Effects, ReturnValue, smallvec};
    use std::fmt;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Tip,
        Explode,
    }

    #[derive(Debug, PartialEq)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;
        type Error = Boom;
        type Init = ();

        fn construct(
            &self,
            (): (),
            _call: &CallContext,
            _env: &TestEnv,
        ) -> Result<(TestState, Effects), Boom> {
            Ok((TestState { count: 0 }, Effects::new()))
        }

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            call: &CallContext,
            _env: &Self::Environment,
        ) -> Result<Effects, Boom> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    Ok(smallvec![Effect::Return(ReturnValue::Bool(true))])
                }
                TestAction::Tip => Ok(smallvec![Effect::Transfer {
                    to: call.sender,
                    amount: call.value,
                }]),
                TestAction::Explode => {
                    state.count = -1;
                    Err(Boom)
                }
            }
        }
    }

    #[test]
    fn test_reducer_test_commit() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_returned(effects, &ReturnValue::Bool(true));
                assertions::assert_no_transfers(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_abort_keeps_initial_state() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Explode)
            .then_error(|error| assert_eq!(*error, Boom))
            .then_state(|state| {
                assert_eq!(state.count, 5);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_reducer_test_caller() {
        let tipper = Address::from_low_u64(7);
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .as_caller(CallContext::new(tipper, Amount::new(3)))
            .when_action(TestAction::Tip)
            .then_effects(move |effects| {
                assertions::assert_transfer(effects, tipper, Amount::new(3));
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Unexpected abort")]
    fn test_reducer_test_unexpected_abort_panics() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Explode)
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects(&[]);
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::Return(ReturnValue::Unit)], 1);
        assertions::assert_effects_count(&[], 0);
    }
}
