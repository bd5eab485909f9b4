//! # Seat Sale Core
//!
//! Core traits and types for contracts hosted on a deterministic, transactional ledger.
//!
//! This crate provides the fundamental abstractions shared by the ledger host
//! (`seatsale-runtime`), the test harness (`seatsale-testing`) and the ticket sale
//! contract itself (`ticket-sale`).
//!
//! ## Core Concepts
//!
//! - **State**: Contract storage, owned and `Clone` so the host can work on a copy
//! - **Action**: A contract method invocation (method name + parameters)
//! - **Reducer**: `(State, Action, CallContext, Environment) → Result<Effects, Error>`
//! - **Effect**: Descriptions of fund transfers, emitted events and return values
//! - **Environment**: Injected dependencies (the logical clock)
//!
//! ## Execution Model
//!
//! - A call either commits (state swap + effects) or aborts (nothing happens)
//! - Reducers never perform I/O; the host executes the returned effects
//! - Committed events land in an append-only [`event_log::EventLog`]
//!
//! ## Example
//!
//! ```ignore
//! use seatsale_core::*;
//!
//! impl Reducer for CounterContract {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!     type Error = CounterError;
//!     type Init = u64;
//!
//!     fn construct(&self, start: u64, call: &CallContext, _env: &CounterEnvironment)
//!         -> Result<(CounterState, Effects), CounterError>
//!     {
//!         Ok((CounterState { owner: call.sender, count: start }, Effects::new()))
//!     }
//!
//!     fn reduce(&self, state: &mut CounterState, action: CounterAction,
//!         call: &CallContext, _env: &CounterEnvironment) -> Result<Effects, CounterError>
//!     {
//!         state.count += 1;
//!         Ok(smallvec![Effect::Return(ReturnValue::Unit)])
//!     }
//! }
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub use action::Action;
pub use effect::{Effect, Effects};
pub use environment::Clock;
pub use ledger::{Address, Amount, CallContext, ReturnValue, TxId};
pub use position::{BlockHeight, CommitPosition};
pub use reducer::Reducer;

/// Event types and bincode serialization
pub mod event;

/// Append-only event log abstraction
pub mod event_log;

/// Ledger gateway boundary (submit, receipts, historical events)
pub mod gateway;

/// Ledger primitives: addresses, amounts, transaction ids
pub mod ledger;

/// Logical clock and commit positions
pub mod position;

/// Read models folded from the event log
pub mod projection;

/// Action module - contract method invocations
///
/// Actions are the inputs of a contract. Each variant is one method; the
/// variant's fields are the method parameters. Actions travel through the
/// gateway bincode-encoded inside a [`gateway::Transaction`].
pub mod action {
    use serde::{Serialize, de::DeserializeOwned};

    /// A contract method invocation that can be encoded into a transaction.
    ///
    /// # Example
    ///
    /// ```
    /// use seatsale_core::action::Action;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize)]
    /// enum CounterAction {
    ///     Increment,
    /// }
    ///
    /// impl Action for CounterAction {
    ///     fn method(&self) -> &'static str {
    ///         match self {
    ///             CounterAction::Increment => "increment",
    ///         }
    ///     }
    /// }
    ///
    /// assert_eq!(CounterAction::Increment.method(), "increment");
    /// ```
    pub trait Action: Serialize + DeserializeOwned + Send + 'static {
        /// Method name used in transactions, receipts and logs
        fn method(&self) -> &'static str;

        /// Whether the method only reads state.
        ///
        /// Read-only methods may be evaluated as queries without committing.
        fn is_read_only(&self) -> bool {
            false
        }
    }
}

/// Reducer module - The core trait for contract business logic
///
/// Reducers are pure functions: `(State, Action, CallContext, Environment) → Result<Effects, Error>`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effects;
    use super::ledger::CallContext;

    /// The Reducer trait - core abstraction for contract logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: Contract storage
    /// - `Action`: Contract methods
    /// - `Environment`: Injected dependencies
    /// - `Error`: Hard-abort reasons
    /// - `Init`: Constructor arguments
    ///
    /// # Atomicity
    ///
    /// `reduce` may freely mutate `state` before returning `Err`: the host always
    /// runs it against a working copy and drops that copy on abort. Effects are
    /// likewise only executed when the call returns `Ok`.
    pub trait Reducer {
        /// Contract storage
        type State: Clone;

        /// Contract methods
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reasons a call hard-aborts
        type Error: std::error::Error;

        /// Constructor arguments
        type Init;

        /// Create the contract's initial storage.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the arguments are invalid; no storage is created.
        fn construct(
            &self,
            init: Self::Init,
            call: &CallContext,
            env: &Self::Environment,
        ) -> Result<(Self::State, Effects), Self::Error>;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the state and caller
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the host
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` to hard-abort the call.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            call: &CallContext,
            env: &Self::Environment,
        ) -> Result<Effects, Self::Error>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe what the host should do once a call commits.
/// They are values (not execution).
pub mod effect {
    use super::event::SerializedEvent;
    use super::ledger::{Address, Amount, ReturnValue};
    use smallvec::SmallVec;

    /// Effects returned from a single reducer call
    pub type Effects = SmallVec<[Effect; 4]>;

    /// Effect type - describes a side effect to be executed on commit
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Effect {
        /// Move value from the contract's balance to an account
        Transfer {
            /// Recipient
            to: Address,
            /// Value to move
            amount: Amount,
        },

        /// Append an event to the event log
        Emit(SerializedEvent),

        /// Value handed back to the caller
        Return(ReturnValue),
    }

    impl Effect {
        /// Transfer amount if this is a transfer to `to`
        #[must_use]
        pub fn transfer_to(&self, to: Address) -> Option<Amount> {
            match self {
                Self::Transfer { to: recipient, amount } if *recipient == to => Some(*amount),
                _ => None,
            }
        }

        /// Returned value, if this is a return effect
        #[must_use]
        pub const fn returned(&self) -> Option<&ReturnValue> {
            match self {
                Self::Return(value) => Some(value),
                _ => None,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use super::position::BlockHeight;

    /// Clock trait - abstracts the ledger's logical clock for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Host - reads the chain height shared with the ledger
    /// impl Clock for ChainClock {
    ///     fn now(&self) -> BlockHeight {
    ///         BlockHeight::new(self.height.load(Ordering::SeqCst))
    ///     }
    /// }
    ///
    /// // Test - fixed height for deterministic tests
    /// struct FixedClock { height: BlockHeight }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> BlockHeight {
    ///         self.height
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Current block height
        fn now(&self) -> BlockHeight;
    }
}
