//! # Seat Sale Testing
//!
//! Testing utilities and helpers for contracts built on `seatsale-core`.
//!
//! This crate provides:
//! - Mock implementations of the clock, event log and ledger gateway
//! - A Given-When-Then harness for reducers
//! - Property-based testing strategies for ledger primitives
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use seatsale_testing::{ReducerTest, assertions, test_clock};
//!
//! #[test]
//! fn reserve_refunds_overpayment() {
//!     ReducerTest::new(TicketSaleReducer)
//!         .with_env(SaleEnvironment::new(Arc::new(test_clock())))
//!         .given_state(open_sale())
//!         .as_caller(CallContext::new(buyer, Amount::new(60)))
//!         .when_action(SaleAction::Reserve { seat, identity: None })
//!         .then_effects(move |effects| assertions::assert_transfer(effects, buyer, Amount::new(10)))
//!         .run();
//! }
//! ```

/// Mock implementations of core traits
pub mod mocks;

/// Reducer test harness
pub mod reducer_test;

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber.
    ///
    /// Honors `RUST_LOG` (default `debug`) and writes through the test
    /// harness so output is captured per test. Safe to call from every test;
    /// only the first call installs anything.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use seatsale_core::{Address, Amount};

    /// Any non-zero address
    pub fn arb_address() -> impl Strategy<Value = Address> {
        (1_u64..=u64::MAX).prop_map(Address::from_low_u64)
    }

    /// An amount in `0..=max`
    pub fn arb_amount(max: u64) -> impl Strategy<Value = Amount> {
        (0..=max).prop_map(Amount::new)
    }
}

// Re-export commonly used items
pub use mocks::{
    DelayedGateway, FailingEventLog, FixedClock, InMemoryEventLog, OfflineGateway, test_clock,
};
pub use reducer_test::{ReducerTest, assertions};
