//! Seat Sale - a seat-based ticket sale contract with off-ledger verification
//!
//! This crate implements a ticket sale as a contract on the `seatsale-runtime`
//! ledger host, plus the protocol that verifies ticket ownership from the
//! ledger's event log alone. It showcases:
//!
//! - **Atomic calls**: every method commits entirely or aborts without a trace
//! - **Payments and refunds**: exact, over- and under-payment, release fees
//! - **Lifecycle gating**: idle, open and finished phases derived from block height
//! - **Event-log reconstruction**: ownership by parity of `Ticket` events
//!
//! # Architecture
//!
//! ```text
//! On-ledger:                                    Off-ledger:
//! ┌──────────────┐   Transaction   ┌─────────┐   fetch_events   ┌─────────────────────┐
//! │  SaleClient  │────────────────>│ Ledger  │<─────────────────│ PurchaseLogVerifier │
//! └──────────────┘<───Receipt──────│  host   │                  └─────────────────────┘
//!                                  └─────────┘                            │
//!                                       │ reduce                          ▼
//!                              ┌──────────────────┐              ┌───────────────┐
//!                              │TicketSaleReducer │              │  PurchaseLog  │
//!                              └──────────────────┘              │ (projection)  │
//!                                                                └───────────────┘
//! ```
//!
//! # Failure Semantics
//!
//! ```text
//! Hard abort  (wrong caller, wrong phase, unknown seat)  → receipt Aborted, nothing changes
//! Soft failure (seat taken, underpaid)                   → committed, full refund, returns false
//! Unreachable / slow gateway                             → None / VerificationOutcome::Unknown
//! ```

pub mod client;
pub mod config;
pub mod contract;
pub mod events;
pub mod projections;
pub mod types;
pub mod verifier;

pub use client::SaleClient;
pub use config::{Config, ConfigError};
pub use contract::{SaleAction, SaleEnvironment, SaleError, SaleInit, TicketSaleReducer};
pub use events::SaleEvent;
pub use projections::{PurchaseLog, Reconstruction, SeatOwnership, VerificationOutcome};
pub use types::{SalePhase, SaleState, Seat, Show, ShowDetails, Ticket, TicketIdentity, TicketRecord};
pub use verifier::PurchaseLogVerifier;
