//! Read models folded from the sale contract's event log.
//!
//! The contract's storage is not readable off-ledger. Door staff, resale
//! desks and audits instead answer "who holds this seat?" by replaying the
//! events the contract emitted:
//!
//! ```text
//! Ledger host                     Event log                 Off-ledger
//! ┌───────────────┐             ┌────────────┐            ┌──────────────┐
//! │ Ticket sale   │──Show.v1───>│ append-only│──by type──>│ PurchaseLog  │
//! │ contract      │──Ticket.v1─>│ (height,   │            │ (parity fold)│
//! └───────────────┘             │  sequence) │            └──────────────┘
//!                               └────────────┘
//! ```

pub mod purchase_log;

pub use purchase_log::{
    PurchaseLog, Reconstruction, ReconstructionError, SeatOwnership, VerificationOutcome,
};
