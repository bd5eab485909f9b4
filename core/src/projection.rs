//! Projections: read models folded from the event log.
//!
//! # Overview
//!
//! A contract's storage is only reachable through the ledger. Off-ledger
//! parties instead rebuild what they need from the events the contract
//! emitted, in commit order. A projection is that fold.
//!
//! ```text
//! Ledger:                         Off-ledger:
//! ┌─────────────────┐            ┌─────────────────┐
//! │ contract state  │            │  Projection     │
//! │ (not readable)  │            │  (read model)   │
//! └─────────────────┘            └─────────────────┘
//!         │ emits                          ▲
//!         ▼                                │ replay
//! ┌──────────────────────────────────────────┐
//! │        Event log (append-only)           │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use seatsale_core::projection::*;
//!
//! #[derive(Default)]
//! struct CountProjection {
//!     seen: u64,
//! }
//!
//! impl Projection for CountProjection {
//!     type Event = CounterEvent;
//!
//!     fn apply_event(&mut self, _position: CommitPosition, _event: &CounterEvent) -> Result<()> {
//!         self.seen += 1;
//!         Ok(())
//!     }
//! }
//! ```

use crate::event::Event;
use crate::event_log::LoggedEvent;
use crate::position::CommitPosition;
use serde::de::DeserializeOwned;

/// Error type for projection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// A projection folds logged events into a read model.
///
/// # Philosophy
///
/// - **Rebuildable**: Can be dropped and rebuilt from the log at any time
/// - **Positional**: Each event arrives with its [`CommitPosition`], so a
///   projection can reason about before/after without trusting arrival order
pub trait Projection {
    /// The event type this projection listens to.
    type Event: Event + DeserializeOwned;

    /// Apply one decoded event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be folded into the read model.
    fn apply_event(&mut self, position: CommitPosition, event: &Self::Event) -> Result<()>;

    /// Decode and apply one logged event.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Serialization`] if the payload does not decode,
    /// or whatever [`Projection::apply_event`] returns.
    fn apply_logged(&mut self, logged: &LoggedEvent) -> Result<()> {
        let event: Self::Event = logged
            .event
            .decode()
            .map_err(|e| ProjectionError::Serialization(e.to_string()))?;
        self.apply_event(logged.position, &event)
    }

    /// Apply a batch of logged events in the order given.
    ///
    /// Stops at the first error; events before it stay applied.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Projection::apply_logged`].
    fn replay<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a LoggedEvent>,
    {
        for logged in events {
            self.apply_logged(logged)?;
        }
        Ok(())
    }
}
