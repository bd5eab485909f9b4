//! Event log trait and related types.
//!
//! The event log is the ledger's durable, append-only record of every event a
//! contract emitted in a committed call. It is the only input of off-ledger
//! verification, so it never rewrites or removes entries.
//!
//! # Implementations
//!
//! - `InMemoryEventLog` (in `seatsale-testing` crate): Fast, deterministic log
//!   used by the in-process ledger host and tests
//!
//! # Example
//!
//! ```no_run
//! use seatsale_core::event_log::{EventLog, EventLogError};
//! use seatsale_core::{Address, BlockHeight};
//!
//! async fn example<L: EventLog>(log: &L, contract: Address) -> Result<(), EventLogError> {
//!     let tickets = log.load_by_type(contract, "Ticket.v1".to_string()).await?;
//!     for logged in tickets {
//!         println!("{} at {}", logged.event, logged.position);
//!     }
//!     Ok(())
//! }
//! ```

use crate::event::SerializedEvent;
use crate::ledger::Address;
use crate::position::{BlockHeight, CommitPosition};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event log operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// The log backend cannot be reached.
    #[error("Event log unavailable: {0}")]
    Unavailable(String),

    /// The log refused an append.
    #[error("Append rejected: {0}")]
    Rejected(String),
}

/// An event as recorded in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Where the event was committed
    pub position: CommitPosition,
    /// Contract that emitted the event
    pub contract: Address,
    /// The event itself
    pub event: SerializedEvent,
}

/// Future returned by event log operations
pub type EventLogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EventLogError>> + Send + 'a>>;

/// Append-only event log, addressable by contract and event type.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; readers may run concurrently with
/// each other and with appends.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so the ledger host can hold an `Arc<dyn EventLog>`.
pub trait EventLog: Send + Sync {
    /// Append the events of one committed call.
    ///
    /// All events share `height`; the log assigns each a sequence number that
    /// is strictly greater than any sequence it assigned before.
    ///
    /// # Returns
    ///
    /// The logged events, in the order given.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: the backend cannot be reached; nothing was appended
    /// - `Rejected`: the backend refused the batch; nothing was appended
    fn append(
        &self,
        contract: Address,
        height: BlockHeight,
        events: Vec<SerializedEvent>,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>>;

    /// Load every event of one type emitted by one contract.
    ///
    /// # Returns
    ///
    /// Events in commit order (oldest first). An unknown contract or type
    /// yields an empty vector.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: the backend cannot be reached
    fn load_by_type(
        &self,
        contract: Address,
        event_type: String,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_error_display() {
        let error = EventLogError::Unavailable("connection refused".to_string());
        assert!(format!("{error}").contains("connection refused"));
    }
}
