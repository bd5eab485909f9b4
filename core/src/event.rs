//! Event trait and related types for contract events.
//!
//! Events are facts a contract emits when a call commits. They are the only
//! contract output an off-ledger observer can rely on, so their encoding is
//! part of the contract's public interface.
//!
//! # Design
//!
//! Events are serialized using `bincode`. The event log stores the bytes next
//! to a stable, versioned type name; readers select events by that name and
//! decode only what they asked for.
//!
//! # Example
//!
//! ```
//! use seatsale_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum CounterEvent {
//!     Incremented { by: u64 },
//! }
//!
//! impl Event for CounterEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             CounterEvent::Incremented { .. } => "Incremented.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Unknown event type encountered during deserialization.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An event that can be appended to the event log and replayed later.
///
/// # Event Naming Convention
///
/// The `event_type()` method should return a stable string identifier that
/// includes a version number, e.g. `"Ticket.v1"`. Readers fetch events by this
/// name, so renaming a type is a breaking change for every verifier.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// encode a different type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for the event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "Ticket.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    ///
    /// # Examples
    ///
    /// ```
    /// use seatsale_core::event::SerializedEvent;
    ///
    /// let event = SerializedEvent::new("Venue.v1".to_string(), vec![1, 2, 3, 4]);
    /// assert_eq!(event.event_type, "Venue.v1");
    /// ```
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }

    /// Decode the payload back into its event type.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not decode
    /// as `E`, or `EventError::UnknownEventType` if the decoded event reports a
    /// different type name than the one stored.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        let event = E::from_bytes(&self.data)?;
        if event.event_type() != self.event_type {
            return Err(EventError::UnknownEventType(self.event_type.clone()));
        }
        Ok(event)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Opened { name: String },
        Closed { code: u32 },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "TestEvent.Opened.v1",
                TestEvent::Closed { .. } => "TestEvent.Closed.v1",
            }
        }
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn serialized_event_keeps_type_name() {
        let event = TestEvent::Closed { code: 3 };
        let serialized = SerializedEvent::from_event(&event).expect("serialization should succeed");

        assert_eq!(serialized.event_type, "TestEvent.Closed.v1");
        assert!(!serialized.data.is_empty());
        assert_eq!(serialized.decode::<TestEvent>(), Ok(event));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn decode_rejects_mislabelled_payload() {
        let event = TestEvent::Opened {
            name: "doors".to_string(),
        };
        let mut serialized =
            SerializedEvent::from_event(&event).expect("serialization should succeed");
        serialized.event_type = "TestEvent.Closed.v1".to_string();

        assert_eq!(
            serialized.decode::<TestEvent>(),
            Err(EventError::UnknownEventType("TestEvent.Closed.v1".to_string()))
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        let serialized = SerializedEvent::new("TestEvent.Opened.v1".to_string(), vec![0xff; 3]);
        assert!(matches!(
            serialized.decode::<TestEvent>(),
            Err(EventError::DeserializationError(_))
        ));
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new("TestEvent.v1".to_string(), vec![1, 2, 3, 4, 5]);

        let display = format!("{serialized}");
        assert!(display.contains("TestEvent.v1"));
        assert!(display.contains("5 bytes"));
    }
}
