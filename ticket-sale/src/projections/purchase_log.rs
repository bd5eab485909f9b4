//! Purchase-log reconstruction.
//!
//! Decides who currently holds a seat using nothing but the contract's event
//! log. Every sale and every release emits exactly one `Ticket` event, so
//! within a sale epoch the number of `Ticket` events for a seat gives its
//! state by parity: odd means held (by the holder of the latest event), even
//! means released.
//!
//! The epoch starts at the latest `Show` event. Ticket events at or before it
//! belong to earlier sales and are ignored; comparison uses the full
//! [`CommitPosition`], so events committed in the same block as the `Show`
//! are ordered correctly too.

use crate::events::SaleEvent;
use crate::types::{Seat, Show, TicketRecord};
use seatsale_core::event_log::LoggedEvent;
use seatsale_core::projection::{Projection, ProjectionError, Result as ProjectionResult};
use seatsale_core::{Address, CommitPosition};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::ops::Bound;
use thiserror::Error;

/// Errors from reconstructing seat ownership
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// No `Show` event exists, so no sale epoch can be determined
    #[error("No sale has been started")]
    NoSaleStarted,

    /// A logged event could not be folded
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// Reconstructed state of one seat in the current epoch
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SeatOwnership {
    /// No ticket event for this seat since the sale began
    NeverPurchased,
    /// Bought and given back; `events` is the (even) number of ticket events
    Released {
        /// Ticket events seen for the seat
        events: usize,
    },
    /// Currently held; the latest ticket event
    Held(TicketRecord),
}

impl SeatOwnership {
    /// Current holder, if held
    #[must_use]
    pub const fn holder(&self) -> Option<Address> {
        match self {
            Self::Held(record) => Some(record.holder),
            _ => None,
        }
    }
}

/// Seat ownership for the current sale epoch
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reconstruction {
    /// The show that opened the epoch
    pub show: Show,
    /// Position of that show's event
    pub epoch_start: CommitPosition,
    /// Ownership per seat
    #[serde(serialize_with = "seats_as_list")]
    pub seats: BTreeMap<Seat, SeatOwnership>,
}

impl Reconstruction {
    /// Seats currently held
    pub fn held(&self) -> impl Iterator<Item = (&Seat, &TicketRecord)> {
        self.seats.iter().filter_map(|(seat, ownership)| match ownership {
            SeatOwnership::Held(record) => Some((seat, record)),
            _ => None,
        })
    }
}

#[derive(Serialize)]
struct SeatEntry<'a> {
    seat: &'a Seat,
    ownership: &'a SeatOwnership,
}

/// JSON map keys must be strings; emit `[{seat, ownership}, ...]` instead.
fn seats_as_list<S: Serializer>(
    seats: &BTreeMap<Seat, SeatOwnership>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(
        seats
            .iter()
            .map(|(seat, ownership)| SeatEntry { seat, ownership }),
    )
}

/// Result of checking a claimed holder against the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum VerificationOutcome {
    /// The claimed address holds the seat
    Verified(TicketRecord),
    /// Nobody holds the seat
    NotHeld,
    /// Someone else holds the seat
    HolderMismatch {
        /// The actual holder
        actual: Address,
    },
    /// No sale has started
    NoSale,
    /// The log could not be read in time
    Unknown,
}

impl VerificationOutcome {
    /// Whether the claim holds
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

type BySeat<'a> = BTreeMap<Seat, Vec<&'a TicketRecord>>;

/// Read model over `Show` and `Ticket` events.
///
/// Events may be applied in any order and more than once: they are keyed by
/// commit position.
///
/// # Example
///
/// ```rust,ignore
/// let mut log = PurchaseLog::new();
/// log.replay(&shows)?;
/// log.replay(&tickets)?;
///
/// match log.verify_holder(Seat::new(1, 'A'), claimed) {
///     VerificationOutcome::Verified(record) => admit(record),
///     other => reject(other),
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PurchaseLog {
    show: Option<(CommitPosition, Show)>,
    tickets: BTreeMap<CommitPosition, TicketRecord>,
}

impl PurchaseLog {
    /// Creates an empty `PurchaseLog`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already fetched events
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if an event does not decode.
    pub fn from_events<'a, I>(events: I) -> ProjectionResult<Self>
    where
        I: IntoIterator<Item = &'a LoggedEvent>,
    {
        let mut log = Self::new();
        log.replay(events)?;
        Ok(log)
    }

    /// Number of ticket events folded so far, across all epochs
    #[must_use]
    pub fn ticket_events(&self) -> usize {
        self.tickets.len()
    }

    /// Ticket events of the current epoch grouped by seat, in commit order
    fn epoch(&self) -> Result<(CommitPosition, &Show, BySeat<'_>), ReconstructionError> {
        let (start, show) = self
            .show
            .as_ref()
            .ok_or(ReconstructionError::NoSaleStarted)?;

        let mut by_seat = BySeat::new();
        for record in self
            .tickets
            .range((Bound::Excluded(*start), Bound::Unbounded))
            .map(|(_, record)| record)
        {
            by_seat.entry(record.seat).or_default().push(record);
        }

        Ok((*start, show, by_seat))
    }

    fn ownership_of(seat: Seat, records: &[&TicketRecord]) -> SeatOwnership {
        match records.last() {
            None => SeatOwnership::NeverPurchased,
            Some(last) if records.len() % 2 == 1 => SeatOwnership::Held((*last).clone()),
            Some(_) => {
                tracing::warn!(
                    %seat,
                    events = records.len(),
                    "Seat was bought and released, not currently held"
                );
                SeatOwnership::Released {
                    events: records.len(),
                }
            }
        }
    }

    /// Ownership of every seat with ticket activity in the current epoch
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::NoSaleStarted`] if no `Show` was seen.
    pub fn reconstruct(&self) -> Result<Reconstruction, ReconstructionError> {
        let (epoch_start, show, by_seat) = self.epoch()?;

        let seats = by_seat
            .into_iter()
            .map(|(seat, records)| (seat, Self::ownership_of(seat, &records)))
            .collect();

        Ok(Reconstruction {
            show: show.clone(),
            epoch_start,
            seats,
        })
    }

    /// Ownership of exactly `seats`; others are ignored and seats without
    /// activity report [`SeatOwnership::NeverPurchased`]
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::NoSaleStarted`] if no `Show` was seen.
    pub fn reconstruct_seats(&self, seats: &[Seat]) -> Result<Reconstruction, ReconstructionError> {
        let (epoch_start, show, by_seat) = self.epoch()?;

        let seats = seats
            .iter()
            .map(|&seat| {
                let records = by_seat.get(&seat).map_or(&[][..], Vec::as_slice);
                (seat, Self::ownership_of(seat, records))
            })
            .collect();

        Ok(Reconstruction {
            show: show.clone(),
            epoch_start,
            seats,
        })
    }

    /// Ownership of one seat
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::NoSaleStarted`] if no `Show` was seen.
    pub fn ownership(&self, seat: Seat) -> Result<SeatOwnership, ReconstructionError> {
        let mut reconstruction = self.reconstruct_seats(&[seat])?;
        Ok(reconstruction
            .seats
            .remove(&seat)
            .unwrap_or(SeatOwnership::NeverPurchased))
    }

    /// Check a claimed holder against the reconstruction
    #[must_use]
    pub fn verify_holder(&self, seat: Seat, claimed: Address) -> VerificationOutcome {
        match self.ownership(seat) {
            Err(_) => VerificationOutcome::NoSale,
            Ok(SeatOwnership::Held(record)) if record.holder == claimed => {
                VerificationOutcome::Verified(record)
            }
            Ok(SeatOwnership::Held(record)) => {
                tracing::warn!(%seat, %claimed, actual = %record.holder, "Holder mismatch");
                VerificationOutcome::HolderMismatch {
                    actual: record.holder,
                }
            }
            Ok(_) => VerificationOutcome::NotHeld,
        }
    }
}

impl Projection for PurchaseLog {
    type Event = SaleEvent;

    fn apply_event(&mut self, position: CommitPosition, event: &SaleEvent) -> ProjectionResult<()> {
        match event {
            SaleEvent::Show(show) => {
                let newer = self.show.as_ref().is_none_or(|(current, _)| position >= *current);
                if newer {
                    self.show = Some((position, show.clone()));
                }
            }
            SaleEvent::Ticket(record) => {
                self.tickets.insert(position, record.clone());
            }
            SaleEvent::Venue(_) => {}
        }
        Ok(())
    }
}
