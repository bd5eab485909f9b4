//! Domain types for the seat sale.
//!
//! This module contains the inventory model (seats and their tickets), the
//! audit metadata records and the contract's storage, [`SaleState`].

use crate::contract::SaleError;
use chrono::{DateTime, Utc};
use seatsale_core::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Inventory
// ============================================================================

/// A seat identity: row number and seat letter.
///
/// Seats order by number, then letter. [`Seat::NULL`] is the reserved
/// "not found" sentinel and is never part of an inventory.
///
/// # Examples
///
/// ```
/// use ticket_sale::types::Seat;
///
/// let seat = Seat::new(12, 'C');
/// assert_eq!(seat.to_string(), "12C");
/// assert!(Seat::new(1, 'B') < Seat::new(2, 'A'));
/// assert!(Seat::NULL.is_null());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seat {
    /// Row number
    pub number: u32,
    /// Seat letter within the row
    pub letter: char,
}

impl Seat {
    /// The reserved sentinel seat
    pub const NULL: Self = Self {
        number: 0,
        letter: '\0',
    };

    /// Creates a new `Seat`
    #[must_use]
    pub const fn new(number: u32, letter: char) -> Self {
        Self { number, letter }
    }

    /// Whether this is the reserved sentinel
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.number == 0 && self.letter == '\0'
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.letter)
    }
}

/// One ticket per seat, for the lifetime of the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// The seat this ticket admits to
    pub seat: Seat,
    /// Current price (zero until a sale prices it)
    pub price: Amount,
    /// Current holder ([`Address::ZERO`] when unsold)
    pub holder: Address,
}

impl Ticket {
    /// An unpriced, unsold ticket
    #[must_use]
    pub const fn unsold(seat: Seat) -> Self {
        Self {
            seat,
            price: Amount::ZERO,
            holder: Address::ZERO,
        }
    }

    /// Whether someone holds this ticket
    #[must_use]
    pub fn is_sold(&self) -> bool {
        !self.holder.is_zero()
    }
}

/// Opaque identity payload supplied by a buyer and echoed in the ticket event.
///
/// The contract never interprets these values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketIdentity {
    /// Secret the holder presents at the door
    pub secret: Option<String>,
    /// Free-form customer identifier
    pub customer_identifier: Option<String>,
}

/// Ticket event payload: a ticket snapshot plus the buyer's identity payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Seat
    pub seat: Seat,
    /// Price at the time of the event
    pub price: Amount,
    /// Holder after the event
    pub holder: Address,
    /// Opaque secret
    pub secret: Option<String>,
    /// Opaque customer identifier
    pub customer_identifier: Option<String>,
}

impl TicketRecord {
    /// Record of a ticket that was just sold
    #[must_use]
    pub fn sold(ticket: &Ticket, identity: Option<TicketIdentity>) -> Self {
        let identity = identity.unwrap_or_default();
        Self {
            seat: ticket.seat,
            price: ticket.price,
            holder: ticket.holder,
            secret: identity.secret,
            customer_identifier: identity.customer_identifier,
        }
    }

    /// Record of a ticket that was just released
    #[must_use]
    pub const fn released(ticket: &Ticket) -> Self {
        Self {
            seat: ticket.seat,
            price: ticket.price,
            holder: Address::ZERO,
            secret: None,
            customer_identifier: None,
        }
    }
}

// ============================================================================
// Audit metadata
// ============================================================================

/// Venue audit record, emitted once at construction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    /// Venue name
    pub name: String,
}

/// Show details supplied when a sale begins
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowDetails {
    /// Show name
    pub name: String,
    /// Organiser name
    pub organiser: String,
    /// When the show takes place
    pub time: DateTime<Utc>,
}

/// Show audit record, emitted when a sale begins
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Show name
    pub name: String,
    /// Organiser name
    pub organiser: String,
    /// When the show takes place
    pub time: DateTime<Utc>,
    /// Block height at which the sale ends
    pub end_of_sale: BlockHeight,
}

impl Show {
    /// Combine show details with the sale's end height
    #[must_use]
    pub fn new(details: ShowDetails, end_of_sale: BlockHeight) -> Self {
        Self {
            name: details.name,
            organiser: details.organiser,
            time: details.time,
            end_of_sale,
        }
    }
}

// ============================================================================
// Contract storage
// ============================================================================

/// Sale lifecycle phase, derived from storage and the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalePhase {
    /// No active sale
    Idle,
    /// Sale running: `now < end_of_sale`
    Open,
    /// Sale over but not reset: `now >= end_of_sale`
    Finished,
}

impl fmt::Display for SalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Open => write!(f, "open"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// The sale contract's storage.
///
/// The ticket list is fixed at construction: seats are never added, removed
/// or reordered, only their price and holder change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleState {
    /// Account that deployed the contract
    pub owner: Address,
    tickets: Vec<Ticket>,
    index: HashMap<Seat, usize>,
    /// End of the active sale; `None` while idle
    pub end_of_sale: Option<BlockHeight>,
    /// Withheld from release refunds
    pub release_fee: Amount,
    /// Trailing window before the end of sale in which releases are refused
    pub no_refund_blocks: u64,
}

impl SaleState {
    /// Build the inventory: one unsold, unpriced ticket per seat, in input order.
    ///
    /// # Errors
    ///
    /// - [`SaleError::NullSeat`]: the reserved sentinel seat is listed
    /// - [`SaleError::DuplicateSeat`]: a seat is listed twice
    pub fn new(owner: Address, seats: &[Seat]) -> Result<Self, SaleError> {
        let mut tickets = Vec::with_capacity(seats.len());
        let mut index = HashMap::with_capacity(seats.len());

        for &seat in seats {
            if seat.is_null() {
                return Err(SaleError::NullSeat);
            }
            if index.insert(seat, tickets.len()).is_some() {
                return Err(SaleError::DuplicateSeat(seat));
            }
            tickets.push(Ticket::unsold(seat));
        }

        Ok(Self {
            owner,
            tickets,
            index,
            end_of_sale: None,
            release_fee: Amount::ZERO,
            no_refund_blocks: 0,
        })
    }

    /// Phase at block height `now`
    #[must_use]
    pub fn phase(&self, now: BlockHeight) -> SalePhase {
        match self.end_of_sale {
            None => SalePhase::Idle,
            Some(end) if now < end => SalePhase::Open,
            Some(_) => SalePhase::Finished,
        }
    }

    /// All tickets, in construction order
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Seats of the inventory, in construction order
    pub fn seats(&self) -> impl Iterator<Item = Seat> + '_ {
        self.tickets.iter().map(|t| t.seat)
    }

    /// Whether `seat` is part of the inventory
    #[must_use]
    pub fn contains(&self, seat: Seat) -> bool {
        self.index.contains_key(&seat)
    }

    /// Ticket for `seat`
    #[must_use]
    pub fn ticket(&self, seat: Seat) -> Option<&Ticket> {
        self.index.get(&seat).and_then(|&i| self.tickets.get(i))
    }

    /// Ticket for `seat`, mutably
    pub(crate) fn ticket_mut(&mut self, seat: Seat) -> Option<&mut Ticket> {
        let i = *self.index.get(&seat)?;
        self.tickets.get_mut(i)
    }

    /// Every ticket, mutably (membership stays fixed)
    pub(crate) fn tickets_mut(&mut self) -> impl Iterator<Item = &mut Ticket> {
        self.tickets.iter_mut()
    }

    /// Number of tickets currently held
    #[must_use]
    pub fn sold_count(&self) -> usize {
        self.tickets.iter().filter(|t| t.is_sold()).count()
    }
}
