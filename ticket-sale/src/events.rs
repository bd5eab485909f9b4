//! Events emitted by the sale contract.
//!
//! `Venue` and `Show` are audit records. `Ticket` is emitted on every sale and
//! every release; those two emissions are all the purchase log ever sees.

use crate::types::{Show, TicketRecord, Venue};
use seatsale_core::event::Event;
use serde::{Deserialize, Serialize};

/// Sale contract events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    /// Contract constructed
    Venue(Venue),
    /// Sale started
    Show(Show),
    /// Ticket sold or released
    Ticket(TicketRecord),
}

impl SaleEvent {
    /// Type name of [`SaleEvent::Venue`]
    pub const VENUE: &'static str = "Venue.v1";
    /// Type name of [`SaleEvent::Show`]
    pub const SHOW: &'static str = "Show.v1";
    /// Type name of [`SaleEvent::Ticket`]
    pub const TICKET: &'static str = "Ticket.v1";
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Venue(_) => Self::VENUE,
            Self::Show(_) => Self::SHOW,
            Self::Ticket(_) => Self::TICKET,
        }
    }
}
