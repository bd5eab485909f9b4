//! The ticket sale contract.
//!
//! Owns the seat inventory, the sale lifecycle (idle → open → finished → idle),
//! payments and refunds. Every call is one atomic transaction: the reducer
//! either returns effects to commit or an error that aborts the whole call.
//!
//! **Failure semantics**: invariant violations (wrong caller, wrong phase,
//! unknown seat, malformed input) are hard aborts (`Err`). Expected business
//! outcomes (seat already sold, underpayment) commit, refund the attached value
//! in full and return `false`.

use crate::events::SaleEvent;
use crate::types::{SalePhase, SaleState, Seat, Show, ShowDetails, TicketIdentity, TicketRecord, Venue};
use seatsale_core::event::SerializedEvent;
use seatsale_core::{
    Action, Address, Amount, BlockHeight, CallContext, Effect, Effects, Reducer, ReturnValue,
    SmallVec, environment::Clock, smallvec,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Actions
// ============================================================================

/// Constructor arguments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInit {
    /// The inventory, in display order
    pub seats: Vec<Seat>,
    /// Venue name for the audit event
    pub venue: String,
}

/// Contract methods
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleAction {
    /// Price every seat and open the sale until `end_of_sale`
    BeginSale {
        /// One price per inventory seat
        prices: Vec<(Seat, Amount)>,
        /// Show metadata for the audit event
        show: ShowDetails,
        /// Height at which the sale finishes
        end_of_sale: BlockHeight,
    },
    /// Reset a finished sale
    EndSale,
    /// Is the seat still available?
    CheckAvailability {
        /// Seat to check
        seat: Seat,
    },
    /// Buy a seat with the attached value
    Reserve {
        /// Seat to buy
        seat: Seat,
        /// Opaque identity payload echoed in the ticket event
        identity: Option<TicketIdentity>,
    },
    /// Does `address` hold the seat?
    OwnsTicket {
        /// Seat to check
        seat: Seat,
        /// Claimed holder
        address: Address,
    },
    /// Set the fee withheld from release refunds
    SetReleaseFee {
        /// New fee
        fee: Amount,
    },
    /// Set the trailing no-release window
    SetNoRefundBlocks {
        /// Window length in blocks
        blocks: u64,
    },
    /// Give a held seat back
    ReleaseTicket {
        /// Seat to release
        seat: Seat,
    },
}

impl Action for SaleAction {
    fn method(&self) -> &'static str {
        match self {
            Self::BeginSale { .. } => "begin_sale",
            Self::EndSale => "end_sale",
            Self::CheckAvailability { .. } => "check_availability",
            Self::Reserve { .. } => "reserve",
            Self::OwnsTicket { .. } => "owns_ticket",
            Self::SetReleaseFee { .. } => "set_release_fee",
            Self::SetNoRefundBlocks { .. } => "set_no_refund_blocks",
            Self::ReleaseTicket { .. } => "release_ticket",
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::CheckAvailability { .. } | Self::OwnsTicket { .. }
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a sale call aborts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    /// Only the owner may call this method
    #[error("Caller {caller} is not the owner")]
    NotOwner {
        /// Who called
        caller: Address,
    },

    /// The method needs an idle contract
    #[error("Sale is {phase}, expected idle")]
    SaleNotIdle {
        /// Actual phase
        phase: SalePhase,
    },

    /// The method needs an open sale
    #[error("Sale is {phase}, expected open")]
    SaleNotOpen {
        /// Actual phase
        phase: SalePhase,
    },

    /// The method needs a finished sale
    #[error("Sale is {phase}, expected finished")]
    SaleNotFinished {
        /// Actual phase
        phase: SalePhase,
    },

    /// End of sale must lie strictly in the future
    #[error("End of sale {end_of_sale} is not after current height {now}")]
    EndOfSaleNotInFuture {
        /// Requested end
        end_of_sale: BlockHeight,
        /// Current height
        now: BlockHeight,
    },

    /// Seat is not part of the inventory
    #[error("Unknown seat {0}")]
    UnknownSeat(Seat),

    /// Seat listed twice at construction
    #[error("Duplicate seat {0}")]
    DuplicateSeat(Seat),

    /// The reserved sentinel seat was listed at construction
    #[error("The null seat cannot be sold")]
    NullSeat,

    /// An inventory seat has no price
    #[error("No price given for seat {0}")]
    MissingPrice(Seat),

    /// A price names a seat outside the inventory, or names a seat twice
    #[error("Unexpected price entry for seat {0}")]
    UnexpectedPrice(Seat),

    /// Only the holder may release a ticket
    #[error("Caller {caller} does not hold seat {seat}")]
    NotHolder {
        /// Seat
        seat: Seat,
        /// Who called
        caller: Address,
    },

    /// The zero address cannot hold or claim tickets
    #[error("The zero address is not a valid holder")]
    ZeroAddress,

    /// Releases are closed in the trailing no-refund window
    #[error("Release closed: height {now} + {no_refund_blocks} blocks reaches end of sale {end_of_sale}")]
    InsideNoRefundWindow {
        /// Current height
        now: BlockHeight,
        /// Window length
        no_refund_blocks: u64,
        /// End of sale
        end_of_sale: BlockHeight,
    },

    /// An event could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies for the sale contract
#[derive(Clone)]
pub struct SaleEnvironment {
    /// The ledger's block height
    pub clock: Arc<dyn Clock>,
}

impl SaleEnvironment {
    /// Creates a new `SaleEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the ticket sale contract
#[derive(Clone, Debug, Default)]
pub struct TicketSaleReducer;

impl TicketSaleReducer {
    /// Creates a new `TicketSaleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode an event as an emit effect
    fn emit(event: &SaleEvent) -> Result<Effect, SaleError> {
        SerializedEvent::from_event(event)
            .map(Effect::Emit)
            .map_err(|e| SaleError::Serialization(e.to_string()))
    }

    /// Transfer effect, or nothing for a zero amount
    fn pay(to: Address, amount: Amount) -> Option<Effect> {
        (!amount.is_zero()).then_some(Effect::Transfer { to, amount })
    }

    /// Soft failure: hand the attached value back and return `false`
    fn refuse(call: &CallContext) -> Effects {
        let mut effects: Effects = SmallVec::new();
        effects.extend(Self::pay(call.sender, call.value));
        effects.push(Effect::Return(ReturnValue::Bool(false)));
        effects
    }

    fn require_owner(state: &SaleState, call: &CallContext) -> Result<(), SaleError> {
        if call.sender == state.owner {
            Ok(())
        } else {
            Err(SaleError::NotOwner {
                caller: call.sender,
            })
        }
    }

    fn require_phase(
        state: &SaleState,
        now: BlockHeight,
        expected: SalePhase,
    ) -> Result<(), SaleError> {
        let phase = state.phase(now);
        if phase == expected {
            return Ok(());
        }
        Err(match expected {
            SalePhase::Idle => SaleError::SaleNotIdle { phase },
            SalePhase::Open => SaleError::SaleNotOpen { phase },
            SalePhase::Finished => SaleError::SaleNotFinished { phase },
        })
    }

    /// Validates a `BeginSale` price list against the inventory
    ///
    /// Every inventory seat must be priced exactly once, and nothing else.
    fn validate_prices(
        state: &SaleState,
        prices: &[(Seat, Amount)],
    ) -> Result<HashMap<Seat, Amount>, SaleError> {
        let mut by_seat = HashMap::with_capacity(prices.len());
        for &(seat, price) in prices {
            if !state.contains(seat) || by_seat.insert(seat, price).is_some() {
                return Err(SaleError::UnexpectedPrice(seat));
            }
        }

        if let Some(missing) = state.seats().find(|seat| !by_seat.contains_key(seat)) {
            return Err(SaleError::MissingPrice(missing));
        }

        Ok(by_seat)
    }

    fn begin_sale(
        state: &mut SaleState,
        prices: &[(Seat, Amount)],
        show: ShowDetails,
        end_of_sale: BlockHeight,
        call: &CallContext,
        now: BlockHeight,
    ) -> Result<Effects, SaleError> {
        Self::require_owner(state, call)?;
        Self::require_phase(state, now, SalePhase::Idle)?;
        if end_of_sale <= now {
            return Err(SaleError::EndOfSaleNotInFuture { end_of_sale, now });
        }
        let prices = Self::validate_prices(state, prices)?;

        for ticket in state.tickets_mut() {
            if let Some(&price) = prices.get(&ticket.seat) {
                ticket.price = price;
            }
        }
        state.end_of_sale = Some(end_of_sale);

        let show = Show::new(show, end_of_sale);
        tracing::info!(
            show = %show.name,
            %end_of_sale,
            seats = prices.len(),
            "Sale opened"
        );

        Ok(smallvec![Self::emit(&SaleEvent::Show(show))?])
    }

    fn end_sale(
        state: &mut SaleState,
        call: &CallContext,
        now: BlockHeight,
    ) -> Result<Effects, SaleError> {
        Self::require_owner(state, call)?;
        Self::require_phase(state, now, SalePhase::Finished)?;

        let sold = state.sold_count();
        for ticket in state.tickets_mut() {
            ticket.holder = Address::ZERO;
            ticket.price = Amount::ZERO;
        }
        state.end_of_sale = None;

        tracing::info!(sold, "Sale ended, inventory reset");
        Ok(SmallVec::new())
    }

    fn check_availability(
        state: &SaleState,
        seat: Seat,
        now: BlockHeight,
    ) -> Result<Effects, SaleError> {
        Self::require_phase(state, now, SalePhase::Open)?;
        let ticket = state.ticket(seat).ok_or(SaleError::UnknownSeat(seat))?;

        Ok(smallvec![Effect::Return(ReturnValue::Bool(!ticket.is_sold()))])
    }

    /// Reserve a seat against the attached payment.
    ///
    /// Aborts leave the payment with the caller: the host only takes attached
    /// value from calls that commit.
    fn reserve(
        state: &mut SaleState,
        seat: Seat,
        identity: Option<TicketIdentity>,
        call: &CallContext,
        now: BlockHeight,
    ) -> Result<Effects, SaleError> {
        Self::require_phase(state, now, SalePhase::Open)?;
        if call.sender.is_zero() {
            return Err(SaleError::ZeroAddress);
        }
        let ticket = state.ticket_mut(seat).ok_or(SaleError::UnknownSeat(seat))?;

        if ticket.is_sold() {
            tracing::warn!(%seat, buyer = %call.sender, "Seat already sold, refunding");
            return Ok(Self::refuse(call));
        }

        let Some(excess) = call.value.checked_sub(ticket.price) else {
            tracing::warn!(
                %seat,
                buyer = %call.sender,
                paid = %call.value,
                price = %ticket.price,
                "Underpaid, refunding"
            );
            return Ok(Self::refuse(call));
        };

        ticket.holder = call.sender;
        let record = TicketRecord::sold(ticket, identity);
        tracing::info!(%seat, holder = %call.sender, price = %ticket.price, "Seat sold");

        let mut effects: Effects = SmallVec::new();
        effects.extend(Self::pay(call.sender, excess));
        effects.push(Self::emit(&SaleEvent::Ticket(record))?);
        effects.push(Effect::Return(ReturnValue::Bool(true)));
        Ok(effects)
    }

    fn owns_ticket(state: &SaleState, seat: Seat, address: Address) -> Result<Effects, SaleError> {
        if address.is_zero() {
            return Err(SaleError::ZeroAddress);
        }
        let ticket = state.ticket(seat).ok_or(SaleError::UnknownSeat(seat))?;

        Ok(smallvec![Effect::Return(ReturnValue::Bool(ticket.holder == address))])
    }

    fn release_ticket(
        state: &mut SaleState,
        seat: Seat,
        call: &CallContext,
        now: BlockHeight,
    ) -> Result<Effects, SaleError> {
        Self::require_phase(state, now, SalePhase::Open)?;
        if let Some(end_of_sale) = state.end_of_sale {
            if now + state.no_refund_blocks >= end_of_sale {
                return Err(SaleError::InsideNoRefundWindow {
                    now,
                    no_refund_blocks: state.no_refund_blocks,
                    end_of_sale,
                });
            }
        }

        let release_fee = state.release_fee;
        let ticket = state.ticket_mut(seat).ok_or(SaleError::UnknownSeat(seat))?;
        if !ticket.is_sold() || ticket.holder != call.sender {
            return Err(SaleError::NotHolder {
                seat,
                caller: call.sender,
            });
        }

        let refund = ticket.price.saturating_sub(release_fee);
        ticket.holder = Address::ZERO;
        let record = TicketRecord::released(ticket);
        tracing::info!(%seat, holder = %call.sender, %refund, "Seat released");

        let mut effects: Effects = SmallVec::new();
        effects.extend(Self::pay(call.sender, refund));
        effects.push(Self::emit(&SaleEvent::Ticket(record))?);
        Ok(effects)
    }
}

impl Reducer for TicketSaleReducer {
    type State = SaleState;
    type Action = SaleAction;
    type Environment = SaleEnvironment;
    type Error = SaleError;
    type Init = SaleInit;

    fn construct(
        &self,
        init: SaleInit,
        call: &CallContext,
        _env: &SaleEnvironment,
    ) -> Result<(SaleState, Effects), SaleError> {
        let state = SaleState::new(call.sender, &init.seats)?;
        tracing::info!(
            owner = %call.sender,
            venue = %init.venue,
            seats = init.seats.len(),
            "Sale contract constructed"
        );

        let venue = SaleEvent::Venue(Venue { name: init.venue });
        Ok((state, smallvec![Self::emit(&venue)?]))
    }

    fn reduce(
        &self,
        state: &mut SaleState,
        action: SaleAction,
        call: &CallContext,
        env: &SaleEnvironment,
    ) -> Result<Effects, SaleError> {
        let now = env.clock.now();
        tracing::debug!(method = action.method(), sender = %call.sender, %now, "Reducing call");

        match action {
            SaleAction::BeginSale {
                prices,
                show,
                end_of_sale,
            } => Self::begin_sale(state, &prices, show, end_of_sale, call, now),

            SaleAction::EndSale => Self::end_sale(state, call, now),

            SaleAction::CheckAvailability { seat } => Self::check_availability(state, seat, now),

            SaleAction::Reserve { seat, identity } => {
                Self::reserve(state, seat, identity, call, now)
            }

            SaleAction::OwnsTicket { seat, address } => Self::owns_ticket(state, seat, address),

            SaleAction::SetReleaseFee { fee } => {
                Self::require_owner(state, call)?;
                Self::require_phase(state, now, SalePhase::Idle)?;
                state.release_fee = fee;
                tracing::info!(%fee, "Release fee set");
                Ok(SmallVec::new())
            }

            SaleAction::SetNoRefundBlocks { blocks } => {
                Self::require_owner(state, call)?;
                Self::require_phase(state, now, SalePhase::Idle)?;
                state.no_refund_blocks = blocks;
                tracing::info!(blocks, "No-refund window set");
                Ok(SmallVec::new())
            }

            SaleAction::ReleaseTicket { seat } => Self::release_ticket(state, seat, call, now),
        }
    }
}
