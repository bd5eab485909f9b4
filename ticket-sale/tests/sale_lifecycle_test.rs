//! Sale lifecycle tests against the in-process ledger host.
//!
//! These tests deploy the contract on a real `Ledger`, so every call goes
//! through balance checks, atomic commit, the event log and receipts.
//!
//! Run with: `cargo test --test sale_lifecycle_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::TimeZone;
use seatsale_core::event::SerializedEvent;
use seatsale_core::event_log::{EventLog, EventLogError, EventLogFuture, LoggedEvent};
use seatsale_core::gateway::{Receipt, TxStatus};
use seatsale_core::{Address, Amount, BlockHeight, CallContext, ReturnValue};
use seatsale_runtime::{ChainClock, Ledger, LedgerBuilder, LedgerError};
use seatsale_testing::{FailingEventLog, InMemoryEventLog, helpers::init_tracing};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ticket_sale::{
    PurchaseLog, SaleAction, SaleEnvironment, SaleEvent, SaleInit, SeatOwnership, Seat,
    ShowDetails, TicketSaleReducer, VerificationOutcome,
};

const OWNER: u64 = 0x0A;
const X: u64 = 0x58;
const Y: u64 = 0x59;

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn seat_a() -> Seat {
    Seat::new(1, 'A')
}

fn seat_b() -> Seat {
    Seat::new(1, 'B')
}

fn show() -> ShowDetails {
    ShowDetails {
        name: "Hamlet".to_string(),
        organiser: "Globe".to_string(),
        time: chrono::Utc.with_ymd_and_hms(2026, 11, 20, 19, 30, 0).unwrap(),
    }
}

fn begin_sale(end: u64) -> SaleAction {
    SaleAction::BeginSale {
        prices: vec![(seat_a(), Amount::new(50)), (seat_b(), Amount::new(24))],
        show: show(),
        end_of_sale: BlockHeight::new(end),
    }
}

struct Harness {
    ledger: Ledger<TicketSaleReducer>,
    clock: ChainClock,
    log: InMemoryEventLog,
}

async fn deploy_with_log(log: Arc<dyn EventLog>) -> (Ledger<TicketSaleReducer>, ChainClock) {
    init_tracing();
    let clock = ChainClock::new(BlockHeight::new(1));
    let ledger = LedgerBuilder::new(addr(0x5ea7), log)
        .clock(clock.clone())
        .balance(addr(X), Amount::new(100))
        .balance(addr(Y), Amount::new(100))
        .deploy(
            TicketSaleReducer::new(),
            SaleEnvironment::new(Arc::new(clock.clone())),
            CallContext::from_sender(addr(OWNER)),
            SaleInit {
                seats: vec![seat_a(), seat_b()],
                venue: "Globe Theatre".to_string(),
            },
        )
        .await
        .unwrap();
    (ledger, clock)
}

async fn deploy() -> Harness {
    let log = InMemoryEventLog::new();
    let (ledger, clock) = deploy_with_log(Arc::new(log.clone())).await;
    Harness { ledger, clock, log }
}

async fn call(
    ledger: &Ledger<TicketSaleReducer>,
    sender: u64,
    value: u64,
    action: SaleAction,
) -> Receipt {
    ledger
        .execute(CallContext::new(addr(sender), Amount::new(value)), action)
        .await
        .unwrap()
}

fn purchase_log(log: &InMemoryEventLog) -> PurchaseLog {
    PurchaseLog::from_events(&log.snapshot()).unwrap()
}

/// Test 1: The full scenario
///
/// Seats 1A and 1B at 50 and 24, sale until height 100. X buys 1A, Y is
/// refused and refunded, the owner resets the sale at height 100.
#[tokio::test]
async fn test_end_to_end_sale() {
    let Harness { ledger, clock, log } = deploy().await;

    let opened = call(&ledger, OWNER, 0, begin_sale(100)).await;
    assert!(opened.is_committed());
    assert_eq!(opened.events[0].event.event_type, SaleEvent::SHOW);

    let bought = call(&ledger, X, 50, SaleAction::Reserve { seat: seat_a(), identity: None }).await;
    assert_eq!(bought.returned_bool(), Some(true));
    assert_eq!(ledger.balance(addr(X)).await, Amount::new(50));

    let refused = call(&ledger, Y, 50, SaleAction::Reserve { seat: seat_a(), identity: None }).await;
    assert_eq!(refused.returned_bool(), Some(false));
    assert_eq!(refused.delivered_to(addr(Y)), Amount::new(50));
    assert_eq!(ledger.balance(addr(Y)).await, Amount::new(100));
    assert_eq!(ledger.balance(ledger.contract()).await, Amount::new(50));

    let owns = ledger
        .query(addr(Y), SaleAction::OwnsTicket { seat: seat_a(), address: addr(X) })
        .await
        .unwrap();
    assert_eq!(owns, ReturnValue::Bool(true));
    let VerificationOutcome::Verified(record) = purchase_log(&log).verify_holder(seat_a(), addr(X))
    else {
        panic!("X should hold 1A");
    };
    assert_eq!(record.price, Amount::new(50));

    // Still open at 99
    clock.set(BlockHeight::new(99));
    let early = call(&ledger, OWNER, 0, SaleAction::EndSale).await;
    assert!(!early.is_committed());

    clock.set(BlockHeight::new(100));
    let ended = call(&ledger, OWNER, 0, SaleAction::EndSale).await;
    assert!(ended.is_committed());
    assert!(ended.events.is_empty());

    ledger
        .state(|state| {
            assert_eq!(state.end_of_sale, None);
            assert!(state.tickets().iter().all(|t| !t.is_sold() && t.price.is_zero()));
        })
        .await;

    let after = ledger
        .query(addr(Y), SaleAction::OwnsTicket { seat: seat_a(), address: addr(X) })
        .await
        .unwrap();
    assert_eq!(after, ReturnValue::Bool(false));
}

/// Test 2: Aborted calls change nothing
///
/// The caller keeps the attached value, storage is untouched and no event is
/// logged.
#[tokio::test]
async fn test_abort_leaves_no_trace() {
    let Harness { ledger, log, .. } = deploy().await;
    call(&ledger, OWNER, 0, begin_sale(100)).await;
    let events_before = log.len();

    let receipt = call(&ledger, X, 30, SaleAction::Reserve { seat: Seat::new(9, 'Z'), identity: None }).await;

    assert!(matches!(receipt.status, TxStatus::Aborted { .. }));
    assert!(receipt.transfers.is_empty());
    assert_eq!(ledger.balance(addr(X)).await, Amount::new(100));
    assert_eq!(ledger.balance(ledger.contract()).await, Amount::ZERO);
    assert_eq!(log.len(), events_before);
}

/// Test 3: Calls that cannot be paid for never reach the contract
#[tokio::test]
async fn test_insufficient_funds_is_rejected() {
    let Harness { ledger, .. } = deploy().await;
    call(&ledger, OWNER, 0, begin_sale(100)).await;

    let result = ledger
        .execute(
            CallContext::new(addr(X), Amount::new(500)),
            SaleAction::Reserve { seat: seat_a(), identity: None },
        )
        .await;

    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    ledger
        .state(|state| assert!(!state.ticket(seat_a()).unwrap().is_sold()))
        .await;
}

/// Test 4: A log that refuses the constructor's events blocks deployment
#[tokio::test]
async fn test_failing_event_log_blocks_deploy() {
    init_tracing();
    let clock = ChainClock::new(BlockHeight::new(1));
    let deployed = LedgerBuilder::new(addr(0x5ea7), Arc::new(FailingEventLog))
        .clock(clock.clone())
        .deploy(
            TicketSaleReducer::new(),
            SaleEnvironment::new(Arc::new(clock)),
            CallContext::from_sender(addr(OWNER)),
            SaleInit {
                seats: vec![seat_a()],
                venue: "Globe Theatre".to_string(),
            },
        )
        .await;

    // Construction emits Venue, so even deploying fails
    assert!(matches!(deployed, Err(LedgerError::EventLog(_))));
}

/// Event log that starts refusing appends once switched off
#[derive(Clone)]
struct SwitchableLog {
    inner: InMemoryEventLog,
    refusing: Arc<AtomicBool>,
}

impl EventLog for SwitchableLog {
    fn append(
        &self,
        contract: Address,
        height: BlockHeight,
        events: Vec<SerializedEvent>,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        if self.refusing.load(Ordering::SeqCst) {
            return Box::pin(async { Err(EventLogError::Rejected("log is read-only".to_string())) });
        }
        self.inner.append(contract, height, events)
    }

    fn load_by_type(
        &self,
        contract: Address,
        event_type: String,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        self.inner.load_by_type(contract, event_type)
    }
}

/// Test 5: A log that refuses the append aborts the call
///
/// The reservation would have succeeded; without its event it must not
/// happen at all.
#[tokio::test]
async fn test_failing_event_log_aborts_call() {
    let log = SwitchableLog {
        inner: InMemoryEventLog::new(),
        refusing: Arc::new(AtomicBool::new(false)),
    };
    let (ledger, _clock) = deploy_with_log(Arc::new(log.clone())).await;
    call(&ledger, OWNER, 0, begin_sale(100)).await;

    log.refusing.store(true, Ordering::SeqCst);
    let receipt = call(&ledger, X, 60, SaleAction::Reserve { seat: seat_a(), identity: None }).await;

    assert!(!receipt.is_committed());
    assert!(receipt.transfers.is_empty());
    assert_eq!(ledger.balance(addr(X)).await, Amount::new(100));
    ledger
        .state(|state| assert!(!state.ticket(seat_a()).unwrap().is_sold()))
        .await;
    assert_eq!(log.inner.len(), 2);
}

/// Test 6: Release refunds price minus fee and the log shows the seat free
#[tokio::test]
async fn test_release_round_trip_through_log() {
    let Harness { ledger, log, .. } = deploy().await;
    call(&ledger, OWNER, 0, SaleAction::SetReleaseFee { fee: Amount::new(5) }).await;
    call(&ledger, OWNER, 0, SaleAction::SetNoRefundBlocks { blocks: 10 }).await;
    call(&ledger, OWNER, 0, begin_sale(100)).await;
    call(&ledger, X, 50, SaleAction::Reserve { seat: seat_a(), identity: None }).await;

    let released = call(&ledger, X, 0, SaleAction::ReleaseTicket { seat: seat_a() }).await;
    assert!(released.is_committed());
    assert_eq!(released.delivered_to(addr(X)), Amount::new(45));
    assert_eq!(ledger.balance(addr(X)).await, Amount::new(95));
    assert_eq!(ledger.balance(ledger.contract()).await, Amount::new(5));

    assert_eq!(
        purchase_log(&log).ownership(seat_a()).unwrap(),
        SeatOwnership::Released { events: 2 }
    );

    // Y can now buy it
    let bought = call(&ledger, Y, 50, SaleAction::Reserve { seat: seat_a(), identity: None }).await;
    assert_eq!(bought.returned_bool(), Some(true));
    assert_eq!(
        purchase_log(&log).ownership(seat_a()).unwrap().holder(),
        Some(addr(Y))
    );
}

/// Test 7: A new sale starts a new epoch in the log
#[tokio::test]
async fn test_second_sale_starts_fresh_epoch() {
    let Harness { ledger, clock, log } = deploy().await;
    call(&ledger, OWNER, 0, begin_sale(10)).await;
    call(&ledger, X, 24, SaleAction::Reserve { seat: seat_b(), identity: None }).await;

    clock.set(BlockHeight::new(10));
    call(&ledger, OWNER, 0, SaleAction::EndSale).await;
    clock.advance(1);
    let reopened = call(&ledger, OWNER, 0, begin_sale(50)).await;
    assert!(reopened.is_committed());

    let log = purchase_log(&log);
    assert_eq!(log.ticket_events(), 1);
    assert_eq!(log.verify_holder(seat_b(), addr(X)), VerificationOutcome::NotHeld);
    assert!(log.reconstruct().unwrap().seats.is_empty());
}

/// Test 8: Read-only calls can be queried, others cannot
#[tokio::test]
async fn test_query_is_read_only() {
    let Harness { ledger, log, .. } = deploy().await;
    call(&ledger, OWNER, 0, begin_sale(100)).await;
    let events = log.len();

    let available = ledger
        .query(addr(X), SaleAction::CheckAvailability { seat: seat_a() })
        .await
        .unwrap();
    assert_eq!(available, ReturnValue::Bool(true));

    let refused = ledger
        .query(addr(X), SaleAction::Reserve { seat: seat_a(), identity: None })
        .await;
    assert_eq!(refused, Err(LedgerError::NotReadOnly("reserve")));

    let aborted = ledger
        .query(addr(X), SaleAction::CheckAvailability { seat: Seat::new(4, 'D') })
        .await;
    assert!(matches!(aborted, Err(LedgerError::QueryAborted(_))));
    assert_eq!(log.len(), events);
}
