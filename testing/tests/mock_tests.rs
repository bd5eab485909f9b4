//! Tests for the in-memory log and gateway mocks

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use seatsale_core::event::SerializedEvent;
use seatsale_core::event_log::{EventLog, EventLogError, LoggedEvent};
use seatsale_core::gateway::{
    GatewayError, GatewayFuture, LedgerGateway, Receipt, Transaction, TxStatus,
};
use seatsale_core::{Address, BlockHeight, CommitPosition, ReturnValue, TxId};
use seatsale_testing::{DelayedGateway, FailingEventLog, InMemoryEventLog, OfflineGateway};
use std::sync::Arc;
use std::time::Duration;

fn event(event_type: &str) -> SerializedEvent {
    SerializedEvent::new(event_type.to_string(), vec![1, 2, 3])
}

#[tokio::test]
async fn test_inmemory_log_assigns_increasing_sequences() {
    let log = InMemoryEventLog::new();
    let contract = Address::from_low_u64(1);

    let first = log
        .append(contract, BlockHeight::new(4), vec![event("Show.v1"), event("Ticket.v1")])
        .await
        .unwrap();
    let second = log
        .append(contract, BlockHeight::new(4), vec![event("Ticket.v1")])
        .await
        .unwrap();

    assert_eq!(first[0].position, CommitPosition::new(BlockHeight::new(4), 0));
    assert_eq!(first[1].position, CommitPosition::new(BlockHeight::new(4), 1));
    assert_eq!(second[0].position, CommitPosition::new(BlockHeight::new(4), 2));
    assert_eq!(log.len(), 3);
}

#[tokio::test]
async fn test_inmemory_log_filters_by_contract_and_type() {
    let log = InMemoryEventLog::new();
    let sale = Address::from_low_u64(1);
    let other = Address::from_low_u64(2);

    log.append(sale, BlockHeight::new(1), vec![event("Venue.v1")])
        .await
        .unwrap();
    log.append(other, BlockHeight::new(2), vec![event("Ticket.v1")])
        .await
        .unwrap();
    log.append(sale, BlockHeight::new(3), vec![event("Ticket.v1")])
        .await
        .unwrap();

    let tickets = log.load_by_type(sale, "Ticket.v1".to_string()).await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].contract, sale);
    assert_eq!(tickets[0].position.height, BlockHeight::new(3));

    let none = log.load_by_type(sale, "Show.v1".to_string()).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_inmemory_log_clones_share_entries() {
    let log = InMemoryEventLog::new();
    let reader = log.clone();

    log.append(Address::from_low_u64(1), BlockHeight::new(1), vec![event("Venue.v1")])
        .await
        .unwrap();

    assert_eq!(reader.snapshot().len(), 1);
    assert!(!reader.is_empty());
}

#[tokio::test]
async fn test_failing_log_refuses_appends() {
    let result = FailingEventLog
        .append(Address::from_low_u64(1), BlockHeight::new(1), vec![event("Venue.v1")])
        .await;
    assert!(matches!(result, Err(EventLogError::Rejected(_))));
}

/// Gateway that always has a committed receipt ready.
struct ReadyGateway;

impl LedgerGateway for ReadyGateway {
    fn submit(&self, _tx: Transaction) -> GatewayFuture<'_, TxId> {
        Box::pin(async { Ok(TxId::new()) })
    }

    fn fetch_receipt(&self, tx_id: TxId) -> GatewayFuture<'_, Option<Receipt>> {
        Box::pin(async move {
            Ok(Some(Receipt {
                tx_id,
                status: TxStatus::Committed,
                return_value: ReturnValue::Bool(true),
                events: Vec::new(),
                commit_height: BlockHeight::new(1),
                transfers: Vec::new(),
            }))
        })
    }

    fn fetch_events(
        &self,
        _contract: Address,
        _event_type: String,
    ) -> GatewayFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

#[tokio::test]
async fn test_delayed_gateway_hides_first_polls() {
    let gateway = DelayedGateway::new(Arc::new(ReadyGateway)).with_hidden_polls(2);
    let tx_id = TxId::new();

    assert!(gateway.fetch_receipt(tx_id).await.unwrap().is_none());
    assert!(gateway.fetch_receipt(tx_id).await.unwrap().is_none());
    let receipt = gateway.fetch_receipt(tx_id).await.unwrap();

    assert_eq!(receipt.map(|r| r.tx_id), Some(tx_id));
    assert_eq!(gateway.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_gateway_adds_latency() {
    let gateway = DelayedGateway::new(Arc::new(ReadyGateway)).with_latency(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    gateway
        .fetch_events(Address::from_low_u64(1), "Show.v1".to_string())
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn test_offline_gateway_is_unreachable() {
    let result = OfflineGateway.fetch_receipt(TxId::new()).await;
    assert!(matches!(result, Err(GatewayError::Unreachable(_))));
}
