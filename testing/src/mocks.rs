//! In-memory and fault-injecting implementations of the core traits.
//!
//! Provides fast, deterministic infrastructure for contract and verifier tests:
//! - [`FixedClock`]: a block height that never moves
//! - [`InMemoryEventLog`]: `RwLock`-backed append-only log
//! - [`FailingEventLog`]: a log that refuses every append
//! - [`DelayedGateway`]: wraps a gateway, hides receipts for a few polls and adds latency
//! - [`OfflineGateway`]: a gateway whose node is never reachable

use seatsale_core::event::SerializedEvent;
use seatsale_core::event_log::{EventLog, EventLogError, EventLogFuture, LoggedEvent};
use seatsale_core::gateway::{GatewayError, GatewayFuture, LedgerGateway, Receipt, Transaction};
use seatsale_core::{Address, BlockHeight, Clock, CommitPosition, TxId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Fixed clock for deterministic tests
///
/// Always returns the same block height, making tests reproducible.
///
/// # Example
///
/// ```
/// use seatsale_testing::mocks::FixedClock;
/// use seatsale_core::{BlockHeight, Clock};
///
/// let clock = FixedClock::at(42);
/// assert_eq!(clock.now(), BlockHeight::new(42));
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    height: BlockHeight,
}

impl FixedClock {
    /// Create a new fixed clock at the given height
    #[must_use]
    pub const fn new(height: BlockHeight) -> Self {
        Self { height }
    }

    /// Shorthand for `FixedClock::new(BlockHeight::new(height))`
    #[must_use]
    pub const fn at(height: u64) -> Self {
        Self::new(BlockHeight::new(height))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> BlockHeight {
        self.height
    }
}

/// Create a default fixed clock for tests (height 1)
#[must_use]
pub const fn test_clock() -> FixedClock {
    FixedClock::at(1)
}

/// In-memory event log.
///
/// Sequence numbers start at 0 and increase by one per appended event,
/// across all contracts.
///
/// # Example
///
/// ```
/// use seatsale_testing::mocks::InMemoryEventLog;
/// use seatsale_core::event::SerializedEvent;
/// use seatsale_core::event_log::EventLog;
/// use seatsale_core::{Address, BlockHeight};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = InMemoryEventLog::new();
/// let contract = Address::from_low_u64(1);
///
/// log.append(contract, BlockHeight::new(3), vec![
///     SerializedEvent::new("Show.v1".to_string(), vec![0]),
/// ]).await?;
///
/// let shows = log.load_by_type(contract, "Show.v1".to_string()).await?;
/// assert_eq!(shows.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventLog {
    entries: Arc<RwLock<Vec<LoggedEvent>>>,
}

impl InMemoryEventLog {
    /// Create a new empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of logged events
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Check if the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every logged event, in append order
    #[must_use]
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn poisoned<T>(_: T) -> EventLogError {
        EventLogError::Unavailable("in-memory log lock poisoned".to_string())
    }
}

impl EventLog for InMemoryEventLog {
    fn append(
        &self,
        contract: Address,
        height: BlockHeight,
        events: Vec<SerializedEvent>,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async move {
            let mut entries = self.entries.write().map_err(Self::poisoned)?;
            let first = entries.len() as u64;
            let logged: Vec<LoggedEvent> = events
                .into_iter()
                .zip(first..)
                .map(|(event, sequence)| LoggedEvent {
                    position: CommitPosition::new(height, sequence),
                    contract,
                    event,
                })
                .collect();
            entries.extend(logged.iter().cloned());
            Ok(logged)
        })
    }

    fn load_by_type(
        &self,
        contract: Address,
        event_type: String,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async move {
            let entries = self.entries.read().map_err(Self::poisoned)?;
            Ok(entries
                .iter()
                .filter(|e| e.contract == contract && e.event.event_type == event_type)
                .cloned()
                .collect())
        })
    }
}

/// Event log that refuses every append and cannot be read.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingEventLog;

impl EventLog for FailingEventLog {
    fn append(
        &self,
        _contract: Address,
        _height: BlockHeight,
        _events: Vec<SerializedEvent>,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async { Err(EventLogError::Rejected("log is read-only".to_string())) })
    }

    fn load_by_type(
        &self,
        _contract: Address,
        _event_type: String,
    ) -> EventLogFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async { Err(EventLogError::Unavailable("log is offline".to_string())) })
    }
}

/// Gateway wrapper that hides receipts for the first few polls and can add
/// latency to every call.
///
/// # Example
///
/// ```ignore
/// let gateway = DelayedGateway::new(Arc::new(ledger))
///     .with_hidden_polls(3)
///     .with_latency(Duration::from_millis(20));
/// ```
#[derive(Clone)]
pub struct DelayedGateway {
    inner: Arc<dyn LedgerGateway>,
    hidden_polls: Arc<AtomicUsize>,
    latency: Duration,
    polls: Arc<AtomicUsize>,
}

impl DelayedGateway {
    /// Wrap `inner` with no delay
    #[must_use]
    pub fn new(inner: Arc<dyn LedgerGateway>) -> Self {
        Self {
            inner,
            hidden_polls: Arc::new(AtomicUsize::new(0)),
            latency: Duration::ZERO,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer "not yet available" to the next `polls` receipt fetches
    #[must_use]
    pub fn with_hidden_polls(self, polls: usize) -> Self {
        self.hidden_polls.store(polls, Ordering::SeqCst);
        self
    }

    /// Sleep for `latency` before every call
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// How many receipt fetches were made
    #[must_use]
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl LedgerGateway for DelayedGateway {
    fn submit(&self, tx: Transaction) -> GatewayFuture<'_, TxId> {
        Box::pin(async move {
            self.delay().await;
            self.inner.submit(tx).await
        })
    }

    fn fetch_receipt(&self, tx_id: TxId) -> GatewayFuture<'_, Option<Receipt>> {
        Box::pin(async move {
            self.delay().await;
            self.polls.fetch_add(1, Ordering::SeqCst);
            let hidden = self
                .hidden_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if hidden {
                return Ok(None);
            }
            self.inner.fetch_receipt(tx_id).await
        })
    }

    fn fetch_events(
        &self,
        contract: Address,
        event_type: String,
    ) -> GatewayFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async move {
            self.delay().await;
            self.inner.fetch_events(contract, event_type).await
        })
    }
}

/// Gateway whose node can never be reached.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineGateway;

impl OfflineGateway {
    fn unreachable() -> GatewayError {
        GatewayError::Unreachable("connection refused".to_string())
    }
}

impl LedgerGateway for OfflineGateway {
    fn submit(&self, _tx: Transaction) -> GatewayFuture<'_, TxId> {
        Box::pin(async { Err(Self::unreachable()) })
    }

    fn fetch_receipt(&self, _tx_id: TxId) -> GatewayFuture<'_, Option<Receipt>> {
        Box::pin(async { Err(Self::unreachable()) })
    }

    fn fetch_events(
        &self,
        _contract: Address,
        _event_type: String,
    ) -> GatewayFuture<'_, Vec<LoggedEvent>> {
        Box::pin(async { Err(Self::unreachable()) })
    }
}
