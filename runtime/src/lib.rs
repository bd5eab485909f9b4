//! # Seat Sale Runtime
//!
//! In-process ledger host for contracts written against `seatsale-core`.
//!
//! This crate provides the [`Ledger`] that plays the part of the hosting
//! ledger: it owns the logical clock, account balances, one contract's storage,
//! the append-only event log and the receipts of executed transactions.
//!
//! ## Core Components
//!
//! - **Ledger**: Executes calls atomically and records receipts
//! - **`ChainClock`**: Shared block height, readable by contracts through their environment
//! - **Poll**: Waits for receipts on a fixed interval with an overall deadline
//!
//! ## Execution Model
//!
//! 1. The sender must be able to cover the attached value
//! 2. The reducer runs against a copy of the contract storage
//! 3. On `Err`, the copy and every effect are dropped and an aborted receipt is recorded
//! 4. On `Ok`, events are appended to the log, the attached value moves to the
//!    contract, transfers are paid out of the contract balance and the copy
//!    replaces the storage
//!
//! ## Example
//!
//! ```ignore
//! use seatsale_runtime::{ChainClock, LedgerBuilder};
//!
//! let clock = ChainClock::new(BlockHeight::new(1));
//! let ledger = LedgerBuilder::new(contract, Arc::new(InMemoryEventLog::new()))
//!     .clock(clock.clone())
//!     .balance(buyer, Amount::new(100))
//!     .deploy(MyContract, MyEnvironment::new(clock), CallContext::from_sender(owner), init)
//!     .await?;
//!
//! let receipt = ledger.execute(CallContext::new(buyer, Amount::new(50)), MyAction::Buy).await?;
//! assert!(receipt.is_committed());
//! ```

use seatsale_core::event_log::EventLog;
use seatsale_core::gateway::{LedgerGateway, Receipt, Transaction};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Receipt polling
pub mod poll;

/// Ledger metrics
pub mod metrics;

pub use clock::ChainClock;
pub use error::LedgerError;
pub use host::{DEFAULT_RECEIPT_CAPACITY, Ledger, LedgerBuilder};

/// Error types for the ledger host
pub mod error {
    use seatsale_core::event_log::EventLogError;
    use seatsale_core::{Address, Amount};
    use thiserror::Error;

    /// Errors raised by the host itself.
    ///
    /// A contract refusing a call is not an error here: it produces an aborted
    /// receipt. These errors mean the call never reached the contract, or the
    /// contract could not be deployed at all.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum LedgerError {
        /// The sender cannot cover the value attached to the call
        #[error("Insufficient funds in {account}: needed {needed}, available {available}")]
        InsufficientFunds {
            /// Paying account
            account: Address,
            /// Attached value
            needed: Amount,
            /// Current balance
            available: Amount,
        },

        /// The transaction targets a contract this host does not run
        #[error("Unknown contract: {0}")]
        UnknownContract(Address),

        /// Transaction parameters could not be decoded
        #[error("Encoding error: {0}")]
        Encoding(String),

        /// The constructor refused its arguments
        #[error("Construction failed: {0}")]
        ConstructionFailed(String),

        /// A query named a method that mutates state
        #[error("Method {0} is not read-only")]
        NotReadOnly(&'static str),

        /// A read-only call aborted
        #[error("Query aborted: {0}")]
        QueryAborted(String),

        /// Crediting an account would overflow its balance
        #[error("Balance overflow for {0}")]
        BalanceOverflow(Address),

        /// The event log refused the constructor's events
        #[error("Event log error: {0}")]
        EventLog(#[from] EventLogError),
    }
}

/// The ledger's logical clock
pub mod clock {
    use seatsale_core::{BlockHeight, Clock};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Block height shared between the host and contract environments.
    ///
    /// Clones observe the same height.
    #[derive(Clone, Debug)]
    pub struct ChainClock {
        height: Arc<AtomicU64>,
    }

    impl ChainClock {
        /// Create a clock at `height`
        #[must_use]
        pub fn new(height: BlockHeight) -> Self {
            Self {
                height: Arc::new(AtomicU64::new(height.value())),
            }
        }

        /// Move forward by `blocks`, returning the new height
        pub fn advance(&self, blocks: u64) -> BlockHeight {
            let previous = self
                .height
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                    Some(h.saturating_add(blocks))
                })
                .unwrap_or_else(|h| h);
            BlockHeight::new(previous.saturating_add(blocks))
        }

        /// Jump to `height`
        pub fn set(&self, height: BlockHeight) {
            self.height.store(height.value(), Ordering::SeqCst);
        }
    }

    impl Default for ChainClock {
        fn default() -> Self {
            Self::new(BlockHeight::GENESIS)
        }
    }

    impl Clock for ChainClock {
        fn now(&self) -> BlockHeight {
            BlockHeight::new(self.height.load(Ordering::SeqCst))
        }
    }
}

/// Ledger host module
pub mod host {
    use super::{
        Arc, EventLog, HashMap, LedgerError, LedgerGateway, Mutex, Receipt, Transaction, VecDeque,
    };
    use crate::clock::ChainClock;
    use crate::metrics::LedgerMetrics;
    use seatsale_core::event::SerializedEvent;
    use seatsale_core::gateway::{GatewayError, GatewayFuture, TransferRecord, TxStatus};
    use seatsale_core::event_log::{EventLogError, LoggedEvent};
    use seatsale_core::{
        Action, Address, Amount, BlockHeight, CallContext, Clock, Effect, Effects, Reducer,
        ReturnValue, TxId,
    };
    use std::time::Instant;

    /// Account balances.
    #[derive(Clone, Debug, Default)]
    struct Balances(HashMap<Address, Amount>);

    impl Balances {
        fn get(&self, account: Address) -> Amount {
            self.0.get(&account).copied().unwrap_or(Amount::ZERO)
        }

        fn credit(&mut self, account: Address, amount: Amount) -> Result<Amount, LedgerError> {
            let balance = self
                .get(account)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow(account))?;
            self.0.insert(account, balance);
            Ok(balance)
        }

        /// Move `amount` between accounts; `false` (and no change) if `from`
        /// cannot cover it or `to` would overflow.
        fn move_value(&mut self, from: Address, to: Address, amount: Amount) -> bool {
            if from == to {
                return self.get(from) >= amount;
            }
            let Some(remaining) = self.get(from).checked_sub(amount) else {
                return false;
            };
            let Some(credited) = self.get(to).checked_add(amount) else {
                return false;
            };
            self.0.insert(from, remaining);
            self.0.insert(to, credited);
            true
        }
    }

    /// Receipts kept by a ledger unless [`LedgerBuilder::receipt_capacity`] says otherwise
    pub const DEFAULT_RECEIPT_CAPACITY: usize = 10_000;

    /// The most recent receipts, oldest evicted first once full.
    #[derive(Debug)]
    struct Receipts {
        by_id: HashMap<TxId, Receipt>,
        order: VecDeque<TxId>,
        capacity: usize,
    }

    impl Receipts {
        fn with_capacity(capacity: usize) -> Self {
            Self {
                by_id: HashMap::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            }
        }

        fn get(&self, tx_id: TxId) -> Option<&Receipt> {
            self.by_id.get(&tx_id)
        }

        fn insert(&mut self, receipt: Receipt) {
            while self.order.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.by_id.remove(&oldest);
                tracing::trace!(tx_id = %oldest, "Receipt evicted");
            }
            self.order.push_back(receipt.tx_id);
            self.by_id.insert(receipt.tx_id, receipt);
        }
    }

    /// Everything the host mutates, guarded by one lock.
    struct LedgerInner<S> {
        state: S,
        balances: Balances,
        receipts: Receipts,
    }

    /// What a committed call asked the host to do.
    #[derive(Default)]
    struct Outcome {
        events: Vec<SerializedEvent>,
        transfers: Vec<(Address, Amount)>,
        return_value: ReturnValue,
    }

    impl Outcome {
        fn from_effects(effects: Effects) -> Self {
            let mut outcome = Self::default();
            for effect in effects {
                match effect {
                    Effect::Transfer { to, amount } => outcome.transfers.push((to, amount)),
                    Effect::Emit(event) => outcome.events.push(event),
                    Effect::Return(value) => outcome.return_value = value,
                }
            }
            outcome
        }
    }

    /// Builder for a [`Ledger`]: genesis balances and clock, then deploy.
    pub struct LedgerBuilder {
        contract: Address,
        event_log: Arc<dyn EventLog>,
        clock: ChainClock,
        balances: Balances,
        receipt_capacity: usize,
    }

    impl LedgerBuilder {
        /// Start building a ledger for a contract at `contract`
        #[must_use]
        pub fn new(contract: Address, event_log: Arc<dyn EventLog>) -> Self {
            Self {
                contract,
                event_log,
                clock: ChainClock::default(),
                balances: Balances::default(),
                receipt_capacity: DEFAULT_RECEIPT_CAPACITY,
            }
        }

        /// Use `clock` as the chain clock (share it with the contract environment)
        #[must_use]
        pub fn clock(mut self, clock: ChainClock) -> Self {
            self.clock = clock;
            self
        }

        /// Give `account` a genesis balance
        #[must_use]
        pub fn balance(mut self, account: Address, amount: Amount) -> Self {
            self.balances.0.insert(account, amount);
            self
        }

        /// Keep at most `capacity` receipts (at least one); older ones are
        /// evicted and [`Ledger::receipt`] then reports them as unknown
        #[must_use]
        pub fn receipt_capacity(mut self, capacity: usize) -> Self {
            self.receipt_capacity = capacity;
            self
        }

        /// Run the constructor and start the ledger.
        ///
        /// The constructor's events are appended to the log at the current height.
        ///
        /// # Errors
        ///
        /// - [`LedgerError::InsufficientFunds`]: the deployer cannot cover the attached value
        /// - [`LedgerError::ConstructionFailed`]: the constructor aborted
        /// - [`LedgerError::EventLog`]: the log refused the constructor's events
        pub async fn deploy<R>(
            self,
            reducer: R,
            environment: R::Environment,
            call: CallContext,
            init: R::Init,
        ) -> Result<Ledger<R>, LedgerError>
        where
            R: Reducer,
        {
            let Self {
                contract,
                event_log,
                clock,
                mut balances,
                receipt_capacity,
            } = self;
            let height = clock.now();

            let available = balances.get(call.sender);
            if available < call.value {
                return Err(LedgerError::InsufficientFunds {
                    account: call.sender,
                    needed: call.value,
                    available,
                });
            }

            let (state, effects) = reducer
                .construct(init, &call, &environment)
                .map_err(|e| LedgerError::ConstructionFailed(e.to_string()))?;

            if !balances.move_value(call.sender, contract, call.value) {
                return Err(LedgerError::BalanceOverflow(contract));
            }

            let outcome = Outcome::from_effects(effects);
            let logged = if outcome.events.is_empty() {
                Vec::new()
            } else {
                event_log.append(contract, height, outcome.events).await?
            };
            LedgerMetrics::record_events(logged.len());

            let inner = LedgerInner {
                state,
                balances,
                receipts: Receipts::with_capacity(receipt_capacity),
            };

            tracing::info!(
                %contract,
                owner = %call.sender,
                %height,
                events = logged.len(),
                "Contract deployed"
            );

            Ok(Ledger {
                contract,
                reducer,
                environment,
                clock,
                event_log,
                inner: Mutex::new(inner),
            })
        }
    }

    /// The ledger host.
    ///
    /// Runs one contract. Transactions are serialized behind a single lock;
    /// each one either commits entirely or leaves no trace besides its receipt.
    ///
    /// # Type Parameters
    ///
    /// - `R`: The contract's reducer
    pub struct Ledger<R: Reducer> {
        contract: Address,
        reducer: R,
        environment: R::Environment,
        clock: ChainClock,
        event_log: Arc<dyn EventLog>,
        inner: Mutex<LedgerInner<R::State>>,
    }

    impl<R> Ledger<R>
    where
        R: Reducer,
        R::Action: Action,
    {
        /// Address of the hosted contract
        #[must_use]
        pub const fn contract(&self) -> Address {
            self.contract
        }

        /// The chain clock
        #[must_use]
        pub const fn clock(&self) -> &ChainClock {
            &self.clock
        }

        /// Current balance of `account`
        pub async fn balance(&self, account: Address) -> Amount {
            self.inner.lock().await.balances.get(account)
        }

        /// Mint `amount` into `account`, returning the new balance.
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::BalanceOverflow`] if the balance would overflow.
        pub async fn fund(&self, account: Address, amount: Amount) -> Result<Amount, LedgerError> {
            self.inner.lock().await.balances.credit(account, amount)
        }

        /// Read contract storage via a closure
        ///
        /// ```ignore
        /// let sold = ledger.state(|s| s.tickets.iter().filter(|t| t.is_sold()).count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            let inner = self.inner.lock().await;
            f(&inner.state)
        }

        /// Receipt of an executed transaction, if it is still retained
        pub async fn receipt(&self, tx_id: TxId) -> Option<Receipt> {
            self.inner.lock().await.receipts.get(tx_id).cloned()
        }

        /// Execute a call as one atomic transaction.
        ///
        /// # Returns
        ///
        /// The receipt, committed or aborted. Aborted receipts carry the
        /// contract's reason and changed nothing.
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::InsufficientFunds`] if the sender cannot cover
        /// the attached value; the call never reaches the contract.
        pub async fn execute(
            &self,
            call: CallContext,
            action: R::Action,
        ) -> Result<Receipt, LedgerError> {
            let tx_id = TxId::new();
            let method = action.method();
            let mut inner = self.inner.lock().await;
            let height = self.clock.now();

            tracing::debug!(%tx_id, method, sender = %call.sender, value = %call.value, %height, "Executing call");

            let available = inner.balances.get(call.sender);
            if available < call.value {
                tracing::warn!(%tx_id, method, sender = %call.sender, "Rejected call: insufficient funds");
                return Err(LedgerError::InsufficientFunds {
                    account: call.sender,
                    needed: call.value,
                    available,
                });
            }

            let start = Instant::now();
            let mut working = inner.state.clone();
            let outcome = match self
                .reducer
                .reduce(&mut working, action, &call, &self.environment)
            {
                Ok(effects) => Outcome::from_effects(effects),
                Err(error) => {
                    let reason = error.to_string();
                    tracing::warn!(%tx_id, method, reason = %reason, "Call aborted");
                    return Ok(Self::record_abort(&mut inner, tx_id, height, reason));
                }
            };

            // The contract is credited before transfers run, so refunds of the
            // attached value are always covered.
            let mut balances = inner.balances.clone();
            if !balances.move_value(call.sender, self.contract, call.value) {
                let reason = format!("balance overflow for {}", self.contract);
                tracing::warn!(%tx_id, method, reason = %reason, "Call aborted");
                return Ok(Self::record_abort(&mut inner, tx_id, height, reason));
            }

            let logged: Vec<LoggedEvent> = if outcome.events.is_empty() {
                Vec::new()
            } else {
                match self
                    .event_log
                    .append(self.contract, height, outcome.events)
                    .await
                {
                    Ok(logged) => logged,
                    Err(error) => {
                        let reason = format!("event log: {error}");
                        tracing::error!(%tx_id, method, %error, "Event append failed, aborting call");
                        return Ok(Self::record_abort(&mut inner, tx_id, height, reason));
                    }
                }
            };
            LedgerMetrics::record_events(logged.len());

            let transfers = outcome
                .transfers
                .into_iter()
                .map(|(to, amount)| {
                    let delivered = balances.move_value(self.contract, to, amount);
                    LedgerMetrics::record_transfer(delivered);
                    if !delivered {
                        tracing::warn!(%tx_id, %to, %amount, "Transfer not delivered");
                    }
                    TransferRecord {
                        to,
                        amount,
                        delivered,
                    }
                })
                .collect();

            inner.balances = balances;
            inner.state = working;

            let receipt = Receipt {
                tx_id,
                status: TxStatus::Committed,
                return_value: outcome.return_value,
                events: logged,
                commit_height: height,
                transfers,
            };
            inner.receipts.insert(receipt.clone());

            LedgerMetrics::record_commit(start.elapsed());
            tracing::info!(
                %tx_id,
                method,
                events = receipt.events.len(),
                transfers = receipt.transfers.len(),
                "Call committed"
            );

            Ok(receipt)
        }

        /// Evaluate a read-only call without committing anything.
        ///
        /// # Errors
        ///
        /// - [`LedgerError::NotReadOnly`]: the method mutates state
        /// - [`LedgerError::QueryAborted`]: the contract aborted the call
        pub async fn query(
            &self,
            sender: Address,
            action: R::Action,
        ) -> Result<ReturnValue, LedgerError> {
            if !action.is_read_only() {
                return Err(LedgerError::NotReadOnly(action.method()));
            }

            let mut scratch = self.inner.lock().await.state.clone();
            let call = CallContext::from_sender(sender);
            let effects = self
                .reducer
                .reduce(&mut scratch, action, &call, &self.environment)
                .map_err(|e| LedgerError::QueryAborted(e.to_string()))?;

            Ok(Outcome::from_effects(effects).return_value)
        }

        /// Decode and execute a gateway transaction.
        ///
        /// # Errors
        ///
        /// - [`LedgerError::UnknownContract`]: the transaction targets another contract
        /// - [`LedgerError::Encoding`]: the parameters do not decode
        /// - [`LedgerError::InsufficientFunds`]: see [`Ledger::execute`]
        pub async fn execute_transaction(&self, tx: &Transaction) -> Result<Receipt, LedgerError> {
            if tx.contract != self.contract {
                return Err(LedgerError::UnknownContract(tx.contract));
            }
            let action: R::Action = tx
                .decode()
                .map_err(|e| LedgerError::Encoding(e.to_string()))?;
            self.execute(CallContext::new(tx.sender, tx.value), action)
                .await
        }

        fn record_abort(
            inner: &mut LedgerInner<R::State>,
            tx_id: TxId,
            height: BlockHeight,
            reason: String,
        ) -> Receipt {
            LedgerMetrics::record_abort();
            let receipt = Receipt {
                tx_id,
                status: TxStatus::Aborted { reason },
                return_value: ReturnValue::Unit,
                events: Vec::new(),
                commit_height: height,
                transfers: Vec::new(),
            };
            inner.receipts.insert(receipt.clone());
            receipt
        }
    }

    impl From<LedgerError> for GatewayError {
        fn from(error: LedgerError) -> Self {
            match error {
                LedgerError::UnknownContract(address) => Self::UnknownContract(address),
                LedgerError::Encoding(message) => Self::Encoding(message),
                other => Self::Rejected(other.to_string()),
            }
        }
    }

    fn unreachable_log(error: EventLogError) -> GatewayError {
        GatewayError::Unreachable(error.to_string())
    }

    impl<R> LedgerGateway for Ledger<R>
    where
        R: Reducer + Send + Sync,
        R::Action: Action,
        R::State: Send + Sync,
        R::Environment: Send + Sync,
    {
        fn submit(&self, tx: Transaction) -> GatewayFuture<'_, TxId> {
            Box::pin(async move {
                let receipt = self.execute_transaction(&tx).await?;
                Ok(receipt.tx_id)
            })
        }

        fn fetch_receipt(&self, tx_id: TxId) -> GatewayFuture<'_, Option<Receipt>> {
            Box::pin(async move { Ok(self.receipt(tx_id).await) })
        }

        fn fetch_events(
            &self,
            contract: Address,
            event_type: String,
        ) -> GatewayFuture<'_, Vec<LoggedEvent>> {
            Box::pin(async move {
                if contract != self.contract {
                    return Err(GatewayError::UnknownContract(contract));
                }
                self.event_log
                    .load_by_type(contract, event_type)
                    .await
                    .map_err(unreachable_log)
            })
        }
    }
}
