//! The ledger gateway boundary.
//!
//! Everything off-ledger talks to the ledger through this trait: submitting a
//! transaction, polling for its receipt and reading historical events. The
//! signing HTTP gateway of a production deployment and the in-process host of
//! `seatsale-runtime` both implement it.

use crate::action::Action;
use crate::event_log::LoggedEvent;
use crate::ledger::{Address, Amount, ReturnValue, TxId};
use crate::position::BlockHeight;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Gateway error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The node cannot be reached
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// The transaction was refused before execution
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// No contract is deployed at the address
    #[error("Unknown contract: {0}")]
    UnknownContract(Address),

    /// Parameters could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Gateway future
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// A contract call ready for submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Target contract
    pub contract: Address,
    /// Calling account
    pub sender: Address,
    /// Value attached to the call
    pub value: Amount,
    /// Method name
    pub method: String,
    /// bincode-encoded action
    pub params: Vec<u8>,
}

impl Transaction {
    /// Encode an action into a transaction.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Encoding` if the action cannot be serialized.
    pub fn call<A: Action>(
        contract: Address,
        sender: Address,
        value: Amount,
        action: &A,
    ) -> Result<Self, GatewayError> {
        let params =
            bincode::serialize(action).map_err(|e| GatewayError::Encoding(e.to_string()))?;
        Ok(Self {
            contract,
            sender,
            value,
            method: action.method().to_string(),
            params,
        })
    }

    /// Decode the parameters back into an action.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Encoding` if the parameters do not decode, or if
    /// the decoded action names a different method than `self.method`.
    pub fn decode<A: Action>(&self) -> Result<A, GatewayError> {
        let action: A = bincode::deserialize(&self.params)
            .map_err(|e| GatewayError::Encoding(e.to_string()))?;
        if action.method() != self.method {
            return Err(GatewayError::Encoding(format!(
                "method {} does not match parameters for {}",
                self.method,
                action.method()
            )));
        }
        Ok(action)
    }
}

/// Outcome of an executed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// All state changes, events and transfers were applied
    Committed,
    /// Nothing was applied
    Aborted {
        /// Why the call aborted
        reason: String,
    },
}

/// A value transfer executed as part of a committed call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Recipient
    pub to: Address,
    /// Value
    pub amount: Amount,
    /// Whether the value actually moved
    pub delivered: bool,
}

/// Receipt of an executed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction this receipt belongs to
    pub tx_id: TxId,
    /// Commit or abort
    pub status: TxStatus,
    /// Value returned by the method (`Unit` on abort)
    pub return_value: ReturnValue,
    /// Events appended to the log
    pub events: Vec<LoggedEvent>,
    /// Block the transaction executed in
    pub commit_height: BlockHeight,
    /// Transfers out of the contract
    pub transfers: Vec<TransferRecord>,
}

impl Receipt {
    /// Whether the transaction committed
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self.status, TxStatus::Committed)
    }

    /// Boolean return value of a committed call
    #[must_use]
    pub const fn returned_bool(&self) -> Option<bool> {
        match self.status {
            TxStatus::Committed => self.return_value.as_bool(),
            TxStatus::Aborted { .. } => None,
        }
    }

    /// Total value delivered to `to`
    #[must_use]
    pub fn delivered_to(&self, to: Address) -> Amount {
        self.transfers
            .iter()
            .filter(|t| t.delivered && t.to == to)
            .fold(Amount::ZERO, |sum, t| {
                sum.checked_add(t.amount).unwrap_or(Amount::new(u64::MAX))
            })
    }
}

/// Ledger gateway trait
///
/// Abstraction over whatever turns contract calls into committed transactions.
pub trait LedgerGateway: Send + Sync {
    /// Submit a transaction
    ///
    /// # Errors
    ///
    /// Returns error if the transaction is rejected or the node is unreachable
    fn submit(&self, tx: Transaction) -> GatewayFuture<'_, TxId>;

    /// Fetch a receipt; `Ok(None)` while the transaction is not yet executed
    ///
    /// # Errors
    ///
    /// Returns error if the node is unreachable
    fn fetch_receipt(&self, tx_id: TxId) -> GatewayFuture<'_, Option<Receipt>>;

    /// Fetch every event of one type emitted by one contract, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the node is unreachable
    fn fetch_events(
        &self,
        contract: Address,
        event_type: String,
    ) -> GatewayFuture<'_, Vec<LoggedEvent>>;
}
