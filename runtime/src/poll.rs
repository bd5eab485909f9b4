//! Receipt polling with a fixed interval and an overall deadline.
//!
//! Receipts are not available the moment a transaction is submitted. Callers
//! poll the gateway on a fixed delay until the receipt shows up or their own
//! deadline passes. A deadline or an unreachable gateway is reported as
//! absence (`None`), never as an error: the caller decides whether to retry
//! with a fresh bound.
//!
//! # Example
//!
//! ```rust,no_run
//! use seatsale_runtime::poll::{PollPolicy, poll_receipt};
//! use seatsale_core::gateway::LedgerGateway;
//! use seatsale_core::TxId;
//! use std::time::Duration;
//!
//! # async fn example(gateway: &dyn LedgerGateway, tx_id: TxId) {
//! let policy = PollPolicy::builder()
//!     .interval(Duration::from_millis(250))
//!     .timeout(Duration::from_secs(10))
//!     .build();
//!
//! match poll_receipt(gateway, tx_id, &policy).await {
//!     Some(receipt) => println!("committed: {}", receipt.is_committed()),
//!     None => println!("unknown, try again later"),
//! }
//! # }
//! ```

use crate::metrics::PollMetrics;
use seatsale_core::TxId;
use seatsale_core::gateway::{LedgerGateway, Receipt};
use std::time::Duration;
use tokio::time::sleep;

/// Polling policy: fixed delay between polls, bounded by an overall timeout.
///
/// # Default Values
///
/// - `interval`: 250ms
/// - `timeout`: 10 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two polls
    pub interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> PollPolicyBuilder {
        PollPolicyBuilder {
            interval: None,
            timeout: None,
        }
    }
}

/// Builder for [`PollPolicy`].
#[derive(Debug, Clone)]
pub struct PollPolicyBuilder {
    interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl PollPolicyBuilder {
    /// Set the delay between polls.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`PollPolicy`].
    #[must_use]
    pub fn build(self) -> PollPolicy {
        let defaults = PollPolicy::default();
        PollPolicy {
            interval: self.interval.unwrap_or(defaults.interval),
            timeout: self.timeout.unwrap_or(defaults.timeout),
        }
    }
}

/// Poll for a receipt until it is available or the policy's timeout expires.
///
/// A gateway error ends the wait at once; polling does not retry through an
/// unreachable node.
///
/// # Returns
///
/// `Some(receipt)` once the transaction has executed, `None` on timeout or
/// gateway failure.
pub async fn poll_receipt<G>(gateway: &G, tx_id: TxId, policy: &PollPolicy) -> Option<Receipt>
where
    G: LedgerGateway + ?Sized,
{
    let interval = policy.interval;
    let wait = async move {
        let mut attempt: u32 = 0;
        loop {
            match gateway.fetch_receipt(tx_id).await {
                Ok(Some(receipt)) => {
                    if attempt > 0 {
                        tracing::debug!(%tx_id, attempt, "Receipt available after polling");
                    }
                    return Some(receipt);
                }
                Ok(None) => {
                    tracing::trace!(%tx_id, attempt, "Receipt not yet available");
                    attempt = attempt.saturating_add(1);
                    sleep(interval).await;
                }
                Err(error) => {
                    tracing::warn!(%tx_id, attempt, %error, "Receipt fetch failed");
                    return None;
                }
            }
        }
    };

    if let Ok(receipt) = tokio::time::timeout(policy.timeout, wait).await {
        receipt
    } else {
        PollMetrics::record_timeout();
        tracing::warn!(
            %tx_id,
            timeout_ms = policy.timeout.as_millis(),
            "Gave up waiting for receipt"
        );
        None
    }
}
