//! Metrics for observability of the ledger host.
//!
//! Metrics are recorded through the `metrics` facade. Nothing is exported
//! unless the embedding binary installs a recorder; without one every call
//! here is a no-op.
//!
//! - Transactions by outcome
//! - Events appended to the log
//! - Value transfers by delivery status
//! - Receipt polls that timed out
//!
//! # Example
//!
//! ```rust
//! use seatsale_runtime::metrics::{LedgerMetrics, describe_metrics};
//! use std::time::Duration;
//!
//! describe_metrics();
//! LedgerMetrics::record_commit(Duration::from_micros(40));
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register all metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "ledger_transactions_total",
        "Total number of executed transactions, by status"
    );
    describe_histogram!(
        "ledger_execution_duration_seconds",
        "Time taken to execute a committed transaction"
    );
    describe_counter!(
        "ledger_events_appended_total",
        "Total number of events appended to the event log"
    );
    describe_counter!(
        "ledger_transfers_total",
        "Total number of value transfers out of contracts, by delivery"
    );
    describe_counter!(
        "receipt_poll_timeouts_total",
        "Total number of receipt polls that gave up"
    );
}

/// Ledger host metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record a committed transaction.
    pub fn record_commit(duration: Duration) {
        counter!("ledger_transactions_total", "status" => "committed").increment(1);
        histogram!("ledger_execution_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an aborted transaction.
    pub fn record_abort() {
        counter!("ledger_transactions_total", "status" => "aborted").increment(1);
    }

    /// Record events appended for one transaction.
    pub fn record_events(count: usize) {
        counter!("ledger_events_appended_total").increment(count as u64);
    }

    /// Record one value transfer.
    pub fn record_transfer(delivered: bool) {
        let delivered = if delivered { "true" } else { "false" };
        counter!("ledger_transfers_total", "delivered" => delivered).increment(1);
    }
}

/// Receipt polling metrics recorder.
pub struct PollMetrics;

impl PollMetrics {
    /// Record a poll that gave up without a receipt.
    pub fn record_timeout() {
        counter!("receipt_poll_timeouts_total").increment(1);
    }
}
