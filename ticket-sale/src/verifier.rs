//! Off-ledger ticket verification.
//!
//! Fetches the contract's `Show` and `Ticket` events through the gateway and
//! folds them into a [`PurchaseLog`]. Both fetches run one after the other
//! under one deadline. A slow or unreachable gateway yields
//! [`VerificationOutcome::Unknown`]: the verifier never retries on its own.

use crate::events::SaleEvent;
use crate::projections::{PurchaseLog, Reconstruction, VerificationOutcome};
use crate::types::Seat;
use seatsale_core::gateway::{GatewayError, LedgerGateway};
use seatsale_core::Address;
use std::sync::Arc;
use std::time::Duration;

/// Verifies seat ownership from the event log
#[derive(Clone)]
pub struct PurchaseLogVerifier {
    gateway: Arc<dyn LedgerGateway>,
    contract: Address,
    timeout: Duration,
}

impl PurchaseLogVerifier {
    /// Creates a new `PurchaseLogVerifier`
    #[must_use]
    pub fn new(gateway: Arc<dyn LedgerGateway>, contract: Address, timeout: Duration) -> Self {
        Self {
            gateway,
            contract,
            timeout,
        }
    }

    /// Fetch and fold the contract's purchase log.
    ///
    /// Returns `None` if the events could not be fetched before the deadline,
    /// or did not decode.
    pub async fn load(&self) -> Option<PurchaseLog> {
        // Tickets before shows: a sale begun between the two reads then starts
        // after every fetched ticket, so two sales never mix.
        let fetch = async {
            let tickets = self
                .gateway
                .fetch_events(self.contract, SaleEvent::TICKET.to_string())
                .await?;
            let shows = self
                .gateway
                .fetch_events(self.contract, SaleEvent::SHOW.to_string())
                .await?;
            Ok::<_, GatewayError>((shows, tickets))
        };

        let (shows, tickets) = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(events)) => events,
            Ok(Err(error)) => {
                tracing::warn!(contract = %self.contract, %error, "Event fetch failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    contract = %self.contract,
                    timeout_ms = self.timeout.as_millis(),
                    "Event fetch timed out"
                );
                return None;
            }
        };

        match PurchaseLog::from_events(shows.iter().chain(&tickets)) {
            Ok(log) => {
                tracing::debug!(
                    contract = %self.contract,
                    shows = shows.len(),
                    tickets = tickets.len(),
                    "Purchase log loaded"
                );
                Some(log)
            }
            Err(error) => {
                tracing::warn!(contract = %self.contract, %error, "Purchase log did not decode");
                None
            }
        }
    }

    /// Check whether `claimed` currently holds `seat`
    pub async fn verify(&self, seat: Seat, claimed: Address) -> VerificationOutcome {
        let Some(log) = self.load().await else {
            return VerificationOutcome::Unknown;
        };
        let outcome = log.verify_holder(seat, claimed);
        tracing::info!(%seat, %claimed, verified = outcome.is_verified(), "Ticket verified");
        outcome
    }

    /// Reconstruct every seat with activity in the current sale.
    ///
    /// `None` when the log could not be read or no sale has started.
    pub async fn reconstruct(&self) -> Option<Reconstruction> {
        let log = self.load().await?;
        match log.reconstruct() {
            Ok(reconstruction) => Some(reconstruction),
            Err(error) => {
                tracing::info!(contract = %self.contract, %error, "Nothing to reconstruct");
                None
            }
        }
    }
}
