//! Typed client for the sale contract.
//!
//! Wraps a [`LedgerGateway`]: each method encodes a [`SaleAction`] into a
//! transaction, submits it, then waits for the receipt under the client's
//! [`PollPolicy`]. Anything that keeps the receipt from arriving (encoding,
//! an unreachable gateway, the deadline) is reported as `None`.

use crate::contract::SaleAction;
use crate::types::{Seat, ShowDetails, TicketIdentity};
use seatsale_core::gateway::{LedgerGateway, Receipt, Transaction, TxStatus};
use seatsale_core::{Action, Address, Amount, BlockHeight};
use seatsale_runtime::poll::{PollPolicy, poll_receipt};
use std::sync::Arc;

/// Client for one deployed sale contract
#[derive(Clone)]
pub struct SaleClient {
    gateway: Arc<dyn LedgerGateway>,
    contract: Address,
    policy: PollPolicy,
}

impl SaleClient {
    /// Creates a new `SaleClient`
    #[must_use]
    pub fn new(gateway: Arc<dyn LedgerGateway>, contract: Address, policy: PollPolicy) -> Self {
        Self {
            gateway,
            contract,
            policy,
        }
    }

    /// Contract this client talks to
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// Submit `action` from `sender` with `value` attached and wait for its receipt
    pub async fn call(&self, sender: Address, value: Amount, action: &SaleAction) -> Option<Receipt> {
        let tx = match Transaction::call(self.contract, sender, value, action) {
            Ok(tx) => tx,
            Err(error) => {
                tracing::warn!(method = action.method(), %error, "Could not encode call");
                return None;
            }
        };

        let tx_id = match self.gateway.submit(tx).await {
            Ok(tx_id) => tx_id,
            Err(error) => {
                tracing::warn!(method = action.method(), %sender, %error, "Submit failed");
                return None;
            }
        };

        let receipt = poll_receipt(self.gateway.as_ref(), tx_id, &self.policy).await?;
        if let TxStatus::Aborted { reason } = &receipt.status {
            tracing::info!(%tx_id, method = action.method(), %reason, "Call aborted");
        }
        Some(receipt)
    }

    /// Open a sale
    pub async fn begin_sale(
        &self,
        owner: Address,
        prices: Vec<(Seat, Amount)>,
        show: ShowDetails,
        end_of_sale: BlockHeight,
    ) -> Option<Receipt> {
        let action = SaleAction::BeginSale {
            prices,
            show,
            end_of_sale,
        };
        self.call(owner, Amount::ZERO, &action).await
    }

    /// Reset a finished sale
    pub async fn end_sale(&self, owner: Address) -> Option<Receipt> {
        self.call(owner, Amount::ZERO, &SaleAction::EndSale).await
    }

    /// Buy `seat` paying `payment`
    pub async fn reserve(
        &self,
        buyer: Address,
        seat: Seat,
        payment: Amount,
        identity: Option<TicketIdentity>,
    ) -> Option<Receipt> {
        self.call(buyer, payment, &SaleAction::Reserve { seat, identity })
            .await
    }

    /// Give `seat` back for a refund
    pub async fn release_ticket(&self, holder: Address, seat: Seat) -> Option<Receipt> {
        self.call(holder, Amount::ZERO, &SaleAction::ReleaseTicket { seat })
            .await
    }

    /// Set the release fee
    pub async fn set_release_fee(&self, owner: Address, fee: Amount) -> Option<Receipt> {
        self.call(owner, Amount::ZERO, &SaleAction::SetReleaseFee { fee })
            .await
    }

    /// Set the no-refund window
    pub async fn set_no_refund_blocks(&self, owner: Address, blocks: u64) -> Option<Receipt> {
        self.call(owner, Amount::ZERO, &SaleAction::SetNoRefundBlocks { blocks })
            .await
    }

    /// Whether `seat` is still for sale; `None` if unknown or the call aborted
    pub async fn check_availability(&self, caller: Address, seat: Seat) -> Option<bool> {
        self.call(caller, Amount::ZERO, &SaleAction::CheckAvailability { seat })
            .await?
            .returned_bool()
    }

    /// Whether `address` holds `seat`; `None` if unknown or the call aborted
    pub async fn owns_ticket(&self, caller: Address, seat: Seat, address: Address) -> Option<bool> {
        self.call(caller, Amount::ZERO, &SaleAction::OwnsTicket { seat, address })
            .await?
            .returned_bool()
    }
}
