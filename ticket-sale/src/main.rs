//! Seat sale demo host.
//!
//! Deploys the sale contract on an in-process ledger, runs one sale (a buyer,
//! a refused second buyer, the end of sale) and prints the ownership the
//! purchase log reconstructs.

use anyhow::{Context, bail};
use chrono::{Duration as ChronoDuration, Utc};
use seatsale_core::{Address, Amount, CallContext, Clock};
use seatsale_runtime::{ChainClock, LedgerBuilder};
use seatsale_testing::InMemoryEventLog;
use std::sync::Arc;
use ticket_sale::{
    Config, PurchaseLogVerifier, SaleClient, SaleEnvironment, SaleInit, Seat, ShowDetails,
    TicketIdentity, TicketSaleReducer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SALE_BLOCKS: u64 = 99;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();
    seatsale_runtime::metrics::describe_metrics();

    info!(
        contract = %config.ledger.contract_address,
        genesis = %config.ledger.genesis_height,
        "Starting seat sale host"
    );

    let owner = Address::from_low_u64(0x0A);
    let alice = Address::from_low_u64(0xA1);
    let bob = Address::from_low_u64(0xB0);
    let front_row = [Seat::new(1, 'A'), Seat::new(1, 'B')];

    let clock = ChainClock::new(config.ledger.genesis_height);
    let event_log = Arc::new(InMemoryEventLog::new());
    let ledger = LedgerBuilder::new(config.ledger.contract_address, event_log.clone())
        .clock(clock.clone())
        .balance(alice, Amount::new(100))
        .balance(bob, Amount::new(100))
        .deploy(
            TicketSaleReducer::new(),
            SaleEnvironment::new(Arc::new(clock.clone())),
            CallContext::from_sender(owner),
            SaleInit {
                seats: front_row.to_vec(),
                venue: "Globe Theatre".to_string(),
            },
        )
        .await
        .context("Deploying the sale contract")?;
    let ledger = Arc::new(ledger);

    let client = SaleClient::new(
        ledger.clone(),
        ledger.contract(),
        config.client.poll_policy(),
    );
    let verifier = PurchaseLogVerifier::new(ledger.clone(), ledger.contract(), config.verifier.timeout);

    let end_of_sale = clock.now() + SALE_BLOCKS;
    let opened = client
        .begin_sale(
            owner,
            vec![(front_row[0], Amount::new(50)), (front_row[1], Amount::new(24))],
            ShowDetails {
                name: "Hamlet".to_string(),
                organiser: "Lord Chamberlain's Men".to_string(),
                time: Utc::now() + ChronoDuration::days(30),
            },
            end_of_sale,
        )
        .await;
    if !opened.as_ref().is_some_and(|r| r.is_committed()) {
        bail!("Sale did not open: {opened:?}");
    }

    let identity = TicketIdentity {
        secret: Some("front-door".to_string()),
        customer_identifier: Some("alice".to_string()),
    };
    let bought = client
        .reserve(alice, front_row[0], Amount::new(50), Some(identity))
        .await
        .and_then(|r| r.returned_bool());
    info!(buyer = %alice, seat = %front_row[0], ?bought, "First reservation");

    let refused = client
        .reserve(bob, front_row[0], Amount::new(50), None)
        .await;
    if let Some(receipt) = &refused {
        info!(
            buyer = %bob,
            seat = %front_row[0],
            bought = ?receipt.returned_bool(),
            refunded = %receipt.delivered_to(bob),
            "Second reservation"
        );
    }

    let outcome = verifier.verify(front_row[0], alice).await;
    info!(seat = %front_row[0], holder = %alice, ?outcome, "Door check");

    clock.set(end_of_sale);
    if !client
        .end_sale(owner)
        .await
        .is_some_and(|r| r.is_committed())
    {
        warn!("End of sale was not committed");
    }

    match verifier.reconstruct().await {
        Some(reconstruction) => {
            println!("{}", serde_json::to_string_pretty(&reconstruction)?);
        }
        None => warn!("Purchase log could not be reconstructed"),
    }

    info!(
        events = event_log.len(),
        alice = %ledger.balance(alice).await,
        bob = %ledger.balance(bob).await,
        contract = %ledger.balance(ledger.contract()).await,
        "Done"
    );
    Ok(())
}
