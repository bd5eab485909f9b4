//! Configuration management for the ticket sale host.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unset variables fall back to the default; set but malformed ones are errors.

use seatsale_core::{Address, BlockHeight};
use seatsale_runtime::poll::PollPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Ledger host configuration
    pub ledger: LedgerConfig,
    /// Client receipt polling
    pub client: ClientConfig,
    /// Off-ledger verification
    pub verifier: VerifierConfig,
    /// Tracing filter directive
    pub log_filter: String,
}

/// Ledger host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address the sale contract is deployed at
    pub contract_address: Address,
    /// Block height the host starts at
    pub genesis_height: BlockHeight,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Fixed delay between receipt polls
    pub poll_interval: Duration,
    /// Give up waiting for a receipt after this long
    pub receipt_timeout: Duration,
}

impl ClientConfig {
    /// Polling policy for [`crate::client::SaleClient`]
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::builder()
            .interval(self.poll_interval)
            .timeout(self.receipt_timeout)
            .build()
    }
}

/// Verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Bound on fetching the purchase log
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a set variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a set variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_ms = |var: &'static str, default: u64| -> Result<Duration, ConfigError> {
            parse(&lookup, var, default).map(Duration::from_millis)
        };

        let contract_address = match lookup("SEATSALE_CONTRACT_ADDRESS") {
            Some(value) => value.parse().map_err(|e: seatsale_core::ledger::ParseAddressError| {
                ConfigError::Invalid {
                    var: "SEATSALE_CONTRACT_ADDRESS",
                    reason: e.to_string(),
                    value,
                }
            })?,
            None => default_contract_address(),
        };

        Ok(Self {
            ledger: LedgerConfig {
                contract_address,
                genesis_height: BlockHeight::new(parse(&lookup, "SEATSALE_GENESIS_HEIGHT", 1)?),
            },
            client: ClientConfig {
                poll_interval: parse_ms("SEATSALE_RECEIPT_POLL_INTERVAL_MS", 250)?,
                receipt_timeout: parse_ms("SEATSALE_RECEIPT_TIMEOUT_MS", 10_000)?,
            },
            verifier: VerifierConfig {
                timeout: parse_ms("SEATSALE_VERIFY_TIMEOUT_MS", 5_000)?,
            },
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                contract_address: default_contract_address(),
                genesis_height: BlockHeight::new(1),
            },
            client: ClientConfig {
                poll_interval: Duration::from_millis(250),
                receipt_timeout: Duration::from_secs(10),
            },
            verifier: VerifierConfig {
                timeout: Duration::from_secs(5),
            },
            log_filter: "info".to_string(),
        }
    }
}

/// `0x0000000000000000000000000000000000005ea7`
fn default_contract_address() -> Address {
    Address::from_low_u64(0x5ea7)
}

fn parse<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
    })
}
