//! Dispersal configuration.
//!
//! Loaded from defaults, from serde (durations in milliseconds) or from
//! `DA_*` environment variables.

use crate::domain::PolynomialForm;
use crate::error::DispersalError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::env;
use std::time::Duration;

/// Largest blob accepted by the network, in 32-byte symbols (16 MiB).
pub const DEFAULT_MAX_BLOB_SYMBOLS: usize = 16 * 1024 * 1024 / 32;

/// Tunables for [`crate::PayloadDisperser`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersalConfig {
    /// Blob version submitted to the backend.
    pub blob_version: u16,

    /// Form payload symbols take before dispersal.
    pub payload_form: PolynomialForm,

    /// Upper bound on blob size, in symbols.
    pub max_blob_symbols: usize,

    /// Overall deadline for one dispersal. Zero means none beyond the
    /// per-stage budgets.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub dispersal_timeout: Duration,

    /// Budget for each chain read (quorums, thresholds, block number,
    /// certificate build and verification).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub contract_call_timeout: Duration,

    /// Budget for the submission RPC.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub disperse_blob_timeout: Duration,

    /// Budget for the whole poll loop.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub blob_complete_timeout: Duration,

    /// Tick between status polls.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub blob_status_poll_interval: Duration,

    /// Tick between chain head reads while the disperser waits for a
    /// certificate's reference block. Zero skips the wait stage.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub block_number_poll_interval: Duration,

    /// Maximum distance between a certificate's reference block and its
    /// inclusion block. Zero disables the check.
    pub rbn_recency_window: u64,
}

impl Default for DispersalConfig {
    fn default() -> Self {
        Self {
            blob_version: 0,
            payload_form: PolynomialForm::Coeff,
            max_blob_symbols: DEFAULT_MAX_BLOB_SYMBOLS,
            dispersal_timeout: Duration::ZERO,
            contract_call_timeout: Duration::from_secs(5),
            disperse_blob_timeout: Duration::from_secs(5),
            blob_complete_timeout: Duration::from_secs(10),
            blob_status_poll_interval: Duration::from_secs(1),
            block_number_poll_interval: Duration::from_secs(1),
            rbn_recency_window: 0,
        }
    }
}

impl DispersalConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DA_BLOB_VERSION` (default: 0)
    /// - `DA_PAYLOAD_FORM`: `coeff` or `eval` (default: coeff)
    /// - `DA_MAX_BLOB_SYMBOLS` (default: 524288)
    /// - `DA_DISPERSAL_TIMEOUT_MS` (default: 0, no overall deadline)
    /// - `DA_CONTRACT_CALL_TIMEOUT_MS` (default: 5000)
    /// - `DA_DISPERSE_BLOB_TIMEOUT_MS` (default: 5000)
    /// - `DA_BLOB_COMPLETE_TIMEOUT_MS` (default: 10000)
    /// - `DA_BLOB_STATUS_POLL_INTERVAL_MS` (default: 1000)
    /// - `DA_BLOCK_NUMBER_POLL_INTERVAL_MS` (default: 1000)
    /// - `DA_RBN_RECENCY_WINDOW` (default: 0, disabled)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            blob_version: env_parse("DA_BLOB_VERSION").unwrap_or(defaults.blob_version),
            payload_form: env_parse("DA_PAYLOAD_FORM").unwrap_or(defaults.payload_form),
            max_blob_symbols: env_parse("DA_MAX_BLOB_SYMBOLS")
                .unwrap_or(defaults.max_blob_symbols),
            dispersal_timeout: env_millis("DA_DISPERSAL_TIMEOUT_MS")
                .unwrap_or(defaults.dispersal_timeout),
            contract_call_timeout: env_millis("DA_CONTRACT_CALL_TIMEOUT_MS")
                .unwrap_or(defaults.contract_call_timeout),
            disperse_blob_timeout: env_millis("DA_DISPERSE_BLOB_TIMEOUT_MS")
                .unwrap_or(defaults.disperse_blob_timeout),
            blob_complete_timeout: env_millis("DA_BLOB_COMPLETE_TIMEOUT_MS")
                .unwrap_or(defaults.blob_complete_timeout),
            blob_status_poll_interval: env_millis("DA_BLOB_STATUS_POLL_INTERVAL_MS")
                .unwrap_or(defaults.blob_status_poll_interval),
            block_number_poll_interval: env_millis("DA_BLOCK_NUMBER_POLL_INTERVAL_MS")
                .unwrap_or(defaults.block_number_poll_interval),
            rbn_recency_window: env_parse("DA_RBN_RECENCY_WINDOW")
                .unwrap_or(defaults.rbn_recency_window),
        }
    }

    /// Overall deadline, if configured.
    pub fn overall_timeout(&self) -> Option<Duration> {
        (!self.dispersal_timeout.is_zero()).then_some(self.dispersal_timeout)
    }

    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), DispersalError> {
        let required = [
            ("contract_call_timeout", self.contract_call_timeout),
            ("disperse_blob_timeout", self.disperse_blob_timeout),
            ("blob_complete_timeout", self.blob_complete_timeout),
            ("blob_status_poll_interval", self.blob_status_poll_interval),
        ];
        for (name, value) in required {
            if value.is_zero() {
                return Err(DispersalError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.blob_status_poll_interval >= self.blob_complete_timeout {
            return Err(DispersalError::Config(format!(
                "blob_status_poll_interval ({:?}) must be shorter than blob_complete_timeout ({:?})",
                self.blob_status_poll_interval, self.blob_complete_timeout
            )));
        }
        if self.max_blob_symbols < 2 || !self.max_blob_symbols.is_power_of_two() {
            return Err(DispersalError::Config(format!(
                "max_blob_symbols ({}) must be a power of two of at least 2",
                self.max_blob_symbols
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
