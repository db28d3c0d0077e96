//! Remote signal/ledger API.
//!
//! Defines the `SignalApi` trait, the single collaborator seam shared by the
//! poll scheduler and the ledger store, and the wire types it exchanges.
//! `client::ApiClient` is the reqwest-backed implementation.

pub mod client;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ledger::RawTrade;
use crate::monitor::clock::interval_minutes;
use crate::types::{BeaconError, IntervalSummary, LedgerSummary, ScanResult};

/// Ledger snapshot as returned by `/forward-test-results` (and `/run-backtest`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerResponse {
    #[serde(default)]
    pub trades: Vec<RawTrade>,
    #[serde(default)]
    pub intervals: Vec<IntervalSummary>,
    #[serde(default)]
    pub summary: Option<LedgerSummary>,
}

/// Parameters of a server-side historical backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub assets: BTreeSet<String>,
    pub interval: String,
    pub lookback: u32,
    pub strategy: String,
    #[serde(default)]
    pub use_breakeven: bool,
    #[serde(default = "default_be_atr")]
    pub be_atr: f64,
    #[serde(default)]
    pub use_tp: bool,
    #[serde(default = "default_tp_atr")]
    pub tp_atr: f64,
}

fn default_be_atr() -> f64 {
    2.0
}

fn default_tp_atr() -> f64 {
    5.0
}

impl BacktestRequest {
    /// Reject contradictory input before any network call is made.
    pub fn validate(&self) -> Result<(), BeaconError> {
        if self.assets.is_empty() {
            return Err(BeaconError::EmptyAssetSelection);
        }
        if interval_minutes(&self.interval).is_none() {
            return Err(BeaconError::InvalidInterval(self.interval.clone()));
        }
        Ok(())
    }
}

/// Abstraction over the remote scan / ledger service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalApi: Send + Sync {
    /// Run a signal scan for every tracked asset at `interval`.
    async fn scan(&self, interval: &str, strategy: &str) -> Result<Vec<ScanResult>>;

    /// Fetch the forward-test ledger snapshot.
    async fn forward_test_results(&self) -> Result<LedgerResponse>;

    /// Run a historical backtest. Callers validate the request first.
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<LedgerResponse>;
}
