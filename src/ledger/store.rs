//! Last-known-good ledger cache.
//!
//! Refreshing is always caller-initiated. A failed fetch never discards the
//! previous snapshot: callers get it back marked stale, and only when
//! nothing has ever been fetched do they get an explicit "no data" state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::normalize_all;
use crate::api::{LedgerResponse, SignalApi};
use crate::types::{IntervalSummary, LedgerSummary, Trade};

/// An immutable, normalized ledger snapshot.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub trades: Vec<Trade>,
    /// Server-provided interval cards, passed through untouched.
    pub intervals: Vec<IntervalSummary>,
    pub summary: Option<LedgerSummary>,
    pub fetched_at: DateTime<Utc>,
}

impl Ledger {
    pub fn from_response(resp: LedgerResponse) -> Self {
        Self {
            trades: normalize_all(resp.trades),
            intervals: resp.intervals,
            summary: resp.summary,
            fetched_at: Utc::now(),
        }
    }
}

/// Outcome of a refresh.
#[derive(Debug, Clone)]
pub enum LedgerState {
    Fresh(Arc<Ledger>),
    /// The fetch failed; the previous snapshot is still served.
    Stale { ledger: Arc<Ledger>, error: String },
    /// The fetch failed and nothing was cached.
    NoData { error: String },
}

impl LedgerState {
    pub fn ledger(&self) -> Option<&Arc<Ledger>> {
        match self {
            LedgerState::Fresh(l) | LedgerState::Stale { ledger: l, .. } => Some(l),
            LedgerState::NoData { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, LedgerState::Stale { .. })
    }
}

/// Caches the most recent successful ledger fetch.
pub struct LedgerStore {
    api: Arc<dyn SignalApi>,
    cached: RwLock<Option<Arc<Ledger>>>,
}

impl LedgerStore {
    pub fn new(api: Arc<dyn SignalApi>) -> Self {
        Self {
            api,
            cached: RwLock::new(None),
        }
    }

    /// Fetch a new snapshot, falling back to the cached one on failure.
    pub async fn refresh(&self) -> LedgerState {
        match self.api.forward_test_results().await {
            Ok(resp) => {
                let ledger = Arc::new(Ledger::from_response(resp));
                info!(trades = ledger.trades.len(), "Ledger refreshed");
                *self.cached.write().await = Some(ledger.clone());
                LedgerState::Fresh(ledger)
            }
            Err(e) => {
                let error = format!("{e:#}");
                match self.cached.read().await.clone() {
                    Some(ledger) => {
                        warn!(error = %error, "Ledger refresh failed, serving cached snapshot");
                        LedgerState::Stale { ledger, error }
                    }
                    None => {
                        warn!(error = %error, "Ledger refresh failed with no cached data");
                        LedgerState::NoData { error }
                    }
                }
            }
        }
    }

    /// The cached snapshot, without touching the network.
    pub async fn cached(&self) -> Option<Arc<Ledger>> {
        self.cached.read().await.clone()
    }
}
