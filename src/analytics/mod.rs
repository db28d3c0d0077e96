//! Trade analytics engine.
//!
//! Pure derivation from `(ledger, FilterConfig)` to a `DerivedView`. The
//! engine holds no state besides its starting capital, so every call
//! recomputes from scratch and identical inputs yield identical outputs.

pub mod equity;
pub mod filter;
pub mod ranking;
pub mod sort;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::types::{IntervalSummary, Trade};

pub use equity::{EquityCurve, EquityPoint};
pub use filter::{Alignment, FilterConfig};
pub use ranking::{AssetRank, Rankings};
pub use sort::{SortConfig, SortDirection, SortKey};
pub use stats::TradeStats;

pub const DEFAULT_STARTING_CAPITAL: f64 = 10_000.0;

/// Everything the forward-test view renders for one filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedView {
    /// Filtered and sorted trade rows.
    pub filtered_trades: Vec<Trade>,
    pub stats: TradeStats,
    pub equity_curve: EquityCurve,
    /// Performer tables over every closed trade in the ledger.
    pub rankings: Rankings,
    /// Interval cards over the selected strategy's closed trades.
    pub interval_summaries: Vec<IntervalSummary>,
    /// Earliest entry date among the selected strategy's trades.
    pub running_since: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    starting_capital: f64,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CAPITAL)
    }
}

impl AnalyticsEngine {
    pub fn new(starting_capital: f64) -> Self {
        Self { starting_capital }
    }

    pub fn starting_capital(&self) -> f64 {
        self.starting_capital
    }

    pub fn derive(&self, ledger: &[Trade], config: &FilterConfig) -> DerivedView {
        let mut filtered = config.apply(ledger);
        let stats = TradeStats::compute(&filtered);
        let equity_curve = EquityCurve::build(&filtered, self.starting_capital);
        config.sort.sort(&mut filtered);

        let strategy_trades: Vec<&Trade> =
            ledger.iter().filter(|t| config.matches_strategy(t)).collect();

        DerivedView {
            filtered_trades: filtered,
            stats,
            equity_curve,
            rankings: ranking::rank_performers(ledger),
            interval_summaries: ranking::summarize_intervals(strategy_trades.iter().copied()),
            running_since: running_since(&strategy_trades),
        }
    }
}

fn running_since(trades: &[&Trade]) -> Option<String> {
    trades
        .iter()
        .filter(|t| t.entry_ts > 0)
        .min_by_key(|t| t.entry_ts)
        .map(|t| t.entry_date.clone())
}
