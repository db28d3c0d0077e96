//! Trade filter predicates.
//!
//! A trade passes iff it satisfies every active predicate. Inactive
//! predicates (`None`, empty set, `Alignment::All`) pass everything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::sort::SortConfig;
use crate::types::{BeaconError, Bias, Direction, Trade, TradeStatus, DEFAULT_STRATEGY};

/// Trend / forecast alignment filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Alignment {
    #[default]
    All,
    /// Keep trades whose direction agrees with the classification.
    Follow,
    /// Keep trades whose direction does not agree.
    Counter,
}

impl Alignment {
    fn admits(&self, trade: &Trade, bias: Bias) -> bool {
        match self {
            Alignment::All => true,
            Alignment::Follow => trade.aligned_with(bias),
            Alignment::Counter => !trade.aligned_with(bias),
        }
    }
}

impl FromStr for Alignment {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "ALL" => Ok(Alignment::All),
            "FOLLOW" | "WITH" => Ok(Alignment::Follow),
            "COUNTER" | "AGAINST" => Ok(Alignment::Counter),
            other => Err(BeaconError::InvalidFilter(format!("unknown alignment: {other}"))),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::All => write!(f, "ALL"),
            Alignment::Follow => write!(f, "FOLLOW"),
            Alignment::Counter => write!(f, "COUNTER"),
        }
    }
}

/// The full filter + sort configuration for one view computation.
///
/// A plain value: the caller owns it and hands the engine a reference per
/// recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper-case strategy name, or `None` to disable strategy matching
    /// (backtest results carry no strategy split).
    pub strategy: Option<String>,
    pub interval: Option<String>,
    pub status: Option<TradeStatus>,
    pub direction: Option<Direction>,
    /// Explicit asset selection; takes priority over `search`.
    pub assets: BTreeSet<String>,
    /// Free-text symbol search (case-insensitive substring).
    pub search: String,
    pub trend: Alignment,
    pub forecast: Alignment,
    pub sort: SortConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            strategy: Some(DEFAULT_STRATEGY.to_string()),
            interval: None,
            status: None,
            direction: None,
            assets: BTreeSet::new(),
            search: String::new(),
            trend: Alignment::All,
            forecast: Alignment::All,
            sort: SortConfig::default(),
        }
    }
}

impl FilterConfig {
    /// Config matching a given strategy, everything else open.
    pub fn for_strategy(strategy: &str) -> Self {
        Self {
            strategy: Some(strategy.trim().to_uppercase()),
            ..Self::default()
        }
    }

    pub fn matches_strategy(&self, trade: &Trade) -> bool {
        match &self.strategy {
            Some(s) => trade.strategy.eq_ignore_ascii_case(s),
            None => true,
        }
    }

    fn matches_asset(&self, trade: &Trade) -> bool {
        if !self.assets.is_empty() {
            return self.assets.contains(&trade.symbol);
        }
        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        trade.symbol.to_uppercase().contains(&needle.to_uppercase())
    }

    /// Conjunction of every active predicate.
    pub fn matches(&self, trade: &Trade) -> bool {
        self.matches_strategy(trade)
            && self.interval.as_ref().map_or(true, |i| &trade.interval == i)
            && self.status.map_or(true, |s| trade.status == s)
            && self.direction.map_or(true, |d| trade.direction == d)
            && self.matches_asset(trade)
            && self.trend.admits(trade, trade.trend)
            && self.forecast.admits(trade, trade.forecast)
    }

    /// The subset of `trades` passing every predicate, in ledger order.
    pub fn apply(&self, trades: &[Trade]) -> Vec<Trade> {
        trades.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}
