//! Trade table ordering.
//!
//! Every key maps to a total order: categorical columns go through fixed
//! ordinals, dates through parsed timestamps (placeholder = epoch), numbers
//! through `f64::total_cmp` with a missing value as negative infinity.
//! Ties keep ledger order (`sort_by` is stable).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::types::{BeaconError, Trade};

/// Sortable trade table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Symbol,
    Interval,
    Direction,
    Trend,
    Cycle,
    Fast,
    Forecast,
    Status,
    EntryPrice,
    EntryDate,
    ExitDate,
    ExitPrice,
    Pnl,
}

impl SortKey {
    pub const ALL: &'static [SortKey] = &[
        SortKey::Symbol,
        SortKey::Interval,
        SortKey::Direction,
        SortKey::Trend,
        SortKey::Cycle,
        SortKey::Fast,
        SortKey::Forecast,
        SortKey::Status,
        SortKey::EntryPrice,
        SortKey::EntryDate,
        SortKey::ExitDate,
        SortKey::ExitPrice,
        SortKey::Pnl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Symbol => "symbol",
            SortKey::Interval => "interval",
            SortKey::Direction => "direction",
            SortKey::Trend => "trend",
            SortKey::Cycle => "cycle",
            SortKey::Fast => "fast",
            SortKey::Forecast => "forecast",
            SortKey::Status => "status",
            SortKey::EntryPrice => "entry_price",
            SortKey::EntryDate => "entry_date",
            SortKey::ExitDate => "exit_date",
            SortKey::ExitPrice => "exit_price",
            SortKey::Pnl => "pnl",
        }
    }

    /// Ascending comparison of two trades on this column.
    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        match self {
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            SortKey::Interval => a.interval.cmp(&b.interval),
            SortKey::Direction => a.direction.ordinal().cmp(&b.direction.ordinal()),
            SortKey::Trend => a.trend.ordinal().cmp(&b.trend.ordinal()),
            SortKey::Forecast => a.forecast.ordinal().cmp(&b.forecast.ordinal()),
            SortKey::Status => a.status.ordinal().cmp(&b.status.ordinal()),
            SortKey::EntryDate => a.entry_ts.cmp(&b.entry_ts),
            SortKey::ExitDate => a.exit_ts.cmp(&b.exit_ts),
            SortKey::Cycle => a.cycle.total_cmp(&b.cycle),
            SortKey::Fast => a.fast.total_cmp(&b.fast),
            SortKey::EntryPrice => a.entry_price.total_cmp(&b.entry_price),
            SortKey::ExitPrice => numeric(a.exit_price).total_cmp(&numeric(b.exit_price)),
            SortKey::Pnl => numeric(a.pnl).total_cmp(&numeric(b.pnl)),
        }
    }
}

fn numeric(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NEG_INFINITY)
}

impl FromStr for SortKey {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        SortKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| BeaconError::InvalidFilter(format!("unknown sort key: {s}")))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(BeaconError::InvalidFilter(format!("unknown sort direction: {other}"))),
        }
    }
}

/// The single active `(key, direction)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::EntryDate,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Column-header click: same key toggles direction, a new key starts
    /// descending.
    pub fn request(self, key: SortKey) -> Self {
        if key == self.key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Desc)
        }
    }

    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        let ord = self.key.compare(a, b);
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// Stable in-place sort.
    pub fn sort(&self, trades: &mut [Trade]) {
        trades.sort_by(|a, b| self.compare(a, b));
    }
}
