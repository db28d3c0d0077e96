//! Shared types for BEACON.
//!
//! These types form the data model used across all modules: the scan
//! results the monitor consumes, the normalized trade ledger the analytics
//! engine consumes, and the domain error enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Signal direction reported by the remote scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SHORT", alias = "SELL")]
    Short,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Short => write!(f, "SHORT"),
        }
    }
}

/// One row of a remote scan. Produced fresh every poll and owned by the
/// cycle that fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub price: f64,
    /// Completed candles since the signal first appeared. 0 = just triggered,
    /// negative = no signal on record.
    #[serde(default, alias = "barsAgo")]
    pub bars_ago: i32,
}

impl ScanResult {
    /// A signal that triggered on the latest completed candle.
    pub fn is_fresh(&self) -> bool {
        self.signal.is_some() && self.bars_ago == 0
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signal {
            Some(sig) => write!(
                f,
                "{sig} {} @ {:.4} ({} bars ago)",
                self.symbol, self.price, self.bars_ago
            ),
            None => write!(f, "{} @ {:.4} (no signal)", self.symbol, self.price),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade enums
// ---------------------------------------------------------------------------

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Sort ordinal: LONG above SHORT.
    pub fn ordinal(&self) -> u8 {
        match self {
            Direction::Long => 2,
            Direction::Short => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            other => Err(BeaconError::InvalidFilter(format!("unknown direction: {other}"))),
        }
    }
}

/// Trade lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    /// Sort ordinal: OPEN above CLOSED.
    pub fn ordinal(&self) -> u8 {
        match self {
            TradeStatus::Open => 2,
            TradeStatus::Closed => 1,
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "OPEN"),
            TradeStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl FromStr for TradeStatus {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            other => Err(BeaconError::InvalidFilter(format!("unknown status: {other}"))),
        }
    }
}

/// Server-computed trend / forecast classification snapshotted at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bias {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "FLAT")]
    Flat,
    #[serde(rename = "-")]
    Unknown,
}

impl Bias {
    /// Sort ordinal: UP 3, FLAT 2, DOWN 1, `-` 0.
    pub fn ordinal(&self) -> u8 {
        match self {
            Bias::Up => 3,
            Bias::Flat => 2,
            Bias::Down => 1,
            Bias::Unknown => 0,
        }
    }

    /// Lenient parse used at ledger ingestion: anything unrecognised is `-`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "UP" => Bias::Up,
            "DOWN" => Bias::Down,
            "FLAT" => Bias::Flat,
            _ => Bias::Unknown,
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Up => write!(f, "UP"),
            Bias::Down => write!(f, "DOWN"),
            Bias::Flat => write!(f, "FLAT"),
            Bias::Unknown => write!(f, "-"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// Strategy assumed for ledger rows that carry none.
pub const DEFAULT_STRATEGY: &str = "BASIC";

/// Placeholder for a missing date.
pub const DATE_PLACEHOLDER: &str = "-";

/// A normalized ledger trade.
///
/// Built by `ledger::normalize`; every optional wire field has already been
/// defaulted, so analytics code never special-cases missing data.
/// Invariant: `Closed` ⇒ `pnl.is_some()`; `Open` ⇒ `pnl`, `exit_price`
/// are `None` and `exit_date` is the placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub interval: String,
    pub direction: Direction,
    pub status: TradeStatus,
    /// Upper-cased strategy name.
    pub strategy: String,
    pub entry_price: f64,
    pub entry_date: String,
    /// Parsed entry timestamp in epoch-ms (0 when unparsable).
    pub entry_ts: i64,
    pub exit_price: Option<f64>,
    pub exit_date: String,
    /// Parsed exit timestamp in epoch-ms (0 when unparsable or open).
    pub exit_ts: i64,
    pub pnl: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub trend: Bias,
    pub cycle: f64,
    pub fast: f64,
    pub forecast: Bias,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Realised PnL, 0 for open trades.
    pub fn pnl_or_zero(&self) -> f64 {
        self.pnl.unwrap_or(0.0)
    }

    /// Whether the trade direction agrees with the given classification:
    /// LONG with UP, or SHORT with DOWN.
    pub fn aligned_with(&self, bias: Bias) -> bool {
        matches!(
            (self.direction, bias),
            (Direction::Long, Bias::Up) | (Direction::Short, Bias::Down)
        )
    }

    /// Helper to build a test trade. `pnl = Some(_)` makes it CLOSED.
    #[cfg(test)]
    pub fn sample(symbol: &str, interval: &str, direction: Direction, pnl: Option<f64>) -> Self {
        let closed = pnl.is_some();
        Trade {
            id: 1,
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            direction,
            status: if closed { TradeStatus::Closed } else { TradeStatus::Open },
            strategy: DEFAULT_STRATEGY.to_string(),
            entry_price: 100.0,
            entry_date: "2026-01-01 00:00:00".to_string(),
            entry_ts: 1_767_225_600_000,
            exit_price: if closed { Some(101.0) } else { None },
            exit_date: if closed {
                "2026-01-01 04:00:00".to_string()
            } else {
                DATE_PLACEHOLDER.to_string()
            },
            exit_ts: if closed { 1_767_240_000_000 } else { 0 },
            pnl,
            pnl_pct: pnl.map(|p| p / 10.0),
            trend: Bias::Unknown,
            cycle: 50.0,
            fast: 50.0,
            forecast: Bias::Unknown,
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} [{}] entry={:.2} pnl={}",
            self.id,
            self.symbol,
            self.interval,
            self.direction,
            self.status,
            self.entry_price,
            self.pnl.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into()),
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger summaries
// ---------------------------------------------------------------------------

/// Aggregate performance of one interval: the "interval card".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSummary {
    pub interval: String,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub closed: u64,
}

/// Server-side headline numbers shipped with the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub total_trades: u64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for BEACON.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error("API error ({endpoint}): {message}")]
    Api { endpoint: String, message: String },

    #[error("Session expired or token invalid")]
    Unauthorized,

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Unsupported interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Select at least one asset")]
    EmptyAssetSelection,

    #[error("No data available: {0}")]
    NoData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
