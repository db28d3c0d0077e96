//! Trade ledger ingestion.
//!
//! The remote ledger is loosely typed: most fields may be missing or null,
//! enums arrive as free-form strings and dates in several formats. All of
//! that is normalized here, once, so the analytics engine only ever sees
//! well-formed `Trade` values.

pub mod store;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::types::{
    Bias, Direction, Trade, TradeStatus, DATE_PLACEHOLDER, DEFAULT_STRATEGY,
};

pub use store::{LedgerState, LedgerStore};

// ---------------------------------------------------------------------------
// Wire type
// ---------------------------------------------------------------------------

/// A ledger row exactly as the server sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrade {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_date: Option<String>,
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub pnl_pct: Option<f64>,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub cycle: Option<f64>,
    #[serde(default)]
    pub fast: Option<f64>,
    #[serde(default)]
    pub forecast: Option<String>,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Date formats the server has been seen to emit, tried in order after RFC 3339.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%a, %d %b %Y %H:%M:%S GMT",
];

/// Parse a ledger date into epoch milliseconds (UTC).
///
/// The placeholder `-`, an empty string, or anything unparsable maps to 0
/// so that such rows sort as the epoch.
pub fn parse_timestamp_ms(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() || s == DATE_PLACEHOLDER {
        return 0;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis();
    }
    for fmt in DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return naive.and_utc().timestamp_millis();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc().timestamp_millis();
        }
    }
    debug!(date = s, "Unparsable ledger date, treating as epoch");
    0
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Normalize one wire row. Returns `None` for rows without a usable
/// direction, which cannot be classified or filtered meaningfully.
pub fn normalize(raw: RawTrade) -> Option<Trade> {
    let direction = match raw.direction.as_deref().map(str::parse::<Direction>) {
        Some(Ok(d)) => d,
        _ => {
            warn!(
                id = raw.id,
                symbol = %raw.symbol,
                direction = ?raw.direction,
                "Skipping ledger row with unknown direction"
            );
            return None;
        }
    };

    let exit_date = non_empty(raw.exit_date);
    let status = match raw.status.as_deref().map(str::parse::<TradeStatus>) {
        Some(Ok(s)) => s,
        // No usable status: a row with an outcome is treated as closed.
        _ if raw.pnl.is_some() || exit_date.is_some() => TradeStatus::Closed,
        _ => TradeStatus::Open,
    };

    let strategy = non_empty(raw.strategy)
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| DEFAULT_STRATEGY.to_string());

    let entry_date = non_empty(raw.entry_date).unwrap_or_else(|| DATE_PLACEHOLDER.to_string());
    let entry_ts = parse_timestamp_ms(&entry_date);

    let (exit_price, exit_date, pnl, pnl_pct) = match status {
        TradeStatus::Open => (None, DATE_PLACEHOLDER.to_string(), None, None),
        TradeStatus::Closed => (
            raw.exit_price,
            exit_date.unwrap_or_else(|| DATE_PLACEHOLDER.to_string()),
            Some(raw.pnl.unwrap_or(0.0)),
            raw.pnl_pct,
        ),
    };
    let exit_ts = parse_timestamp_ms(&exit_date);

    Some(Trade {
        id: raw.id,
        symbol: raw.symbol.trim().to_string(),
        interval: raw.interval.trim().to_string(),
        direction,
        status,
        strategy,
        entry_price: raw.entry_price.unwrap_or(0.0),
        entry_date,
        entry_ts,
        exit_price,
        exit_date,
        exit_ts,
        pnl,
        pnl_pct,
        trend: raw.trend.as_deref().map(Bias::parse_lenient).unwrap_or(Bias::Unknown),
        cycle: raw.cycle.unwrap_or(0.0),
        fast: raw.fast.unwrap_or(0.0),
        forecast: raw
            .forecast
            .as_deref()
            .map(Bias::parse_lenient)
            .unwrap_or(Bias::Unknown),
    })
}

/// Normalize a whole ledger, dropping unusable rows.
pub fn normalize_all(raw: Vec<RawTrade>) -> Vec<Trade> {
    let total = raw.len();
    let trades: Vec<Trade> = raw.into_iter().filter_map(normalize).collect();
    if trades.len() < total {
        warn!(
            kept = trades.len(),
            dropped = total - trades.len(),
            "Ledger rows dropped during normalization"
        );
    }
    trades
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
