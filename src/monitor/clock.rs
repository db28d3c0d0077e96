//! Wall-clock alignment math for the poll loop and candle countdowns.
//!
//! Every delay is derived from an absolute timestamp rather than chained
//! from the previous delay, so the loop never accumulates drift.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

pub const MINUTE_MS: i64 = 60_000;

/// 1970-01-01 was a Thursday; weekly candles close on Monday 00:00 UTC.
const WEEK_OFFSET_MS: i64 = 4 * 24 * 60 * MINUTE_MS;

/// Candle length in minutes for a supported interval label.
pub fn interval_minutes(interval: &str) -> Option<u64> {
    match interval {
        "1min" => Some(1),
        "5min" => Some(5),
        "15min" => Some(15),
        "30min" => Some(30),
        "1h" => Some(60),
        "4h" => Some(240),
        "1day" => Some(1_440),
        "1week" => Some(10_080),
        _ => None,
    }
}

/// Milliseconds from `now_ms` until the next minute boundary plus `buffer_ms`.
///
/// A timestamp exactly on a boundary waits for the following one, so the
/// just-closed candle is never polled twice.
pub fn poll_delay_ms(now_ms: i64, buffer_ms: u64) -> u64 {
    let to_boundary = MINUTE_MS - now_ms.rem_euclid(MINUTE_MS);
    to_boundary as u64 + buffer_ms
}

/// Absolute epoch-ms of the next aligned poll.
pub fn next_poll_at(now_ms: i64, buffer_ms: u64) -> i64 {
    now_ms + poll_delay_ms(now_ms, buffer_ms) as i64
}

/// Time until the current candle of `interval` closes, on UTC boundaries.
pub fn time_to_next_close(interval: &str, now: DateTime<Utc>) -> Option<Duration> {
    let period = interval_minutes(interval)? as i64 * MINUTE_MS;
    let offset = if interval == "1week" { WEEK_OFFSET_MS } else { 0 };
    let elapsed = (now.timestamp_millis() - offset).rem_euclid(period);
    Some(Duration::from_millis((period - elapsed) as u64))
}

/// Source of wall-clock time for the scheduler.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms())
            .single()
            .unwrap_or_default()
    }
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A wall clock pinned to `anchor_ms` at construction and advanced by the
/// tokio timer. Under a paused runtime it moves only when the runtime's
/// time does, which keeps sleeps and readings consistent.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    anchor_ms: i64,
    started: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn new(anchor_ms: i64) -> Self {
        Self {
            anchor_ms,
            started: tokio::time::Instant::now(),
        }
    }

    pub fn at(at: DateTime<Utc>) -> Self {
        Self::new(at.timestamp_millis())
    }
}

impl Clock for AnchoredClock {
    fn now_ms(&self) -> i64 {
        self.anchor_ms + self.started.elapsed().as_millis() as i64
    }
}
