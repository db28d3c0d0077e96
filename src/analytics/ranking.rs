//! Per-interval performer tables and interval summary cards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{IntervalSummary, Trade};

/// One asset's closed-trade record within an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRank {
    pub symbol: String,
    pub pnl: f64,
    pub total: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
}

impl AssetRank {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            pnl: 0.0,
            total: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
        }
    }

    fn record(&mut self, pnl: f64) {
        self.pnl += pnl;
        self.total += 1;
        if pnl > 0.0 {
            self.wins += 1;
        } else if pnl < 0.0 {
            self.losses += 1;
        }
    }
}

/// Interval -> assets ranked by pnl descending. `BTreeMap` keeps intervals
/// in ascending lexicographic order.
pub type Rankings = BTreeMap<String, Vec<AssetRank>>;

pub fn rank_performers<'a, I>(trades: I) -> Rankings
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut groups: BTreeMap<String, BTreeMap<String, AssetRank>> = BTreeMap::new();
    for t in trades.into_iter().filter(|t| t.is_closed()) {
        groups
            .entry(t.interval.clone())
            .or_default()
            .entry(t.symbol.clone())
            .or_insert_with(|| AssetRank::new(&t.symbol))
            .record(t.pnl_or_zero());
    }

    groups
        .into_iter()
        .map(|(interval, assets)| {
            let mut ranked: Vec<AssetRank> = assets
                .into_values()
                .map(|mut a| {
                    a.win_rate = if a.total > 0 {
                        a.wins as f64 / a.total as f64 * 100.0
                    } else {
                        0.0
                    };
                    a
                })
                .collect();
            ranked.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
            (interval, ranked)
        })
        .collect()
}

/// Summary cards per interval over closed trades, intervals ascending.
pub fn summarize_intervals<'a, I>(trades: I) -> Vec<IntervalSummary>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut acc: BTreeMap<String, (f64, u64, u64)> = BTreeMap::new();
    for t in trades.into_iter().filter(|t| t.is_closed()) {
        let (pnl, closed, wins) = acc.entry(t.interval.clone()).or_default();
        let p = t.pnl_or_zero();
        *pnl += p;
        *closed += 1;
        if p > 0.0 {
            *wins += 1;
        }
    }

    acc.into_iter()
        .map(|(interval, (pnl, closed, wins))| IntervalSummary {
            interval,
            pnl,
            win_rate: if closed > 0 {
                wins as f64 / closed as f64 * 100.0
            } else {
                0.0
            },
            closed,
        })
        .collect()
}
