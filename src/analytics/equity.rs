//! Equity curve: running capital after each closed trade.

use serde::{Deserialize, Serialize};

use crate::types::Trade;

/// Label of the synthetic first point.
pub const START_LABEL: &str = "Start";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Entry date of the trade, or `Start` for the opening point.
    pub label: String,
    pub value: f64,
    pub trade_id: Option<u64>,
}

/// A curve needs the start point plus at least one trade to be drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum EquityCurve {
    Ready(Vec<EquityPoint>),
    InsufficientData,
}

impl EquityCurve {
    /// Build from any trade set; open trades are ignored and closed ones
    /// are replayed in ascending entry order (stable for equal dates).
    pub fn build(trades: &[Trade], starting_capital: f64) -> Self {
        let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        closed.sort_by_key(|t| t.entry_ts);

        let mut points = Vec::with_capacity(closed.len() + 1);
        points.push(EquityPoint {
            label: START_LABEL.to_string(),
            value: starting_capital,
            trade_id: None,
        });

        let mut equity = starting_capital;
        for t in closed {
            equity += t.pnl_or_zero();
            points.push(EquityPoint {
                label: t.entry_date.clone(),
                value: equity,
                trade_id: Some(t.id),
            });
        }

        if points.len() < 2 {
            EquityCurve::InsufficientData
        } else {
            EquityCurve::Ready(points)
        }
    }

    pub fn points(&self) -> &[EquityPoint] {
        match self {
            EquityCurve::Ready(p) => p,
            EquityCurve::InsufficientData => &[],
        }
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points().last().map(|p| p.value)
    }
}
