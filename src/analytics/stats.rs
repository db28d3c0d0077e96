//! Summary statistics over a filtered trade set.

use serde::{Deserialize, Serialize};

use crate::types::Trade;

/// Headline numbers for the stat cards.
///
/// `total_trades` counts closed trades only; open trades are reported
/// separately. A closed trade with zero PnL is neither a win nor a loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_pnl: f64,
    /// Percentage of closed trades that won (0 when none closed).
    pub win_rate: f64,
    pub total_trades: u64,
    pub open_trades: u64,
    pub win_count: u64,
    pub loss_count: u64,
    pub avg_win: f64,
    /// Mean absolute loss (positive number).
    pub avg_loss: f64,
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut total_pnl = 0.0;
        let mut closed = 0u64;
        let mut open = 0u64;
        let mut wins = 0u64;
        let mut losses = 0u64;
        let mut sum_wins = 0.0;
        let mut sum_losses = 0.0;

        for t in trades {
            if t.is_open() {
                open += 1;
                continue;
            }
            closed += 1;
            let pnl = t.pnl_or_zero();
            total_pnl += pnl;
            if pnl > 0.0 {
                wins += 1;
                sum_wins += pnl;
            } else if pnl < 0.0 {
                losses += 1;
                sum_losses += pnl.abs();
            }
        }

        Self {
            total_pnl,
            win_rate: if closed > 0 {
                wins as f64 / closed as f64 * 100.0
            } else {
                0.0
            },
            total_trades: closed,
            open_trades: open,
            win_count: wins,
            loss_count: losses,
            avg_win: if wins > 0 { sum_wins / wins as f64 } else { 0.0 },
            avg_loss: if losses > 0 {
                sum_losses / losses as f64
            } else {
                0.0
            },
        }
    }
}
