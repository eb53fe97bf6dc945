// Performance tracking module
//
// Append-only trade log plus the aggregates derived from it. `summary()` is
// a pure fold over the log, so calling it twice gives the same answer.

use crate::models::{PriceTick, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Annualized return, or the reason there is none
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Annualized {
    Estimate(f64),
    /// Less than one day between first entry and last exit
    InsufficientData,
}

impl fmt::Display for Annualized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annualized::Estimate(pct) => write!(f, "{:+.2}%", pct),
            Annualized::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    // Trade statistics
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64, // percent, 0 with no trades

    // P&L
    pub total_pnl: f64,
    pub total_pnl_pct: f64, // compounded per-trade returns
    pub annualized_return_estimate: Annualized,

    // P&L distribution
    pub avg_win: f64,
    pub avg_loss: f64, // absolute value
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_period_minutes: f64,

    // Baseline
    pub buy_and_hold_pct: Option<f64>,
    pub excess_return_pct: Option<f64>,
}

impl PerformanceSummary {
    fn empty(buy_and_hold_pct: Option<f64>) -> Self {
        Self {
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            total_pnl_pct: 0.0,
            annualized_return_estimate: Annualized::InsufficientData,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            avg_holding_period_minutes: 0.0,
            buy_and_hold_pct,
            excess_return_pct: buy_and_hold_pct.map(|bh| -bh),
        }
    }

    /// Print a human readable report to stdout
    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║               TRADING PERFORMANCE REPORT              ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        println!("📊 P&L SUMMARY");
        println!(
            "  Realized P&L:          ${:.2} ({:+.2}%)",
            self.total_pnl, self.total_pnl_pct
        );
        println!(
            "  Annualized:            {}",
            self.annualized_return_estimate
        );
        match (self.buy_and_hold_pct, self.excess_return_pct) {
            (Some(bh), Some(excess)) => {
                println!("  Buy & Hold:            {:+.2}%", bh);
                println!("  Excess vs Baseline:    {:+.2}%", excess);
            }
            _ => println!("  Buy & Hold:            n/a"),
        }

        println!("\n📈 TRADE STATISTICS");
        println!("  Total Trades:          {}", self.total_trades);
        println!(
            "  Winning Trades:        {} ({:.1}%)",
            self.wins, self.win_rate
        );
        println!("  Losing Trades:         {}", self.losses);

        if self.total_trades > 0 {
            println!("\n💰 WIN/LOSS ANALYSIS");
            println!("  Average Win:           ${:.2}", self.avg_win);
            println!("  Average Loss:          ${:.2}", self.avg_loss);
            println!("  Largest Win:           ${:.2}", self.largest_win);
            println!("  Largest Loss:          ${:.2}", self.largest_loss);
            println!(
                "  Avg Holding Period:    {:.1} minutes",
                self.avg_holding_period_minutes
            );
        }

        println!("\n═════════════════════════════════════════════════════════\n");
    }
}

/// Trade log and baseline prices for one pair
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    trades: Vec<TradeRecord>,
    first_price: Option<PriceTick>,
    last_price: Option<PriceTick>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        tracing::info!(
            "💼 Trade closed: ${:.4} -> ${:.4}, P&L ${:.2} ({:+.2}%), {}",
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.pnl_pct,
            trade.exit_reason
        );
        self.trades.push(trade);
    }

    /// Track the buy-and-hold baseline (first and latest accepted price)
    pub fn observe_price(&mut self, tick: PriceTick) {
        if self.first_price.is_none() {
            self.first_price = Some(tick);
        }
        self.last_price = Some(tick);
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Return of buying at the first observed price and holding until now, in percent
    pub fn buy_and_hold_pct(&self) -> Option<f64> {
        let first = self.first_price?;
        let last = self.last_price?;
        Some((last.price - first.price) / first.price * 100.0)
    }

    pub fn summary(&self) -> PerformanceSummary {
        let buy_and_hold_pct = self.buy_and_hold_pct();
        let total_trades = self.trades.len();

        if total_trades == 0 {
            return PerformanceSummary::empty(buy_and_hold_pct);
        }

        let total_pnl: f64 = self.trades.iter().map(|t| t.pnl).sum();
        let growth: f64 = self
            .trades
            .iter()
            .map(|t| 1.0 + t.pnl_pct / 100.0)
            .product();
        let total_pnl_pct = (growth - 1.0) * 100.0;

        let winning: Vec<&TradeRecord> = self.trades.iter().filter(|t| t.pnl > 0.0).collect();
        let losing: Vec<&TradeRecord> = self.trades.iter().filter(|t| t.pnl <= 0.0).collect();
        let wins = winning.len();
        let losses = losing.len();
        let win_rate = (wins as f64 / total_trades as f64) * 100.0;

        let avg_win = if wins > 0 {
            winning.iter().map(|t| t.pnl).sum::<f64>() / wins as f64
        } else {
            0.0
        };
        let avg_loss = if losses > 0 {
            losing.iter().map(|t| t.pnl.abs()).sum::<f64>() / losses as f64
        } else {
            0.0
        };

        let largest_win = winning.iter().map(|t| t.pnl).fold(0.0, f64::max);
        let largest_loss = losing.iter().map(|t| t.pnl).fold(0.0, f64::min);

        let avg_holding_period_minutes = self
            .trades
            .iter()
            .map(|t| t.holding_period_minutes() as f64)
            .sum::<f64>()
            / total_trades as f64;

        let annualized_return_estimate = annualize(
            total_pnl_pct,
            self.trades.iter().map(|t| t.entry_time).min(),
            self.trades.iter().map(|t| t.exit_time).max(),
        );

        PerformanceSummary {
            total_trades,
            wins,
            losses,
            win_rate,
            total_pnl,
            total_pnl_pct,
            annualized_return_estimate,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_period_minutes,
            buy_and_hold_pct,
            excess_return_pct: buy_and_hold_pct.map(|bh| total_pnl_pct - bh),
        }
    }
}

/// Scale a return to a year: `pct * 365 / elapsed_days`
fn annualize(
    total_pnl_pct: f64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Annualized {
    let (Some(start), Some(end)) = (start, end) else {
        return Annualized::InsufficientData;
    };

    let elapsed_days = (end - start).num_seconds() as f64 / SECONDS_PER_DAY;
    if elapsed_days < 1.0 {
        return Annualized::InsufficientData;
    }

    Annualized::Estimate(total_pnl_pct * 365.0 / elapsed_days)
}
