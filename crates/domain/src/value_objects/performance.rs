use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only metrics view pushed by the reporting loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Realized pnl for the current UTC date.
    pub daily_pnl: Decimal,
    /// Trades live in the ledger.
    pub open_trade_count: usize,
    /// Losing closes since the last winner.
    pub consecutive_losses: u32,
    /// Open trades as a fraction of the allowed simultaneous trades.
    pub capital_utilization: Decimal,
    /// Seconds since the current run started.
    pub uptime_secs: u64,
}

/// Running outcome statistics for one strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    /// Closed trades attributed to the strategy.
    pub total_signals: u32,
    /// Closed trades with positive pnl.
    pub successful_signals: u32,
    /// Percentage of closed signals with positive pnl.
    pub win_rate: Decimal,
    /// Sum of realized pnl.
    pub total_pnl: Decimal,
    /// `total_pnl / total_signals`, zero before the first close.
    pub avg_pnl_per_trade: Decimal,
}

impl StrategyPerformance {
    pub fn record(&mut self, pnl: Decimal) {
        self.total_signals += 1;
        self.total_pnl += pnl;
        if pnl > Decimal::ZERO {
            self.successful_signals += 1;
        }

        let total = Decimal::from(self.total_signals);
        self.win_rate = Decimal::from(self.successful_signals) / total * Decimal::ONE_HUNDRED;
        self.avg_pnl_per_trade = self.total_pnl / total;
    }
}
