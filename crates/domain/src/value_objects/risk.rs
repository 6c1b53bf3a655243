use crate::enums::{RiskCheck, RiskLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a single risk rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckResult {
    /// Which rule ran.
    pub check: RiskCheck,
    /// Whether the rule allowed the signal.
    pub passed: bool,
    /// Value the rule measured.
    pub observed: Decimal,
    /// Threshold it was compared against.
    pub limit: Decimal,
}

impl RiskCheckResult {
    pub fn new(check: RiskCheck, passed: bool, observed: Decimal, limit: Decimal) -> Self {
        Self {
            check,
            passed,
            observed,
            limit,
        }
    }
}

/// Risk view derived from the ledger counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Realized pnl for the current UTC date.
    pub daily_pnl: Decimal,
    /// Closes on the current UTC date.
    pub daily_trades: usize,
    /// Winning share of today's closes, in `[0, 1]`.
    pub daily_win_rate: Decimal,
    /// Losing closes since the last winner.
    pub consecutive_losses: u32,
    /// Current daily loss as a percentage of the daily loss limit.
    pub drawdown_percent: Decimal,
    /// Low, medium or high by how many risk factors are elevated.
    pub risk_level: RiskLevel,
}
