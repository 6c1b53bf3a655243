//! Risk gate: the seven entry checks and position sizing.

use super::{FixedVolatility, VolatilityModel};
use crate::clock::Clock;
use crate::config::{CONFIDENCE_FLOOR, EngineConfig};
use crate::error::RiskError;
use crate::ledger::LedgerCounters;
use chrono::Timelike;
use dex_trader_domain::{RiskCheck, RiskCheckResult, RiskLevel, RiskMetrics, Side, Signal, Trade};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hard cap on a single position as a fraction of available capital.
const MAX_CAPITAL_FRACTION: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10
/// Position size used when sizing fails.
const FALLBACK_CAPITAL_FRACTION: Decimal = Decimal::from_parts(2, 0, 0, false, 2); // 0.02
/// Share of a limit at which a risk factor starts counting.
const RISK_FACTOR_THRESHOLD: Decimal = Decimal::from_parts(7, 0, 0, false, 1); // 0.7
const BUSY_DAY_TRADES: usize = 10;

/// Outcome of validating one signal. Rejection is a normal result, not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDecision {
    /// True when every check passed.
    pub approved: bool,
    /// Proposed position size in quote currency.
    pub position_size: Decimal,
    /// Every rule evaluated, in evaluation order.
    pub checks: Vec<RiskCheckResult>,
}

impl RiskDecision {
    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.check.as_str())
            .collect()
    }
}

/// Stateless validator over the current ledger view.
pub struct RiskGate {
    config: EngineConfig,
    volatility: Box<dyn VolatilityModel>,
    clock: Arc<dyn Clock>,
}

impl RiskGate {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_volatility(config, clock, Box::new(FixedVolatility::default()))
    }

    pub fn with_volatility(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        volatility: Box<dyn VolatilityModel>,
    ) -> Self {
        Self {
            config,
            volatility,
            clock,
        }
    }

    /// Runs every check against `signal`; approves only if all pass.
    ///
    /// `trades` are the live trades (open or closing).
    pub fn validate(
        &self,
        signal: &Signal,
        trades: &[Trade],
        counters: &LedgerCounters,
    ) -> RiskDecision {
        let config = &self.config;
        let position_size = self.calculate_position_size(signal.price, config.capital_usdt);
        let daily_loss = counters.daily_pnl.min(Decimal::ZERO).abs();
        let exposure = trades.iter().filter(|t| t.symbol == signal.symbol).count();
        let hour = self.clock.now().hour();
        let (blackout_start, blackout_end) = config.blackout_hours;
        let min_confidence = config.min_signal_confidence.max(CONFIDENCE_FLOOR);

        let checks = vec![
            RiskCheckResult::new(
                RiskCheck::MaxSimultaneousTrades,
                trades.len() < config.max_simultaneous_trades as usize,
                Decimal::from(trades.len()),
                Decimal::from(config.max_simultaneous_trades),
            ),
            RiskCheckResult::new(
                RiskCheck::DailyLossLimit,
                daily_loss < config.daily_loss_limit(),
                daily_loss,
                config.daily_loss_limit(),
            ),
            RiskCheckResult::new(
                RiskCheck::ConsecutiveLosses,
                counters.consecutive_losses < config.consecutive_loss_limit,
                Decimal::from(counters.consecutive_losses),
                Decimal::from(config.consecutive_loss_limit),
            ),
            RiskCheckResult::new(
                RiskCheck::PositionSizeLimit,
                position_size <= config.max_position_size(),
                position_size,
                config.max_position_size(),
            ),
            RiskCheckResult::new(
                RiskCheck::SymbolExposure,
                exposure == 0,
                Decimal::from(exposure),
                Decimal::ZERO,
            ),
            RiskCheckResult::new(
                RiskCheck::SignalConfidence,
                signal.confidence >= min_confidence,
                signal.confidence,
                min_confidence,
            ),
            RiskCheckResult::new(
                RiskCheck::TimeRestrictions,
                !(blackout_start..blackout_end).contains(&hour),
                Decimal::from(hour),
                Decimal::from(blackout_start),
            ),
        ];

        let approved = checks.iter().all(|c| c.passed);
        debug!(
            symbol = %signal.symbol,
            approved = approved,
            position_size = %position_size,
            "Signal validated"
        );
        RiskDecision {
            approved,
            position_size,
            checks,
        }
    }

    /// Position size in quote currency for a new trade.
    ///
    /// Never fails: any sizing error falls back to 2% of available capital.
    pub fn calculate_position_size(&self, price: Decimal, available_capital: Decimal) -> Decimal {
        match self.try_position_size(price, available_capital) {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, price = %price, "Position sizing failed, using fallback");
                available_capital * FALLBACK_CAPITAL_FRACTION
            }
        }
    }

    fn try_position_size(
        &self,
        price: Decimal,
        available_capital: Decimal,
    ) -> Result<Decimal, RiskError> {
        if price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice(price));
        }
        let adjustment = self.volatility.adjustment(price)?;
        if adjustment <= Decimal::ZERO {
            return Err(RiskError::InvalidAdjustment(adjustment));
        }

        let base = available_capital
            .checked_mul(self.config.max_position_size_percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(RiskError::Overflow)?;
        let adjusted = base.checked_mul(adjustment).ok_or(RiskError::Overflow)?;
        let cap = available_capital
            .checked_mul(MAX_CAPITAL_FRACTION)
            .ok_or(RiskError::Overflow)?;

        Ok(adjusted.min(cap))
    }

    pub fn calculate_stop_loss(&self, entry_price: Decimal, side: Side) -> Decimal {
        let offset = self.config.stop_loss_percent / Decimal::ONE_HUNDRED;
        match side {
            Side::Buy => entry_price * (Decimal::ONE - offset),
            Side::Sell => entry_price * (Decimal::ONE + offset),
        }
    }

    pub fn calculate_take_profit(&self, entry_price: Decimal, side: Side) -> Decimal {
        let offset = self.config.take_profit_percent / Decimal::ONE_HUNDRED;
        match side {
            Side::Buy => entry_price * (Decimal::ONE + offset),
            Side::Sell => entry_price * (Decimal::ONE - offset),
        }
    }

    /// Derives the day's risk metrics from ledger counters.
    pub fn metrics(&self, counters: &LedgerCounters) -> RiskMetrics {
        let limit = self.config.daily_loss_limit();
        let daily_loss = counters.daily_pnl.min(Decimal::ZERO).abs();

        let daily_win_rate = if counters.daily_trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(counters.daily_wins) / Decimal::from(counters.daily_trades)
                * Decimal::ONE_HUNDRED
        };
        let drawdown_percent = if limit > Decimal::ZERO {
            daily_loss / limit * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        RiskMetrics {
            daily_pnl: counters.daily_pnl,
            daily_trades: counters.daily_trades,
            daily_win_rate,
            consecutive_losses: counters.consecutive_losses,
            drawdown_percent,
            risk_level: self.assess_level(counters, daily_loss),
        }
    }

    fn assess_level(&self, counters: &LedgerCounters, daily_loss: Decimal) -> RiskLevel {
        let loss_limit = Decimal::from(self.config.consecutive_loss_limit);
        let factors = [
            Decimal::from(counters.consecutive_losses) >= loss_limit * RISK_FACTOR_THRESHOLD,
            daily_loss >= self.config.daily_loss_limit() * RISK_FACTOR_THRESHOLD,
            counters.daily_trades > BUSY_DAY_TRADES,
        ]
        .iter()
        .filter(|f| **f)
        .count();

        match factors {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    /// True when trading should halt: high risk or a breached limit.
    pub fn should_pause(&self, metrics: &RiskMetrics) -> bool {
        metrics.risk_level == RiskLevel::High
            || metrics.consecutive_losses >= self.config.consecutive_loss_limit
            || metrics.daily_pnl.min(Decimal::ZERO).abs() >= self.config.daily_loss_limit()
    }
}
