//! Engine settings and their validation.

use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest minimum signal confidence the engine accepts.
pub const CONFIDENCE_FLOOR: Decimal = Decimal::from_parts(70, 0, 0, false, 2);

/// Configuration for the trading engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trading capital in quote currency.
    pub capital_usdt: Decimal,
    /// Maximum position size as a percentage of capital.
    pub max_position_size_percent: Decimal,
    /// Stop loss distance from entry, in percent.
    pub stop_loss_percent: Decimal,
    /// Take profit distance from entry, in percent.
    pub take_profit_percent: Decimal,
    /// Maximum number of trades open at once.
    pub max_simultaneous_trades: u32,
    /// Maximum realized daily loss as a percentage of capital.
    pub max_daily_loss_percent: Decimal,
    /// Losing closes in a row before new trades are refused.
    pub consecutive_loss_limit: u32,
    /// Period of the market analysis loop in seconds.
    pub price_update_interval_secs: u64,
    /// Minimum confidence a signal needs to pass the risk gate. May be
    /// raised above [`CONFIDENCE_FLOOR`], never lowered below it.
    pub min_signal_confidence: Decimal,
    /// Low-liquidity window as UTC hours `[start, end)`.
    pub blackout_hours: (u32, u32),
    /// Token every position is opened from and closed into.
    pub quote_token: String,
    /// Slippage tolerance passed to the execution venue, in percent.
    pub slippage_percent: Decimal,
    /// Trades older than this are closed with reason `time_limit`.
    pub max_trade_age_secs: u64,
    /// Period of the position monitoring loop in seconds.
    pub monitor_interval_secs: u64,
    /// Period of the health loop in seconds.
    pub health_interval_secs: u64,
    /// Period of the performance reporting loop in seconds.
    pub reporting_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capital_usdt: Decimal::new(100, 0),
            max_position_size_percent: Decimal::new(5, 0),
            stop_loss_percent: Decimal::new(3, 0),
            take_profit_percent: Decimal::new(10, 0),
            max_simultaneous_trades: 3,
            max_daily_loss_percent: Decimal::new(10, 0),
            consecutive_loss_limit: 3,
            price_update_interval_secs: 5,
            min_signal_confidence: CONFIDENCE_FLOOR,
            blackout_hours: (2, 6),
            quote_token: "USDT".to_string(),
            slippage_percent: Decimal::ONE,
            max_trade_age_secs: 4 * 60 * 60,
            monitor_interval_secs: 1,
            health_interval_secs: 30,
            reporting_interval_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Checks every setting, returning the first violation.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hundred = Decimal::ONE_HUNDRED;

        if self.capital_usdt <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveCapital(self.capital_usdt));
        }
        if self.max_position_size_percent <= Decimal::ZERO
            || self.max_position_size_percent > hundred
        {
            return Err(ConfigError::PositionSizeOutOfRange(
                self.max_position_size_percent,
            ));
        }
        if self.stop_loss_percent <= Decimal::ZERO || self.stop_loss_percent > Decimal::new(50, 0)
        {
            return Err(ConfigError::StopLossOutOfRange(self.stop_loss_percent));
        }
        if self.take_profit_percent <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTakeProfit(self.take_profit_percent));
        }
        if self.max_simultaneous_trades == 0 {
            return Err(ConfigError::NoTradesAllowed);
        }
        if self.price_update_interval_secs == 0
            || self.monitor_interval_secs == 0
            || self.health_interval_secs == 0
            || self.reporting_interval_secs == 0
        {
            return Err(ConfigError::ZeroPriceInterval);
        }
        if self.max_daily_loss_percent <= Decimal::ZERO || self.max_daily_loss_percent > hundred {
            return Err(ConfigError::DailyLossOutOfRange(self.max_daily_loss_percent));
        }
        if self.consecutive_loss_limit == 0 {
            return Err(ConfigError::ZeroLossLimit);
        }
        if self.min_signal_confidence < CONFIDENCE_FLOOR || self.min_signal_confidence > Decimal::ONE {
            return Err(ConfigError::ConfidenceOutOfRange(self.min_signal_confidence));
        }
        if self.slippage_percent <= Decimal::ZERO || self.slippage_percent > Decimal::new(50, 0) {
            return Err(ConfigError::SlippageOutOfRange(self.slippage_percent));
        }
        let (start, end) = self.blackout_hours;
        if start > end || end > 24 {
            return Err(ConfigError::InvalidBlackout { start, end });
        }
        if self.quote_token.trim().is_empty() {
            return Err(ConfigError::EmptyQuoteToken);
        }
        Ok(())
    }

    /// Daily loss limit in quote currency.
    pub fn daily_loss_limit(&self) -> Decimal {
        self.capital_usdt * self.max_daily_loss_percent / Decimal::ONE_HUNDRED
    }

    /// Largest position the configured percentage allows, in quote currency.
    pub fn max_position_size(&self) -> Decimal {
        self.capital_usdt * self.max_position_size_percent / Decimal::ONE_HUNDRED
    }

    pub fn price_update_interval(&self) -> Duration {
        Duration::from_secs(self.price_update_interval_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn reporting_interval(&self) -> Duration {
        Duration::from_secs(self.reporting_interval_secs)
    }

    /// Age after which an open trade is closed with `TimeLimit`.
    pub fn max_trade_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.max_trade_age_secs).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_signal_confidence, dec!(0.70));
        assert_eq!(config.max_trade_age(), chrono::Duration::hours(4));
        assert_eq!(config.daily_loss_limit(), dec!(10));
        assert_eq!(config.max_position_size(), dec!(5));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let config = EngineConfig {
            capital_usdt: Decimal::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveCapital(Decimal::ZERO))
        );

        let config = EngineConfig {
            stop_loss_percent: dec!(60),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StopLossOutOfRange(_))
        ));

        let config = EngineConfig {
            max_simultaneous_trades: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoTradesAllowed));

        let config = EngineConfig {
            min_signal_confidence: dec!(0.5),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ConfidenceOutOfRange(dec!(0.5)))
        );

        let config = EngineConfig {
            min_signal_confidence: dec!(0.85),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = EngineConfig {
            blackout_hours: (6, 2),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBlackout { start: 6, end: 2 })
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"capital_usdt": "1000", "max_simultaneous_trades": 5}"#)
                .unwrap();
        assert_eq!(config.capital_usdt, dec!(1000));
        assert_eq!(config.max_simultaneous_trades, 5);
        assert_eq!(config.stop_loss_percent, dec!(3));
    }
}
