use crate::enums::{CloseReason, Side, TradeStatus};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned to a trade when it is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub Uuid);

impl TradeId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open position held by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique within the engine's lifetime.
    pub id: TradeId,
    /// Base token symbol, for example `ETH`.
    pub symbol: String,
    /// Always `Buy` for positions opened by the engine.
    pub side: Side,
    /// Quote-currency price per unit paid on entry.
    pub entry_price: Decimal,
    /// Units of `symbol` held.
    pub amount: Decimal,
    /// Price at or below which the position is closed.
    pub stop_loss: Decimal,
    /// Price at or above which the position is closed.
    pub take_profit: Decimal,
    /// Clock time the entry swap filled.
    pub opened_at: DateTime<Utc>,
    /// Reference returned by the execution venue (transaction hash or order id).
    pub execution_ref: String,
    /// `Closing` while an exit swap is in flight.
    pub status: TradeStatus,
}

impl Trade {
    /// Quote-currency cost of the position at entry.
    pub fn cost_basis(&self) -> Decimal {
        self.entry_price * self.amount
    }

    /// Time since entry.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.opened_at
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Evaluates the exit predicate for a current price.
    ///
    /// Precedence is stop loss, then take profit, then the age limit. The age
    /// limit only fires once the trade is strictly older than `max_age`.
    pub fn exit_reason(
        &self,
        current_price: Decimal,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Option<CloseReason> {
        if current_price <= self.stop_loss {
            Some(CloseReason::StopLoss)
        } else if current_price >= self.take_profit {
            Some(CloseReason::TakeProfit)
        } else if self.age(now) > max_age {
            Some(CloseReason::TimeLimit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(opened_at: DateTime<Utc>) -> Trade {
        Trade {
            id: TradeId::new(),
            symbol: "ETH".to_string(),
            side: Side::Buy,
            entry_price: dec!(2000),
            amount: dec!(0.5),
            stop_loss: dec!(1940),
            take_profit: dec!(2200),
            opened_at,
            execution_ref: "0xabc".to_string(),
            status: TradeStatus::Open,
        }
    }

    #[test]
    fn test_cost_basis() {
        assert_eq!(trade(Utc::now()).cost_basis(), dec!(1000));
    }

    #[test]
    fn test_exit_precedence() {
        let now = Utc::now();
        let max_age = Duration::hours(4);
        let t = trade(now);

        assert_eq!(t.exit_reason(dec!(1940), now, max_age), Some(CloseReason::StopLoss));
        assert_eq!(t.exit_reason(dec!(2200), now, max_age), Some(CloseReason::TakeProfit));
        assert_eq!(t.exit_reason(dec!(2050), now, max_age), None);
    }

    #[test]
    fn test_contradictory_levels_report_stop_loss() {
        let now = Utc::now();
        let mut t = trade(now - Duration::hours(5));
        t.stop_loss = dec!(2100);
        t.take_profit = dec!(1900);

        // Price is simultaneously below stop loss, above take profit and the
        // trade is past its age limit.
        assert_eq!(
            t.exit_reason(dec!(2000), now, Duration::hours(4)),
            Some(CloseReason::StopLoss)
        );
    }

    #[test]
    fn test_time_limit() {
        let now = Utc::now();
        let max_age = Duration::hours(4);

        let fresh = trade(now - Duration::hours(4));
        assert_eq!(fresh.exit_reason(dec!(2050), now, max_age), None);

        let stale = trade(now - Duration::hours(4) - Duration::minutes(1));
        assert_eq!(
            stale.exit_reason(dec!(2050), now, max_age),
            Some(CloseReason::TimeLimit)
        );
    }
}
