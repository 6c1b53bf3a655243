use crate::enums::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strategy's recommendation to open a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Base token symbol.
    pub symbol: String,
    /// Direction; only `Buy` signals are acted on.
    pub side: Side,
    /// Reference price at generation time.
    pub price: Decimal,
    /// Confidence score in `[0, 1]`.
    pub confidence: Decimal,
    /// Stop loss price proposed for the trade.
    pub stop_loss: Decimal,
    /// Take profit price proposed for the trade.
    pub take_profit: Decimal,
    /// Clock time the strategy emitted the signal.
    pub generated_at: DateTime<Utc>,
    /// After this instant the signal must not be executed.
    pub expires_at: DateTime<Utc>,
    /// Name of the strategy that produced the signal.
    pub strategy: String,
    /// Human-readable explanation, logged and reported.
    pub reason: String,
}

impl Signal {
    /// A signal is malformed when its price is not positive or its
    /// confidence lies outside `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.price > Decimal::ZERO
            && self.confidence >= Decimal::ZERO
            && self.confidence <= Decimal::ONE
    }

    /// True once `now` is past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
