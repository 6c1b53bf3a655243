use crate::error::RiskError;
use rust_decimal::Decimal;

/// Scales the base position size for a symbol's price behaviour.
pub trait VolatilityModel: Send + Sync {
    /// Multiplier applied to the base position size. Must be positive.
    fn adjustment(&self, price: Decimal) -> Result<Decimal, RiskError>;
}

/// Constant multiplier, `1.0` by default.
#[derive(Debug, Clone, Copy)]
pub struct FixedVolatility(pub Decimal);

impl Default for FixedVolatility {
    fn default() -> Self {
        Self(Decimal::ONE)
    }
}

impl VolatilityModel for FixedVolatility {
    fn adjustment(&self, _price: Decimal) -> Result<Decimal, RiskError> {
        Ok(self.0)
    }
}
