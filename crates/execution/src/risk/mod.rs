//! Signal validation, position sizing and risk metrics.

mod gate;
mod volatility;

pub use gate::*;
pub use volatility::*;
