pub mod market;
pub mod performance;
pub mod risk;
pub mod swap;

pub use market::{MarketSnapshot, MarketTick};
pub use performance::{PerformanceSnapshot, StrategyPerformance};
pub use risk::{RiskCheckResult, RiskMetrics};
pub use swap::{SwapRequest, SwapResult};
