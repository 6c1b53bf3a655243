//! Core data model for the DEX trading engine.
//!
//! Everything here is plain data: signals produced by strategies, trades owned
//! by the ledger, market snapshots, swap requests/results and the derived
//! performance and risk views. No I/O and no locking.

pub mod entities;
pub mod enums;
pub mod value_objects;

pub use entities::{Signal, Trade, TradeId};
pub use enums::{AlertSeverity, CloseReason, EngineState, RiskCheck, RiskLevel, Side, TradeStatus};
pub use value_objects::{
    MarketSnapshot, MarketTick, PerformanceSnapshot, RiskCheckResult, RiskMetrics,
    StrategyPerformance, SwapRequest, SwapResult,
};
