//! Signal-generating strategies.

mod momentum;

pub use momentum::*;

use chrono::{DateTime, Utc};
use dex_trader_domain::{MarketSnapshot, Signal, StrategyPerformance};
use rust_decimal::Decimal;

/// Converts market snapshots into candidate signals.
///
/// Implementations may keep per-symbol history between calls. The engine
/// only ever calls `analyze` from its analysis loop, one call at a time.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Returns signals ordered by execution priority.
    fn analyze(&mut self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Vec<Signal>;

    /// Whether a signal is still fit for execution at `now`.
    fn validate_signal(&self, signal: &Signal, now: DateTime<Utc>) -> bool;

    /// Feeds back the realized pnl of a closed trade.
    fn record_outcome(&mut self, pnl: Decimal);

    fn performance(&self) -> StrategyPerformance;
}
