use super::EngineInner;
use crate::emergency::EmergencyStats;
use crate::ledger::ClosedTrade;
use chrono::{DateTime, Utc};
use dex_trader_domain::{
    EngineState, PerformanceSnapshot, RiskMetrics, StrategyPerformance, SwapResult, Trade,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Operator-facing summary of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    /// Shorthand for `state == Running`.
    pub is_running: bool,
    /// Configured trading capital.
    pub capital_usdt: Decimal,
    pub quote_token: String,
    /// Live trades, including ones being closed.
    pub open_trades: usize,
    pub daily_pnl: Decimal,
    pub consecutive_losses: u32,
    pub emergency: EmergencyStats,
    pub risk: RiskMetrics,
    /// Whether the risk gate currently advises halting.
    pub should_pause: bool,
    /// Name of the active strategy.
    pub strategy: String,
    pub strategy_performance: StrategyPerformance,
    /// None when the engine has never run.
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Outcome of [`super::Engine::execute_manual`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ManualTradeResult {
    /// A buy opened a tracked trade.
    Opened { trade: Trade },
    /// A sell closed the tracked trade for the symbol.
    Closed { closed: ClosedTrade },
    /// A sell with no tracked trade was executed as a bare swap.
    Swapped { swap: SwapResult },
}

impl EngineInner {
    fn uptime_secs(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, u64) {
        let started_at = *super::lock(&self.started_at);
        let uptime = started_at
            .filter(|_| self.state().is_active())
            .map(|s| (now - s).num_seconds().max(0) as u64)
            .unwrap_or(0);
        (started_at, uptime)
    }

    pub(super) async fn status(&self) -> EngineStatus {
        let now = self.clock.now();
        let view = self.ledger.view().await;
        let risk = self.risk.metrics(&view.counters);
        let should_pause = self.risk.should_pause(&risk);
        let (strategy, strategy_performance) = {
            let strategy = self.strategy.lock().await;
            (strategy.name().to_string(), strategy.performance())
        };
        let (started_at, uptime_secs) = self.uptime_secs(now);
        let state = self.state();

        EngineStatus {
            state,
            is_running: state == EngineState::Running,
            capital_usdt: self.config.capital_usdt,
            quote_token: self.config.quote_token.clone(),
            open_trades: view.trades.len(),
            daily_pnl: view.counters.daily_pnl,
            consecutive_losses: view.counters.consecutive_losses,
            emergency: self.breaker.stats().await,
            risk,
            should_pause,
            strategy,
            strategy_performance,
            started_at,
            uptime_secs,
        }
    }

    pub(super) async fn performance_snapshot(&self) -> PerformanceSnapshot {
        let now = self.clock.now();
        let view = self.ledger.view().await;
        let open = view.trades.len();
        let capital_utilization =
            Decimal::from(open) / Decimal::from(self.config.max_simultaneous_trades);

        PerformanceSnapshot {
            timestamp: now,
            daily_pnl: view.counters.daily_pnl,
            open_trade_count: open,
            consecutive_losses: view.counters.consecutive_losses,
            capital_utilization,
            uptime_secs: self.uptime_secs(now).1,
        }
    }
}
