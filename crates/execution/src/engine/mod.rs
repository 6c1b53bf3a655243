//! The trading engine: lifecycle, loops and the operator surface.
//!
//! [`Engine`] owns the [`TradeLedger`] and drives four periodic loops:
//!
//! - analysis: snapshot, strategy, risk gate, execution
//! - monitoring: exit predicates for every open trade
//! - health: collaborator health and risk thresholds, feeding the breaker
//! - reporting: periodic performance snapshots
//!
//! Lifecycle is `Stopped -> Starting -> Running -> Stopping -> Stopped`.

mod builder;
mod pipeline;
mod status;
mod supervision;

pub use builder::EngineBuilder;
pub use status::{EngineStatus, ManualTradeResult};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::emergency::{self, EmergencyController, ExitSummary};
use crate::error::EngineError;
use crate::ledger::TradeLedger;
use crate::ports::{ExecutionPort, MarketDataPort, ReportingPort};
use crate::risk::RiskGate;
use crate::scheduler::Scheduler;
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use dex_trader_domain::{AlertSeverity, CloseReason, EngineState, Side, Trade};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) struct EngineInner {
    config: EngineConfig,
    state: Mutex<EngineState>,
    ledger: TradeLedger,
    risk: RiskGate,
    /// Only the analysis loop calls `analyze`; other paths lock briefly to
    /// record outcomes.
    strategy: tokio::sync::Mutex<Box<dyn Strategy>>,
    market_data: Arc<dyn MarketDataPort>,
    execution: Arc<dyn ExecutionPort>,
    reporting: Arc<dyn ReportingPort>,
    breaker: EmergencyController,
    clock: Arc<dyn Clock>,
    token: Mutex<CancellationToken>,
    scheduler: tokio::sync::Mutex<Option<Scheduler>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl EngineInner {
    fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    fn set_state(&self, to: EngineState) {
        let mut state = lock(&self.state);
        let from = *state;
        if from != to {
            info!(from = %from, to = %to, "Engine state changed");
            *state = to;
        }
    }

    /// Moves `from -> to` atomically, returning the actual state on mismatch.
    fn transition(&self, from: EngineState, to: EngineState) -> Result<(), EngineState> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(*state);
        }
        info!(from = %from, to = %to, "Engine state changed");
        *state = to;
        Ok(())
    }

    fn token(&self) -> CancellationToken {
        lock(&self.token).clone()
    }

    async fn initialize_ports(&self) -> Result<(), EngineError> {
        self.market_data.initialize().await?;
        self.execution.initialize().await?;
        self.reporting.initialize().await?;
        Ok(())
    }

    async fn shutdown_ports(&self) {
        tokio::join!(
            self.market_data.shutdown(),
            self.execution.shutdown(),
            self.reporting.shutdown()
        );
    }

    /// Cancels and joins the running loops, if any.
    async fn shutdown_scheduler(&self) {
        let scheduler = self.scheduler.lock().await.take();
        match scheduler {
            Some(scheduler) => scheduler.shutdown().await,
            None => self.token().cancel(),
        }
    }

    /// Closes every open trade concurrently, best effort.
    async fn close_all(self: &Arc<Self>, reason: CloseReason) -> ExitSummary {
        let trades = self.ledger.open_trades().await;
        let inner = self.clone();
        emergency::exit_all(trades, reason, move |trade| {
            let inner = inner.clone();
            async move { inner.close_trade(trade.id, reason).await }
        })
        .await
    }

    fn spawn_loops(self: &Arc<Self>, scheduler: &mut Scheduler) {
        let inner = self.clone();
        scheduler.spawn("analysis", self.config.price_update_interval(), move || {
            let inner = inner.clone();
            async move { inner.analysis_tick().await }
        });

        let inner = self.clone();
        scheduler.spawn("monitoring", self.config.monitor_interval(), move || {
            let inner = inner.clone();
            async move { inner.monitoring_tick().await }
        });

        let inner = self.clone();
        scheduler.spawn("health", self.config.health_interval(), move || {
            let inner = inner.clone();
            async move { inner.health_tick().await }
        });

        let inner = self.clone();
        scheduler.spawn("reporting", self.config.reporting_interval(), move || {
            let inner = inner.clone();
            async move { inner.reporting_tick().await }
        });
    }
}

/// Handle to the trading engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn state(&self) -> EngineState {
        self.inner.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Starts the four loops.
    ///
    /// # Errors
    /// - [`EngineError::AlreadyActive`] unless the engine is stopped
    /// - [`EngineError::Config`] for invalid settings
    /// - [`EngineError::Startup`] if a collaborator fails to initialize
    pub async fn start(&self) -> Result<(), EngineError> {
        let inner = &self.inner;
        inner
            .transition(EngineState::Stopped, EngineState::Starting)
            .map_err(EngineError::AlreadyActive)?;

        if let Err(e) = inner.config.validate() {
            inner.set_state(EngineState::Stopped);
            return Err(e.into());
        }

        // Loops left behind by an emergency stop.
        inner.shutdown_scheduler().await;

        if let Err(e) = inner.initialize_ports().await {
            error!(error = %e, "Collaborator initialization failed");
            inner.set_state(EngineState::Stopped);
            return Err(EngineError::Startup(e.to_string()));
        }

        inner.breaker.reset();
        let token = CancellationToken::new();
        *lock(&inner.token) = token.clone();

        *lock(&inner.started_at) = Some(inner.clock.now());

        // Held until the loops are registered so an early emergency stop
        // finds and joins them.
        let mut slot = inner.scheduler.lock().await;
        inner.set_state(EngineState::Running);
        let mut scheduler = Scheduler::new(token);
        inner.spawn_loops(&mut scheduler);
        *slot = Some(scheduler);
        drop(slot);

        info!(
            capital = %inner.config.capital_usdt,
            max_trades = inner.config.max_simultaneous_trades,
            market_data = inner.market_data.name(),
            execution = inner.execution.name(),
            reporting = inner.reporting.name(),
            "Trading engine started"
        );
        inner.alert("engine_started", "Trading engine started", AlertSeverity::Info);
        Ok(())
    }

    /// Stops the loops, closes every open trade and releases collaborators.
    ///
    /// Stopping a stopped engine is a no-op. Individual close failures are
    /// logged and do not prevent completion.
    ///
    /// # Errors
    /// Returns [`EngineError::NotRunning`] while the engine is still starting.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let inner = &self.inner;
        match inner.transition(EngineState::Running, EngineState::Stopping) {
            Ok(()) => {}
            Err(EngineState::Stopped) => {
                inner.shutdown_scheduler().await;
                return Ok(());
            }
            Err(EngineState::Stopping) => return Ok(()),
            Err(state) => return Err(EngineError::NotRunning(state)),
        }

        info!("Stopping trading engine");
        inner.shutdown_scheduler().await;

        let summary = inner.close_all(CloseReason::EngineShutdown).await;
        let failed = summary.count(emergency::ExitStatus::Failed);
        if failed > 0 {
            warn!(failed = failed, "Some trades could not be closed on shutdown");
        }

        inner.alert(
            "engine_stopped",
            &format!(
                "Trading engine stopped, {} trades closed",
                summary.count(emergency::ExitStatus::Completed)
            ),
            AlertSeverity::Info,
        );
        inner.shutdown_ports().await;
        inner.set_state(EngineState::Stopped);
        info!("Trading engine stopped");
        Ok(())
    }

    /// Summary of engine state, counters and risk.
    pub async fn status(&self) -> EngineStatus {
        self.inner.status().await
    }

    /// Live trades, oldest first.
    pub async fn portfolio(&self) -> Vec<Trade> {
        self.inner.ledger.trades().await
    }

    /// Operator-triggered trade outside the signal pipeline.
    ///
    /// `Buy` swaps `amount` of quote currency into `symbol` and records a
    /// trade. `Sell` closes the open trade for `symbol` if there is one,
    /// otherwise swaps `amount` of `symbol` back into quote currency.
    ///
    /// # Errors
    /// Returns [`EngineError::NotRunning`] unless the engine is running, plus
    /// any execution or ledger failure.
    pub async fn execute_manual(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        price_hint: Option<Decimal>,
    ) -> Result<ManualTradeResult, EngineError> {
        let state = self.state();
        if state != EngineState::Running {
            return Err(EngineError::NotRunning(state));
        }
        self.inner
            .execute_manual(symbol, side, amount, price_hint)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ConfigError;
    use crate::test_support::{FakeExecution, FakeMarketData, RecordingReporter, ScriptedStrategy};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    pub(crate) struct Harness {
        pub engine: Engine,
        pub market: Arc<FakeMarketData>,
        pub execution: Arc<FakeExecution>,
        pub reporter: Arc<RecordingReporter>,
        pub clock: Arc<ManualClock>,
    }

    pub(crate) fn harness(strategy: impl Strategy + 'static) -> Harness {
        let market = FakeMarketData::new();
        market.set_price("ETH", dec!(2000));
        market.set_price("SOL", dec!(100));
        let execution = FakeExecution::new(market.clone());
        let reporter = RecordingReporter::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        ));

        let config = EngineConfig {
            capital_usdt: dec!(1000),
            ..Default::default()
        };
        let engine = Engine::builder(config)
            .market_data(market.clone())
            .execution(execution.clone())
            .reporting(reporter.clone())
            .strategy(Box::new(strategy))
            .clock(clock.clone())
            .build()
            .unwrap();

        Harness {
            engine,
            market,
            execution,
            reporter,
            clock,
        }
    }

    async fn wait_for_state(engine: &Engine, state: EngineState) {
        tokio::time::timeout(std::time::Duration::from_secs(120), async {
            while engine.state() != state {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_build_requires_adapters() {
        let result = Engine::builder(EngineConfig::default()).build();
        assert!(matches!(result, Err(ConfigError::MissingAdapter(_))));

        let bad = EngineConfig {
            capital_usdt: Decimal::ZERO,
            ..Default::default()
        };
        let market = FakeMarketData::new();
        let result = Engine::builder(bad)
            .market_data(market.clone())
            .execution(FakeExecution::new(market))
            .reporting(RecordingReporter::new())
            .build();
        assert!(matches!(result, Err(ConfigError::NonPositiveCapital(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_rejected() {
        let h = harness(ScriptedStrategy::default());

        h.engine.start().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Running);
        assert!(matches!(
            h.engine.start().await,
            Err(EngineError::AlreadyActive(EngineState::Running))
        ));

        h.engine.stop().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        h.engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_failure_restores_stopped() {
        let h = harness(ScriptedStrategy::default());
        h.execution.fail_initialize(true);

        assert!(matches!(
            h.engine.start().await,
            Err(EngineError::Startup(_))
        ));
        assert_eq!(h.engine.state(), EngineState::Stopped);

        h.execution.fail_initialize(false);
        h.engine.start().await.unwrap();
        h.engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_trade_requires_running() {
        let h = harness(ScriptedStrategy::default());
        let result = h
            .engine
            .execute_manual("ETH", Side::Buy, dec!(50), None)
            .await;
        assert!(matches!(
            result,
            Err(EngineError::NotRunning(EngineState::Stopped))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_trades_with_engine_shutdown() {
        let h = harness(ScriptedStrategy::default());
        h.engine.start().await.unwrap();

        h.engine
            .execute_manual("ETH", Side::Buy, dec!(50), None)
            .await
            .unwrap();
        h.engine
            .execute_manual("SOL", Side::Buy, dec!(50), None)
            .await
            .unwrap();
        assert_eq!(h.engine.portfolio().await.len(), 2);

        h.engine.stop().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert!(h.engine.portfolio().await.is_empty());

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let reasons = h.reporter.close_reasons();
        assert_eq!(reasons.len(), 2);
        assert!(reasons.iter().all(|r| *r == CloseReason::EngineShutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_buy_in_flight_during_stop_is_closed() {
        let h = harness(ScriptedStrategy::default());
        h.engine.start().await.unwrap();
        h.execution.delay_buys(std::time::Duration::from_secs(5));

        let engine = h.engine.clone();
        let buy = tokio::spawn(async move {
            engine
                .execute_manual("ETH", Side::Buy, dec!(50), None)
                .await
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        h.engine.stop().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);

        let result = buy.await.unwrap();
        assert!(matches!(result, Err(EngineError::NotRunning(_))));
        assert!(h.engine.portfolio().await.is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(h.reporter.close_reasons(), vec![CloseReason::EngineShutdown]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_completes_when_closes_fail() {
        let h = harness(ScriptedStrategy::default());
        h.engine.start().await.unwrap();
        h.engine
            .execute_manual("ETH", Side::Buy, dec!(50), None)
            .await
            .unwrap();

        h.execution.reject_swaps(true);
        h.engine.stop().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        // The failed close leaves the trade in the ledger.
        assert_eq!(h.engine.portfolio().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_execution_triggers_emergency_stop() {
        let h = harness(ScriptedStrategy::default());
        h.engine.start().await.unwrap();

        h.engine
            .execute_manual("ETH", Side::Buy, dec!(50), None)
            .await
            .unwrap();
        h.engine
            .execute_manual("SOL", Side::Buy, dec!(50), None)
            .await
            .unwrap();

        h.execution.set_healthy(false);
        wait_for_state(&h.engine, EngineState::Stopped).await;

        assert!(h.engine.portfolio().await.is_empty());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let reasons = h.reporter.close_reasons();
        assert_eq!(reasons.len(), 2);
        assert!(reasons.iter().all(|r| *r == CloseReason::EmergencyStop));
        assert!(h.reporter.alert_types().contains(&"emergency_stop".to_string()));

        let status = h.engine.status().await;
        assert!(status.emergency.latched);
        assert_eq!(status.emergency.trip_count, 1);

        // No auto-resume: the engine stays stopped until started again.
        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        assert_eq!(h.engine.state(), EngineState::Stopped);

        h.execution.set_healthy(true);
        h.engine.start().await.unwrap();
        assert!(!h.engine.status().await.emergency.latched);
        h.engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_limit_close_via_monitoring_loop() {
        let h = harness(ScriptedStrategy::default());
        h.engine.start().await.unwrap();
        h.engine
            .execute_manual("ETH", Side::Buy, dec!(50), None)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(4) + Duration::minutes(1));
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        assert!(h.engine.portfolio().await.is_empty());
        assert_eq!(h.reporter.close_reasons(), vec![CloseReason::TimeLimit]);
        h.engine.stop().await.unwrap();
    }
}
