//! Health supervision, emergency stop and outbound reporting.

use super::EngineInner;
use crate::emergency::{CollaboratorHealth, ExitStatus, RiskStatus};
use crate::error::EngineError;
use crate::ledger::ClosedTrade;
use dex_trader_domain::{AlertSeverity, CloseReason, EngineState, Trade};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl EngineInner {
    /// One pass of the health loop. Trips the breaker and hands off to a
    /// detached emergency stop when conditions are unsafe.
    pub(super) async fn health_tick(self: &Arc<Self>) -> Result<(), EngineError> {
        if self.breaker.is_latched() || self.token().is_cancelled() {
            return Ok(());
        }

        let (market_data, execution, reporting) = tokio::join!(
            self.market_data.health_check(),
            self.execution.health_check(),
            self.reporting.health_check()
        );
        let health = CollaboratorHealth {
            market_data,
            execution,
            reporting,
        };

        let view = self.ledger.view().await;
        let risk = RiskStatus::assess(
            &self.config,
            view.counters.daily_pnl,
            view.counters.consecutive_losses,
            view.trades.len(),
        );
        debug!(
            market_data = health.market_data,
            execution = health.execution,
            reporting = health.reporting,
            risk_safe = risk.safe(),
            "Health checked"
        );

        if let Some(trigger) = self.breaker.evaluate(&health, &risk) {
            // The stop joins the loops, this one included, so it cannot run
            // inside the tick.
            tokio::spawn(self.clone().emergency_stop(trigger));
        }
        Ok(())
    }

    /// Latches the breaker, stops the loops and closes every live trade.
    ///
    /// The engine stays stopped afterwards; only an explicit `start()`
    /// clears the latch.
    async fn emergency_stop(self: Arc<Self>, reason: String) {
        if !self.breaker.trip(&reason, self.clock.now()).await {
            return;
        }
        if let Err(state) = self.transition(EngineState::Running, EngineState::Stopping) {
            warn!(state = %state, "Emergency stop skipped, engine not running");
            return;
        }

        self.shutdown_scheduler().await;
        let summary = self.close_all(CloseReason::EmergencyStop).await;
        let closed = summary.count(ExitStatus::Completed);
        let failed = summary.count(ExitStatus::Failed);
        if failed > 0 {
            error!(failed = failed, "Emergency exit left trades open");
        }

        self.alert(
            "emergency_stop",
            &format!(
                "Emergency stop: {reason}. {closed} trades closed, {failed} failed, realized pnl {}",
                summary.realized_pnl()
            ),
            AlertSeverity::Critical,
        );
        self.set_state(EngineState::Stopped);
        info!(closed = closed, failed = failed, "Emergency stop complete");
    }

    /// One pass of the reporting loop.
    pub(super) async fn reporting_tick(&self) -> Result<(), EngineError> {
        let snapshot = self.performance_snapshot().await;
        info!(
            daily_pnl = %snapshot.daily_pnl,
            open_trades = snapshot.open_trade_count,
            consecutive_losses = snapshot.consecutive_losses,
            utilization = %snapshot.capital_utilization,
            uptime_secs = snapshot.uptime_secs,
            "Performance snapshot"
        );
        self.reporting.report_performance(&snapshot).await?;
        Ok(())
    }

    /// Sends an alert without waiting for delivery.
    pub(super) fn alert(&self, kind: &str, message: &str, severity: AlertSeverity) {
        let reporting = self.reporting.clone();
        let kind = kind.to_string();
        let message = message.to_string();
        tokio::spawn(async move {
            if let Err(e) = reporting.report_alert(&kind, &message, severity).await {
                warn!(alert = %kind, error = %e, "Alert delivery failed");
            }
        });
    }

    pub(super) fn report_execution(&self, trade: &Trade) {
        let reporting = self.reporting.clone();
        let trade = trade.clone();
        tokio::spawn(async move {
            if let Err(e) = reporting.report_execution(&trade).await {
                warn!(trade_id = %trade.id, error = %e, "Execution report failed");
            }
        });
    }

    pub(super) fn report_close(&self, closed: &ClosedTrade) {
        let reporting = self.reporting.clone();
        let (id, pnl, reason) = (closed.trade.id, closed.pnl, closed.reason);
        tokio::spawn(async move {
            if let Err(e) = reporting.report_close(id, pnl, reason).await {
                warn!(trade_id = %id, error = %e, "Close report failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::harness;
    use super::*;
    use crate::clock::Clock;
    use crate::test_support::ScriptedStrategy;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_healthy_tick_does_not_trip() {
        let h = harness(ScriptedStrategy::default());
        h.engine.inner.health_tick().await.unwrap();
        tokio::task::yield_now().await;
        assert!(!h.engine.inner.breaker.is_latched());
    }

    #[tokio::test]
    async fn test_latched_breaker_skips_checks() {
        let h = harness(ScriptedStrategy::default());
        h.engine
            .inner
            .breaker
            .trip("manual", h.engine.inner.clock.now())
            .await;
        h.market.set_healthy(false);

        h.engine.inner.health_tick().await.unwrap();
        assert_eq!(h.engine.status().await.emergency.trip_count, 1);
    }

    #[tokio::test]
    async fn test_emergency_stop_requires_running_engine() {
        let h = harness(ScriptedStrategy::default());
        h.engine
            .inner
            .clone()
            .emergency_stop("test".to_string())
            .await;

        // Latched, but nothing to stop.
        assert!(h.engine.inner.breaker.is_latched());
        assert_eq!(h.engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_reporting_tick_pushes_snapshot() {
        let h = harness(ScriptedStrategy::default());
        h.engine
            .inner
            .execute_manual("ETH", dex_trader_domain::Side::Buy, dec!(50), None)
            .await
            .unwrap();

        h.engine.inner.reporting_tick().await.unwrap();
        let snapshots = h.reporter.performance.lock().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].open_trade_count, 1);
        // One of three allowed trades.
        assert_eq!(
            snapshots[0].capital_utilization.round_dp(4),
            dec!(0.3333)
        );
    }
}
