use async_trait::async_trait;
use dex_trader_domain::{AlertSeverity, CloseReason, PerformanceSnapshot, Trade, TradeId};
use dex_trader_execution::error::PortError;
use dex_trader_execution::ports::ReportingPort;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// Reporter that writes every event to the log. Always healthy.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

#[async_trait]
impl ReportingPort for LogReporter {
    fn name(&self) -> &str {
        "log"
    }

    async fn report_execution(&self, trade: &Trade) -> Result<(), PortError> {
        info!(
            trade_id = %trade.id,
            symbol = %trade.symbol,
            side = %trade.side,
            amount = %trade.amount,
            entry_price = %trade.entry_price,
            stop_loss = %trade.stop_loss,
            take_profit = %trade.take_profit,
            execution_ref = %trade.execution_ref,
            "Trade executed"
        );
        Ok(())
    }

    async fn report_close(
        &self,
        trade_id: TradeId,
        pnl: Decimal,
        reason: CloseReason,
    ) -> Result<(), PortError> {
        info!(trade_id = %trade_id, pnl = %pnl, reason = %reason, "Trade closed");
        Ok(())
    }

    async fn report_performance(&self, snapshot: &PerformanceSnapshot) -> Result<(), PortError> {
        info!(
            daily_pnl = %snapshot.daily_pnl,
            open_trades = snapshot.open_trade_count,
            consecutive_losses = snapshot.consecutive_losses,
            utilization = %snapshot.capital_utilization,
            uptime_secs = snapshot.uptime_secs,
            "Performance"
        );
        Ok(())
    }

    async fn report_alert(
        &self,
        alert_type: &str,
        message: &str,
        severity: AlertSeverity,
    ) -> Result<(), PortError> {
        match severity {
            AlertSeverity::Info => info!(alert = alert_type, "{message}"),
            AlertSeverity::Warning => warn!(alert = alert_type, "{message}"),
            AlertSeverity::Critical => error!(alert = alert_type, "{message}"),
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_accepts() {
        let reporter = LogReporter;
        assert!(reporter.health_check().await);
        assert!(
            reporter
                .report_alert("engine_started", "up", AlertSeverity::Info)
                .await
                .is_ok()
        );
        assert!(
            reporter
                .report_close(TradeId::new(), Decimal::ONE, CloseReason::Manual)
                .await
                .is_ok()
        );
    }
}
