//! Collaborator interfaces the engine is wired with.
//!
//! Every adapter is shared across the engine's loops, so implementations must
//! be `Send + Sync` and tolerate concurrent calls.

use crate::error::PortError;
use async_trait::async_trait;
use dex_trader_domain::{
    AlertSeverity, CloseReason, MarketSnapshot, PerformanceSnapshot, SwapRequest, SwapResult,
    Trade, TradeId,
};
use rust_decimal::Decimal;

/// Source of market prices.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Short adapter name used in logs.
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Fetches a snapshot of all tracked symbols.
    ///
    /// An empty snapshot means data is temporarily unavailable.
    async fn snapshot(&self) -> Result<MarketSnapshot, PortError>;

    /// Current price of one symbol in quote currency, if known.
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>, PortError>;

    async fn health_check(&self) -> bool;

    async fn shutdown(&self) {}
}

/// Venue that performs swaps.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Swaps `request.amount` of `from_token` into `to_token`.
    ///
    /// A venue-side refusal is reported as `Ok` with `success = false`;
    /// `Err` is reserved for transport failures.
    async fn swap(&self, request: &SwapRequest) -> Result<SwapResult, PortError>;

    async fn health_check(&self) -> bool;

    async fn shutdown(&self) {}
}

/// Sink for execution, close, performance and alert events.
#[async_trait]
pub trait ReportingPort: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), PortError> {
        Ok(())
    }

    async fn report_execution(&self, trade: &Trade) -> Result<(), PortError>;

    async fn report_close(
        &self,
        trade_id: TradeId,
        pnl: Decimal,
        reason: CloseReason,
    ) -> Result<(), PortError>;

    async fn report_performance(&self, snapshot: &PerformanceSnapshot) -> Result<(), PortError>;

    async fn report_alert(
        &self,
        alert_type: &str,
        message: &str,
        severity: AlertSeverity,
    ) -> Result<(), PortError>;

    async fn health_check(&self) -> bool;

    async fn shutdown(&self) {}
}
