//! Concurrent best-effort exit of every live trade.

use crate::error::EngineError;
use crate::ledger::ClosedTrade;
use dex_trader_domain::{CloseReason, Trade, TradeId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Exit status of one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Completed,
    /// Another path was already closing the trade.
    Skipped,
    Failed,
}

/// Result of closing one trade during an exit fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct ExitResult {
    /// Trade the exit was attempted for.
    pub trade_id: TradeId,
    /// Base token symbol of the trade.
    pub symbol: String,
    /// How the attempt ended.
    pub status: ExitStatus,
    /// Realized pnl, set only when the close completed.
    pub pnl: Option<Decimal>,
    /// Failure message, set only when the close failed.
    pub error: Option<String>,
}

/// Aggregate of an exit fan-out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExitSummary {
    /// One entry per close task that ran to completion.
    pub results: Vec<ExitResult>,
}

impl ExitSummary {
    /// Number of results with the given status.
    pub fn count(&self, status: ExitStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.results.iter().filter_map(|r| r.pnl).sum()
    }
}

/// Closes every trade in `trades` concurrently.
///
/// Each close runs in its own task, so a failure or panic in one does not
/// stop the others. The function returns once every task has finished.
pub async fn exit_all<F, Fut>(trades: Vec<Trade>, reason: CloseReason, close: F) -> ExitSummary
where
    F: Fn(Trade) -> Fut,
    Fut: Future<Output = Result<Option<ClosedTrade>, EngineError>> + Send + 'static,
{
    if trades.is_empty() {
        return ExitSummary::default();
    }

    info!(count = trades.len(), reason = %reason, "Closing all trades");

    let mut tasks = JoinSet::new();
    for trade in trades {
        let id = trade.id;
        let symbol = trade.symbol.clone();
        let fut = close(trade);
        tasks.spawn(async move { (id, symbol, fut.await) });
    }

    let mut summary = ExitSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok((trade_id, symbol, Ok(Some(closed)))) => ExitResult {
                trade_id,
                symbol,
                status: ExitStatus::Completed,
                pnl: Some(closed.pnl),
                error: None,
            },
            Ok((trade_id, symbol, Ok(None))) => ExitResult {
                trade_id,
                symbol,
                status: ExitStatus::Skipped,
                pnl: None,
                error: None,
            },
            Ok((trade_id, symbol, Err(e))) => {
                warn!(trade_id = %trade_id, symbol = %symbol, error = %e, "Failed to close trade");
                ExitResult {
                    trade_id,
                    symbol,
                    status: ExitStatus::Failed,
                    pnl: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                error!(error = %e, "Close task aborted");
                continue;
            }
        };
        summary.results.push(result);
    }

    info!(
        total = summary.results.len(),
        completed = summary.count(ExitStatus::Completed),
        failed = summary.count(ExitStatus::Failed),
        realized_pnl = %summary.realized_pnl(),
        reason = %reason,
        "Exit completed"
    );
    summary
}
