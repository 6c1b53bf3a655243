//! Analysis, execution and position monitoring.

use super::{EngineInner, ManualTradeResult};
use crate::error::{EngineError, LedgerError};
use crate::ledger::ClosedTrade;
use dex_trader_domain::{
    AlertSeverity, CloseReason, Side, Signal, SwapRequest, SwapResult, Trade, TradeId, TradeStatus,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

impl EngineInner {
    /// One pass of the analysis loop.
    pub(super) async fn analysis_tick(&self) -> Result<(), EngineError> {
        let token = self.token();
        if token.is_cancelled() {
            return Ok(());
        }

        let snapshot = self.market_data.snapshot().await?;
        if snapshot.is_empty() {
            debug!("Market snapshot empty, skipping tick");
            return Ok(());
        }
        if token.is_cancelled() {
            return Ok(());
        }

        let now = self.clock.now();
        let signals: Vec<Signal> = {
            let mut strategy = self.strategy.lock().await;
            let candidates = strategy.analyze(&snapshot, now);
            candidates
                .into_iter()
                .filter(|signal| {
                    let valid = strategy.validate_signal(signal, now);
                    if !valid {
                        warn!(symbol = %signal.symbol, "Dropping invalid signal");
                    }
                    valid
                })
                .collect()
        };
        debug!(symbols = snapshot.len(), signals = signals.len(), "Market analyzed");

        for signal in signals {
            if token.is_cancelled() {
                break;
            }

            let view = self.ledger.view().await;
            let decision = self.risk.validate(&signal, &view.trades, &view.counters);
            if !decision.approved {
                info!(
                    symbol = %signal.symbol,
                    confidence = %signal.confidence,
                    failed_checks = ?decision.failed_checks(),
                    "Signal rejected by risk gate"
                );
                continue;
            }

            if let Err(e) = self.execute_signal(&signal, decision.position_size).await {
                warn!(symbol = %signal.symbol, error = %e, "Signal execution failed");
            }
        }

        Ok(())
    }

    /// Executes an approved signal. Returns `None` when the signal is not
    /// actionable.
    async fn execute_signal(
        &self,
        signal: &Signal,
        position_size: Decimal,
    ) -> Result<Option<Trade>, EngineError> {
        if signal.side == Side::Sell {
            // Positions are long-only spot holdings; a sell signal has no
            // position to open.
            info!(symbol = %signal.symbol, "Sell signal ignored by spot pipeline");
            return Ok(None);
        }

        info!(
            symbol = %signal.symbol,
            price = %signal.price,
            confidence = %signal.confidence,
            size = %position_size,
            strategy = %signal.strategy,
            "Executing signal"
        );
        let trade = self
            .open_position(
                &signal.symbol,
                position_size,
                Some((signal.stop_loss, signal.take_profit)),
                signal.price,
            )
            .await?;
        Ok(Some(trade))
    }

    /// Swaps quote currency into `symbol` and records the resulting trade.
    ///
    /// Exit levels default to the configured percentages around the fill
    /// price when `exits` is `None`.
    ///
    /// A fill that lands after the run was cancelled or the breaker tripped
    /// is closed at once, since shutdown may already have swept the ledger.
    async fn open_position(
        &self,
        symbol: &str,
        quote_amount: Decimal,
        exits: Option<(Decimal, Decimal)>,
        price_hint: Decimal,
    ) -> Result<Trade, EngineError> {
        let token = self.token();
        if token.is_cancelled() {
            return Err(EngineError::NotRunning(self.state()));
        }
        if !self.ledger.reserve(symbol).await {
            return Err(LedgerError::SymbolExposure(symbol.to_string()).into());
        }

        let request = SwapRequest {
            from_token: self.config.quote_token.clone(),
            to_token: symbol.to_string(),
            amount: quote_amount,
            slippage_percent: self.config.slippage_percent,
        };
        let result = match self.swap_checked(&request).await {
            Ok(result) => result,
            Err(e) => {
                self.ledger.release(symbol).await;
                self.alert(
                    "execution_failed",
                    &format!("Buy {symbol} failed: {e}"),
                    AlertSeverity::Warning,
                );
                return Err(e);
            }
        };

        let entry_price = if result.execution_price > Decimal::ZERO {
            result.execution_price
        } else {
            price_hint
        };
        let (stop_loss, take_profit) = exits.unwrap_or_else(|| {
            (
                self.risk.calculate_stop_loss(entry_price, Side::Buy),
                self.risk.calculate_take_profit(entry_price, Side::Buy),
            )
        });

        let trade = Trade {
            id: TradeId::new(),
            symbol: symbol.to_string(),
            side: Side::Buy,
            entry_price,
            amount: result.amount_out,
            stop_loss,
            take_profit,
            opened_at: self.clock.now(),
            execution_ref: result.execution_ref.unwrap_or_default(),
            status: TradeStatus::Open,
        };
        if let Err(e) = self.ledger.open(trade.clone()).await {
            self.ledger.release(symbol).await;
            return Err(e.into());
        }

        self.report_execution(&trade);

        if token.is_cancelled() || self.breaker.is_latched() {
            let reason = if self.breaker.is_latched() {
                CloseReason::EmergencyStop
            } else {
                CloseReason::EngineShutdown
            };
            warn!(trade_id = %trade.id, symbol = %symbol, reason = %reason, "Fill arrived after shutdown began, closing");
            if let Err(e) = self.close_trade(trade.id, reason).await {
                error!(trade_id = %trade.id, error = %e, "Late fill could not be closed");
            }
            return Err(EngineError::NotRunning(self.state()));
        }
        Ok(trade)
    }

    /// Swaps and converts a venue refusal into [`EngineError::Execution`].
    async fn swap_checked(&self, request: &SwapRequest) -> Result<SwapResult, EngineError> {
        let result = self.execution.swap(request).await?;
        if !result.success {
            return Err(EngineError::Execution(
                result
                    .error
                    .unwrap_or_else(|| "swap reported failure".to_string()),
            ));
        }
        if result.amount_out <= Decimal::ZERO {
            return Err(EngineError::Execution(format!(
                "swap returned non-positive amount {}",
                result.amount_out
            )));
        }
        Ok(result)
    }

    /// One pass of the monitoring loop.
    pub(super) async fn monitoring_tick(&self) -> Result<(), EngineError> {
        let token = self.token();
        let max_age = self.config.max_trade_age();

        for trade in self.ledger.open_trades().await {
            if token.is_cancelled() {
                break;
            }

            let price = match self.market_data.current_price(&trade.symbol).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    debug!(symbol = %trade.symbol, "No price available, skipping trade");
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %trade.symbol, error = %e, "Price fetch failed, skipping trade");
                    continue;
                }
            };

            let Some(reason) = trade.exit_reason(price, self.clock.now(), max_age) else {
                continue;
            };
            info!(
                trade_id = %trade.id,
                symbol = %trade.symbol,
                price = %price,
                reason = %reason,
                "Exit condition met"
            );
            if let Err(e) = self.close_trade(trade.id, reason).await {
                warn!(trade_id = %trade.id, error = %e, "Close failed, will retry next tick");
            }
        }

        Ok(())
    }

    /// Sells a trade back into quote currency and books the result.
    ///
    /// Returns `Ok(None)` when the trade is absent or already closing. On
    /// failure the trade stays open for a later attempt.
    pub(super) async fn close_trade(
        &self,
        id: TradeId,
        reason: CloseReason,
    ) -> Result<Option<ClosedTrade>, EngineError> {
        let Some(trade) = self.ledger.begin_close(id).await else {
            return Ok(None);
        };

        let request = SwapRequest {
            from_token: trade.symbol.clone(),
            to_token: self.config.quote_token.clone(),
            amount: trade.amount,
            slippage_percent: self.config.slippage_percent,
        };
        let result = match self.swap_checked(&request).await {
            Ok(result) => result,
            Err(e) => {
                self.ledger.abort_close(id).await;
                self.alert(
                    "close_failed",
                    &format!("Close {} ({reason}) failed: {e}", trade.symbol),
                    AlertSeverity::Warning,
                );
                return Err(e);
            }
        };

        let Some(closed) = self.ledger.close(id, result.amount_out, reason).await else {
            return Ok(None);
        };
        self.strategy.lock().await.record_outcome(closed.pnl);
        self.report_close(&closed);
        Ok(Some(closed))
    }

    pub(super) async fn execute_manual(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        price_hint: Option<Decimal>,
    ) -> Result<ManualTradeResult, EngineError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(EngineError::InvalidRequest("symbol is empty".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidRequest(format!(
                "amount must be positive, got {amount}"
            )));
        }
        info!(symbol = %symbol, side = %side, amount = %amount, "Manual trade requested");

        match side {
            Side::Buy => {
                let trade = self
                    .open_position(&symbol, amount, None, price_hint.unwrap_or_default())
                    .await?;
                Ok(ManualTradeResult::Opened { trade })
            }
            Side::Sell => match self.ledger.find_by_symbol(&symbol).await {
                Some(trade) => match self.close_trade(trade.id, CloseReason::Manual).await? {
                    Some(closed) => Ok(ManualTradeResult::Closed { closed }),
                    None => Err(EngineError::InvalidRequest(format!(
                        "trade for {symbol} is already closing"
                    ))),
                },
                None => {
                    let request = SwapRequest {
                        from_token: symbol.clone(),
                        to_token: self.config.quote_token.clone(),
                        amount,
                        slippage_percent: self.config.slippage_percent,
                    };
                    let swap = self.swap_checked(&request).await?;
                    Ok(ManualTradeResult::Swapped { swap })
                }
            },
        }
    }
}
