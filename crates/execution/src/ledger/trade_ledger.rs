//! Trade ledger with lazily-reset daily counters.

use crate::clock::Clock;
use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use dex_trader_domain::{CloseReason, Trade, TradeId, TradeStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A trade that has left the ledger, with its realized result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub trade: Trade,
    /// Quote currency received on exit.
    pub proceeds: Decimal,
    /// `proceeds - cost_basis`.
    pub pnl: Decimal,
    pub reason: CloseReason,
    /// Clock time the exit swap filled.
    pub closed_at: DateTime<Utc>,
}

/// Point-in-time copy of the ledger's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerCounters {
    /// Realized pnl for the current UTC date.
    pub daily_pnl: Decimal,
    /// Losing closes since the last winner. Not reset daily.
    pub consecutive_losses: u32,
    /// UTC date the daily counters belong to.
    pub last_reset_date: NaiveDate,
    /// Number of closes on the current UTC date.
    pub daily_trades: usize,
    /// Closes with positive pnl on the current UTC date.
    pub daily_wins: usize,
}

/// Live trades and counters read under one lock.
#[derive(Debug, Clone)]
pub struct LedgerView {
    /// Live trades, including ones being closed.
    pub trades: Vec<Trade>,
    pub counters: LedgerCounters,
}

struct LedgerState {
    trades: HashMap<TradeId, Trade>,
    reserved: HashSet<String>,
    daily_pnl: Decimal,
    consecutive_losses: u32,
    last_reset_date: NaiveDate,
    closed_today: Vec<ClosedTrade>,
}

impl LedgerState {
    fn counters(&self) -> LedgerCounters {
        LedgerCounters {
            daily_pnl: self.daily_pnl,
            consecutive_losses: self.consecutive_losses,
            last_reset_date: self.last_reset_date,
            daily_trades: self.closed_today.len(),
            daily_wins: self
                .closed_today
                .iter()
                .filter(|c| c.pnl > Decimal::ZERO)
                .count(),
        }
    }

    fn sorted_trades(&self) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self.trades.values().cloned().collect();
        trades.sort_by_key(|t| t.opened_at);
        trades
    }

    fn is_exposed(&self, symbol: &str) -> bool {
        self.reserved.contains(symbol) || self.trades.values().any(|t| t.symbol == symbol)
    }

    /// Zeroes the daily counters once per UTC date. Consecutive losses carry
    /// over.
    fn roll_date(&mut self, today: NaiveDate) {
        if today > self.last_reset_date {
            info!(
                previous = %self.last_reset_date,
                today = %today,
                daily_pnl = %self.daily_pnl,
                "Resetting daily counters"
            );
            self.daily_pnl = Decimal::ZERO;
            self.closed_today.clear();
            self.last_reset_date = today;
        }
    }
}

/// Tracks live trades and the counters the risk gate reads.
///
/// All access goes through a single lock, so counter reads and trade
/// mutations are atomic with respect to each other. The lock is never held
/// across a collaborator call.
pub struct TradeLedger {
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
}

impl TradeLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self {
            state: RwLock::new(LedgerState {
                trades: HashMap::new(),
                reserved: HashSet::new(),
                daily_pnl: Decimal::ZERO,
                consecutive_losses: 0,
                last_reset_date: today,
                closed_today: Vec::new(),
            }),
            clock,
        }
    }

    async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, LedgerState> {
        let mut state = self.state.write().await;
        state.roll_date(self.clock.now().date_naive());
        state
    }

    /// Claims a symbol ahead of execution.
    ///
    /// Returns `false` when the symbol already has a live trade or another
    /// pending reservation.
    pub async fn reserve(&self, symbol: &str) -> bool {
        let mut state = self.write().await;
        if state.is_exposed(symbol) {
            return false;
        }
        state.reserved.insert(symbol.to_string());
        debug!(symbol = symbol, "Symbol reserved");
        true
    }

    /// Drops a reservation whose execution did not produce a trade.
    pub async fn release(&self, symbol: &str) {
        if self.write().await.reserved.remove(symbol) {
            debug!(symbol = symbol, "Symbol reservation released");
        }
    }

    /// Inserts a freshly executed trade, consuming any reservation on its
    /// symbol.
    ///
    /// # Errors
    /// Returns [`LedgerError::SymbolExposure`] if the symbol already has a
    /// live trade.
    pub async fn open(&self, trade: Trade) -> Result<(), LedgerError> {
        let mut state = self.write().await;
        if state.trades.values().any(|t| t.symbol == trade.symbol) {
            return Err(LedgerError::SymbolExposure(trade.symbol));
        }
        state.reserved.remove(&trade.symbol);

        info!(
            trade_id = %trade.id,
            symbol = %trade.symbol,
            entry_price = %trade.entry_price,
            amount = %trade.amount,
            "Trade opened"
        );
        state.trades.insert(trade.id, trade);
        Ok(())
    }

    /// Marks an open trade as closing and returns a copy of it.
    ///
    /// Returns `None` if the trade is unknown or already being closed, which
    /// makes concurrent close attempts resolve to a single winner.
    pub async fn begin_close(&self, id: TradeId) -> Option<Trade> {
        let mut state = self.write().await;
        let trade = state.trades.get_mut(&id)?;
        if trade.status != TradeStatus::Open {
            return None;
        }
        trade.status = TradeStatus::Closing;
        Some(trade.clone())
    }

    /// Returns a closing trade to the open state after a failed exit.
    pub async fn abort_close(&self, id: TradeId) {
        let mut state = self.write().await;
        if let Some(trade) = state.trades.get_mut(&id)
            && trade.status == TradeStatus::Closing
        {
            trade.status = TradeStatus::Open;
        }
    }

    /// Removes a trade and books its realized pnl.
    ///
    /// Closing an id that is not in the ledger is a no-op returning `None`.
    pub async fn close(
        &self,
        id: TradeId,
        proceeds: Decimal,
        reason: CloseReason,
    ) -> Option<ClosedTrade> {
        let closed_at = self.clock.now();
        let mut state = self.write().await;
        let mut trade = state.trades.remove(&id)?;

        let pnl = proceeds - trade.cost_basis();
        state.daily_pnl += pnl;
        if pnl < Decimal::ZERO {
            state.consecutive_losses += 1;
        } else {
            state.consecutive_losses = 0;
        }

        trade.status = TradeStatus::Closed;
        let closed = ClosedTrade {
            trade,
            proceeds,
            pnl,
            reason,
            closed_at,
        };
        state.closed_today.push(closed.clone());

        info!(
            trade_id = %id,
            symbol = %closed.trade.symbol,
            pnl = %pnl,
            reason = %reason,
            daily_pnl = %state.daily_pnl,
            consecutive_losses = state.consecutive_losses,
            "Trade closed"
        );
        Some(closed)
    }

    /// All live trades, open or closing, oldest first.
    pub async fn trades(&self) -> Vec<Trade> {
        self.state.read().await.sorted_trades()
    }

    /// Trades eligible for exit evaluation.
    pub async fn open_trades(&self) -> Vec<Trade> {
        let mut trades = self.trades().await;
        trades.retain(Trade::is_open);
        trades
    }

    /// Finds the live trade for a symbol, if any.
    pub async fn find_by_symbol(&self, symbol: &str) -> Option<Trade> {
        self.state
            .read()
            .await
            .trades
            .values()
            .find(|t| t.symbol == symbol)
            .cloned()
    }

    /// Counters after rolling the daily window to today's date.
    pub async fn counters(&self) -> LedgerCounters {
        self.write().await.counters()
    }

    /// Consistent view of live trades and counters for risk validation.
    pub async fn view(&self) -> LedgerView {
        let state = self.write().await;
        LedgerView {
            trades: state.sorted_trades(),
            counters: state.counters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use dex_trader_domain::Side;
    use rust_decimal_macros::dec;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        ))
    }

    fn trade(symbol: &str, entry: Decimal, amount: Decimal, at: DateTime<Utc>) -> Trade {
        Trade {
            id: TradeId::new(),
            symbol: symbol.to_string(),
            side: Side::Buy,
            entry_price: entry,
            amount,
            stop_loss: entry * dec!(0.97),
            take_profit: entry * dec!(1.10),
            opened_at: at,
            execution_ref: "0x01".to_string(),
            status: TradeStatus::Open,
        }
    }

    #[tokio::test]
    async fn test_open_rejects_second_trade_for_symbol() {
        let clock = clock();
        let ledger = TradeLedger::new(clock.clone());

        let first = trade("ETH", dec!(2000), dec!(0.01), clock.now());
        ledger.open(first).await.unwrap();

        let second = trade("ETH", dec!(2010), dec!(0.01), clock.now());
        assert_eq!(
            ledger.open(second).await,
            Err(LedgerError::SymbolExposure("ETH".to_string()))
        );
        assert_eq!(ledger.trades().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reservation_blocks_symbol() {
        let clock = clock();
        let ledger = TradeLedger::new(clock.clone());

        assert!(ledger.reserve("SOL").await);
        assert!(!ledger.reserve("SOL").await);

        ledger.release("SOL").await;
        assert!(ledger.reserve("SOL").await);

        // Opening consumes the reservation; the live trade keeps blocking.
        ledger
            .open(trade("SOL", dec!(150), dec!(1), clock.now()))
            .await
            .unwrap();
        assert!(!ledger.reserve("SOL").await);
    }

    #[tokio::test]
    async fn test_close_books_pnl_and_loss_streak() {
        let clock = clock();
        let ledger = TradeLedger::new(clock.clone());

        let losing = trade("ETH", dec!(100), dec!(1), clock.now());
        let losing_id = losing.id;
        ledger.open(losing).await.unwrap();

        let closed = ledger
            .close(losing_id, dec!(97), CloseReason::StopLoss)
            .await
            .unwrap();
        assert_eq!(closed.pnl, dec!(-3));
        assert_eq!(closed.trade.status, TradeStatus::Closed);

        let counters = ledger.counters().await;
        assert_eq!(counters.daily_pnl, dec!(-3));
        assert_eq!(counters.consecutive_losses, 1);
        assert_eq!(counters.daily_trades, 1);

        let flat = trade("ETH", dec!(100), dec!(1), clock.now());
        let flat_id = flat.id;
        ledger.open(flat).await.unwrap();
        ledger.close(flat_id, dec!(100), CloseReason::TimeLimit).await;

        // A zero-pnl close is not a loss.
        let counters = ledger.counters().await;
        assert_eq!(counters.consecutive_losses, 0);
        assert_eq!(counters.daily_wins, 0);

        let winning = trade("ETH", dec!(100), dec!(1), clock.now());
        let winning_id = winning.id;
        ledger.open(winning).await.unwrap();
        ledger
            .close(winning_id, dec!(110), CloseReason::TakeProfit)
            .await
            .unwrap();

        let counters = ledger.counters().await;
        assert_eq!(counters.daily_pnl, dec!(7));
        assert_eq!(counters.daily_wins, 1);
        assert_eq!(counters.daily_trades, 3);
    }

    #[tokio::test]
    async fn test_close_unknown_id_is_noop() {
        let ledger = TradeLedger::new(clock());
        assert!(
            ledger
                .close(TradeId::new(), dec!(10), CloseReason::Manual)
                .await
                .is_none()
        );
        assert_eq!(ledger.counters().await.daily_trades, 0);
    }

    #[tokio::test]
    async fn test_begin_close_single_winner() {
        let clock = clock();
        let ledger = TradeLedger::new(clock.clone());
        let t = trade("ETH", dec!(100), dec!(1), clock.now());
        let id = t.id;
        ledger.open(t).await.unwrap();

        assert!(ledger.begin_close(id).await.is_some());
        assert!(ledger.begin_close(id).await.is_none());
        assert!(ledger.open_trades().await.is_empty());
        assert_eq!(ledger.trades().await.len(), 1);

        ledger.abort_close(id).await;
        assert_eq!(ledger.open_trades().await.len(), 1);
    }

    #[tokio::test]
    async fn test_daily_reset_once_per_date() {
        let clock = clock();
        let ledger = TradeLedger::new(clock.clone());

        for _ in 0..2 {
            let t = trade("ETH", dec!(100), dec!(1), clock.now());
            let id = t.id;
            ledger.open(t).await.unwrap();
            ledger.close(id, dec!(95), CloseReason::StopLoss).await;
        }
        assert_eq!(ledger.counters().await.daily_pnl, dec!(-10));

        clock.advance(Duration::hours(13));
        let view = ledger.view().await;
        assert_eq!(view.counters.daily_pnl, Decimal::ZERO);
        assert_eq!(view.counters.daily_trades, 0);
        assert_eq!(view.counters.consecutive_losses, 2);
        assert_eq!(view.counters.last_reset_date.to_string(), "2024-05-11");

        let t = trade("ETH", dec!(100), dec!(1), clock.now());
        let id = t.id;
        ledger.open(t).await.unwrap();
        ledger.close(id, dec!(99), CloseReason::StopLoss).await;

        // Same date: no second reset.
        clock.advance(Duration::hours(1));
        assert_eq!(ledger.counters().await.daily_pnl, dec!(-1));
    }
}
