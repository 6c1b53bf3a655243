//! In-memory collaborators for engine tests.

use crate::error::PortError;
use crate::ports::{ExecutionPort, MarketDataPort, ReportingPort};
use crate::strategy::Strategy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dex_trader_domain::{
    AlertSeverity, CloseReason, MarketSnapshot, MarketTick, PerformanceSnapshot, Signal,
    StrategyPerformance, SwapRequest, SwapResult, Trade, TradeId,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct FakeMarketData {
    prices: Mutex<HashMap<String, Decimal>>,
    volumes: Mutex<HashMap<String, Decimal>>,
    healthy: AtomicBool,
    fail_snapshot: AtomicBool,
}

impl FakeMarketData {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prices: Mutex::new(HashMap::new()),
            volumes: Mutex::new(HashMap::new()),
            healthy: AtomicBool::new(true),
            fail_snapshot: AtomicBool::new(false),
        })
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        lock(&self.prices).insert(symbol.to_string(), price);
    }

    /// 24h volume reported in snapshots; 1000 when unset.
    pub fn set_volume(&self, symbol: &str, volume: Decimal) {
        lock(&self.volumes).insert(symbol.to_string(), volume);
    }

    pub fn remove_price(&self, symbol: &str) {
        lock(&self.prices).remove(symbol);
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        lock(&self.prices).get(symbol).copied()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshot.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataPort for FakeMarketData {
    fn name(&self) -> &str {
        "fake-market"
    }

    async fn snapshot(&self) -> Result<MarketSnapshot, PortError> {
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(PortError::Network("connection reset".to_string()));
        }
        let volumes = lock(&self.volumes).clone();
        Ok(lock(&self.prices)
            .iter()
            .map(|(symbol, price)| MarketTick {
                symbol: symbol.clone(),
                price: *price,
                volume_24h: volumes
                    .get(symbol)
                    .copied()
                    .unwrap_or(Decimal::ONE_THOUSAND),
                change_24h: Decimal::ZERO,
                market_cap_rank: Some(50),
            })
            .collect())
    }

    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>, PortError> {
        Ok(self.price(symbol))
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Fills every swap at the fake market price with no slippage.
pub struct FakeExecution {
    market: Arc<FakeMarketData>,
    quote: String,
    healthy: AtomicBool,
    reject: AtomicBool,
    fail_init: AtomicBool,
    buy_delay: Mutex<Option<std::time::Duration>>,
    swaps: AtomicUsize,
}

impl FakeExecution {
    pub fn new(market: Arc<FakeMarketData>) -> Arc<Self> {
        Arc::new(Self {
            market,
            quote: "USDT".to_string(),
            healthy: AtomicBool::new(true),
            reject: AtomicBool::new(false),
            fail_init: AtomicBool::new(false),
            buy_delay: Mutex::new(None),
            swaps: AtomicUsize::new(0),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn reject_swaps(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Holds every buy for `delay` before filling it.
    pub fn delay_buys(&self, delay: std::time::Duration) {
        *lock(&self.buy_delay) = Some(delay);
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionPort for FakeExecution {
    fn name(&self) -> &str {
        "fake-execution"
    }

    async fn initialize(&self) -> Result<(), PortError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("venue offline".to_string()));
        }
        Ok(())
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapResult, PortError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Ok(SwapResult::failed("insufficient liquidity"));
        }

        let buying = request.from_token == self.quote;
        let delay = *lock(&self.buy_delay);
        if buying && let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let symbol = if buying {
            &request.to_token
        } else {
            &request.from_token
        };
        let Some(price) = self.market.price(symbol) else {
            return Ok(SwapResult::failed(format!("no quote for {symbol}")));
        };

        let amount_out = if buying {
            request.amount / price
        } else {
            request.amount * price
        };
        Ok(SwapResult::filled(amount_out, price, "0xfeed".to_string()))
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub executions: Mutex<Vec<Trade>>,
    pub closes: Mutex<Vec<(TradeId, Decimal, CloseReason)>>,
    pub performance: Mutex<Vec<PerformanceSnapshot>>,
    pub alerts: Mutex<Vec<(String, AlertSeverity)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn close_reasons(&self) -> Vec<CloseReason> {
        lock(&self.closes).iter().map(|(_, _, r)| *r).collect()
    }

    pub fn alert_types(&self) -> Vec<String> {
        lock(&self.alerts).iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl ReportingPort for RecordingReporter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn report_execution(&self, trade: &Trade) -> Result<(), PortError> {
        lock(&self.executions).push(trade.clone());
        Ok(())
    }

    async fn report_close(
        &self,
        trade_id: TradeId,
        pnl: Decimal,
        reason: CloseReason,
    ) -> Result<(), PortError> {
        lock(&self.closes).push((trade_id, pnl, reason));
        Ok(())
    }

    async fn report_performance(&self, snapshot: &PerformanceSnapshot) -> Result<(), PortError> {
        lock(&self.performance).push(snapshot.clone());
        Ok(())
    }

    async fn report_alert(
        &self,
        alert_type: &str,
        _message: &str,
        severity: AlertSeverity,
    ) -> Result<(), PortError> {
        lock(&self.alerts).push((alert_type.to_string(), severity));
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Emits pre-loaded batches of signals, one batch per `analyze` call.
#[derive(Default)]
pub struct ScriptedStrategy {
    batches: VecDeque<Vec<Signal>>,
    performance: StrategyPerformance,
}

impl ScriptedStrategy {
    pub fn new(batches: Vec<Vec<Signal>>) -> Self {
        Self {
            batches: batches.into(),
            performance: StrategyPerformance::default(),
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn analyze(&mut self, _snapshot: &MarketSnapshot, _now: DateTime<Utc>) -> Vec<Signal> {
        self.batches.pop_front().unwrap_or_default()
    }

    fn validate_signal(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        signal.is_well_formed() && !signal.is_expired(now)
    }

    fn record_outcome(&mut self, pnl: Decimal) {
        self.performance.record(pnl);
    }

    fn performance(&self) -> StrategyPerformance {
        self.performance.clone()
    }
}
