//! Momentum breakout strategy.

use super::Strategy;
use crate::config::EngineConfig;
use chrono::{DateTime, Duration, Utc};
use dex_trader_domain::{MarketSnapshot, MarketTick, Side, Signal, StrategyPerformance};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

const STRATEGY_NAME: &str = "momentum";

/// Parameters for [`MomentumStrategy`].
#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Minimum price change over the window, as a fraction.
    pub price_change_threshold: Decimal,
    /// Latest volume must exceed this multiple of the prior mean.
    pub volume_multiplier: Decimal,
    /// Points required before a symbol is analysed.
    pub lookback_period: usize,
    /// Signals scoring below this are dropped before emission.
    pub confidence_threshold: Decimal,
    /// Stop loss distance below entry, in percent.
    pub stop_loss_percent: Decimal,
    /// Take profit distance above entry, in percent.
    pub take_profit_percent: Decimal,
    /// Lifetime of an emitted signal.
    pub signal_ttl: Duration,
    /// A symbol with a signal younger than this is not signalled again.
    pub duplicate_window: Duration,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            price_change_threshold: Decimal::new(2, 2), // 2%
            volume_multiplier: Decimal::new(15, 1),     // 1.5x
            lookback_period: 5,
            confidence_threshold: Decimal::new(7, 1),
            stop_loss_percent: Decimal::new(3, 0),
            take_profit_percent: Decimal::new(10, 0),
            signal_ttl: Duration::minutes(30),
            duplicate_window: Duration::minutes(30),
        }
    }
}

impl MomentumConfig {
    /// Takes confidence and exit levels from the engine settings.
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            confidence_threshold: config.min_signal_confidence,
            stop_loss_percent: config.stop_loss_percent,
            take_profit_percent: config.take_profit_percent,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct SymbolHistory {
    prices: VecDeque<Decimal>,
    volumes: VecDeque<Decimal>,
}

impl SymbolHistory {
    fn push(&mut self, tick: &MarketTick, capacity: usize) {
        self.prices.push_back(tick.price);
        self.volumes.push_back(tick.volume_24h);
        while self.prices.len() > capacity {
            self.prices.pop_front();
        }
        while self.volumes.len() > capacity {
            self.volumes.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.prices.len().min(self.volumes.len())
    }

    /// Fractional change from the oldest to the newest price.
    fn price_change(&self) -> Option<Decimal> {
        let first = *self.prices.front()?;
        let last = *self.prices.back()?;
        (last - first).checked_div(first)
    }

    /// Latest volume divided by the mean of the earlier ones.
    fn volume_ratio(&self) -> Option<Decimal> {
        let n = self.volumes.len();
        if n < 2 {
            return None;
        }
        let latest = *self.volumes.back()?;
        let mean = self.volumes.iter().take(n - 1).sum::<Decimal>() / Decimal::from(n - 1);
        latest.checked_div(mean)
    }

    /// Leading run of consecutive rises, normalised by the window.
    fn trend_strength(&self) -> Decimal {
        if self.prices.len() < 3 {
            return Decimal::ZERO;
        }
        let rises = self
            .prices
            .iter()
            .zip(self.prices.iter().skip(1))
            .take_while(|(prev, next)| next > prev)
            .count();
        Decimal::from(rises) / Decimal::from(self.prices.len() - 1)
    }
}

/// Buys breakouts confirmed by rising volume.
#[derive(Debug)]
pub struct MomentumStrategy {
    config: MomentumConfig,
    history: HashMap<String, SymbolHistory>,
    emitted: HashMap<String, Vec<DateTime<Utc>>>,
    performance: StrategyPerformance,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        info!(
            lookback = config.lookback_period,
            threshold = %config.price_change_threshold,
            "Momentum strategy initialized"
        );
        Self {
            config,
            history: HashMap::new(),
            emitted: HashMap::new(),
            performance: StrategyPerformance::default(),
        }
    }

    /// Drops all price, volume and signal history.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.emitted.clear();
        info!("Momentum strategy history cleared");
    }

    fn is_breakout(&self, history: &SymbolHistory) -> bool {
        if history.len() < self.config.lookback_period {
            return false;
        }
        let price_breakout = history
            .price_change()
            .is_some_and(|c| c > self.config.price_change_threshold);
        let volume_breakout = history
            .volume_ratio()
            .is_some_and(|r| r > self.config.volume_multiplier);
        price_breakout && volume_breakout
    }

    fn confidence(&self, history: &SymbolHistory, tick: &MarketTick) -> Decimal {
        let momentum = match history.price_change() {
            Some(change) if change > Decimal::ZERO => (change / Decimal::new(1, 1)).min(Decimal::ONE),
            _ => Decimal::ZERO,
        };
        let volume = history
            .volume_ratio()
            .map(|r| (r / self.config.volume_multiplier).min(Decimal::ONE))
            .unwrap_or(Decimal::ZERO);
        let trend = history.trend_strength();
        let market = market_score(tick);

        let confidence = momentum * Decimal::new(3, 1)
            + volume * Decimal::new(3, 1)
            + trend * Decimal::new(2, 1)
            + market * Decimal::new(2, 1);
        confidence.min(Decimal::ONE)
    }

    fn build_signal(&self, tick: &MarketTick, confidence: Decimal, now: DateTime<Utc>) -> Signal {
        let sl = self.config.stop_loss_percent / Decimal::ONE_HUNDRED;
        let tp = self.config.take_profit_percent / Decimal::ONE_HUNDRED;
        Signal {
            symbol: tick.symbol.clone(),
            side: Side::Buy,
            price: tick.price,
            confidence,
            stop_loss: tick.price * (Decimal::ONE - sl),
            take_profit: tick.price * (Decimal::ONE + tp),
            generated_at: now,
            expires_at: now + self.config.signal_ttl,
            strategy: STRATEGY_NAME.to_string(),
            reason: "bullish_momentum_breakout".to_string(),
        }
    }

    /// Whether an earlier signal for the same symbol is still inside the
    /// duplicate window. The signal's own emission does not count, so a
    /// signal returned by `analyze` revalidates cleanly.
    fn is_duplicate(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.config.duplicate_window;
        self.emitted.get(&signal.symbol).is_some_and(|times| {
            times
                .iter()
                .any(|t| *t > cutoff && *t < signal.generated_at)
        })
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::new(MomentumConfig::default())
    }
}

/// Scores rank and 24h volatility in `[0.5, 1]`.
fn market_score(tick: &MarketTick) -> Decimal {
    let mut score = Decimal::new(5, 1);
    match tick.market_cap_rank {
        Some(rank) if rank <= 100 => score += Decimal::new(2, 1),
        Some(rank) if rank <= 300 => score += Decimal::new(1, 1),
        _ => {}
    }
    let change = tick.change_24h.abs();
    if change >= Decimal::TWO && change <= Decimal::new(15, 0) {
        score += Decimal::new(1, 1);
    }
    score.min(Decimal::ONE)
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        STRATEGY_NAME
    }

    fn analyze(&mut self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Vec<Signal> {
        let capacity = self.config.lookback_period * 2;
        let mut signals = Vec::new();

        for tick in snapshot.iter() {
            self.history
                .entry(tick.symbol.clone())
                .or_default()
                .push(tick, capacity);

            let Some(history) = self.history.get(&tick.symbol) else {
                continue;
            };
            if !self.is_breakout(history) {
                continue;
            }

            let confidence = self.confidence(history, tick);
            if confidence < self.config.confidence_threshold {
                debug!(symbol = %tick.symbol, confidence = %confidence, "Breakout below threshold");
                continue;
            }

            let signal = self.build_signal(tick, confidence, now);
            if !self.validate_signal(&signal, now) {
                continue;
            }

            info!(
                symbol = %signal.symbol,
                side = %signal.side,
                price = %signal.price,
                confidence = %signal.confidence,
                "Signal generated"
            );
            let cutoff = now - self.config.duplicate_window;
            let times = self.emitted.entry(signal.symbol.clone()).or_default();
            times.retain(|t| *t > cutoff);
            times.push(now);
            signals.push(signal);
        }

        debug!(signals = signals.len(), symbols = snapshot.len(), "Momentum analysis completed");
        signals
    }

    fn validate_signal(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        signal.is_well_formed()
            && signal.confidence >= self.config.confidence_threshold
            && !signal.is_expired(now)
            && !self.is_duplicate(signal, now)
    }

    fn record_outcome(&mut self, pnl: Decimal) {
        self.performance.record(pnl);
        info!(
            strategy = STRATEGY_NAME,
            win_rate = %self.performance.win_rate,
            total_pnl = %self.performance.total_pnl,
            "Strategy performance updated"
        );
    }

    fn performance(&self) -> StrategyPerformance {
        self.performance.clone()
    }
}
