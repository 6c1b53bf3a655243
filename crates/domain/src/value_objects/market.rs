use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Market data for one symbol at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    /// Base token symbol.
    pub symbol: String,
    /// Last price in quote currency.
    pub price: Decimal,
    /// Trailing 24h volume in quote currency.
    pub volume_24h: Decimal,
    /// 24h price change in percent.
    pub change_24h: Decimal,
    /// None when the source does not rank the token.
    pub market_cap_rank: Option<u32>,
}

/// Symbol-keyed market data. An empty snapshot means "temporarily
/// unavailable", not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// When the source was queried.
    pub fetched_at: DateTime<Utc>,
    /// Ticks keyed by symbol.
    pub ticks: BTreeMap<String, MarketTick>,
}

impl MarketSnapshot {
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            ticks: BTreeMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Utc::now())
    }

    pub fn insert(&mut self, tick: MarketTick) {
        self.ticks.insert(tick.symbol.clone(), tick);
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketTick> {
        self.ticks.get(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketTick> {
        self.ticks.values()
    }
}

impl FromIterator<MarketTick> for MarketSnapshot {
    fn from_iter<I: IntoIterator<Item = MarketTick>>(iter: I) -> Self {
        let mut snapshot = Self::empty();
        for tick in iter {
            snapshot.insert(tick);
        }
        snapshot
    }
}
