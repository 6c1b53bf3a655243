//! CoinGecko market data adapter.
//!
//! Snapshots come from `/coins/markets` and single prices from
//! `/simple/price`. The public API is rate limited, so snapshots are cached
//! and a rate-limited or failed refresh falls back to the last snapshot.

use crate::http;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dex_trader_domain::{MarketSnapshot, MarketTick};
use dex_trader_execution::error::PortError;
use dex_trader_execution::ports::MarketDataPort;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Free-tier friendly refresh period.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Tracked altcoins as `(symbol, coingecko id)`.
pub const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("ADA", "cardano"),
    ("SOL", "solana"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("AVAX", "avalanche-2"),
    ("MATIC", "polygon"),
    ("UNI", "uniswap"),
    ("AAVE", "aave"),
    ("COMP", "compound-governance-token"),
    ("MKR", "maker"),
    ("GRT", "the-graph"),
    ("SNX", "synthetix-network-token"),
    ("YFI", "yearn-finance"),
    ("1INCH", "1inch"),
];

#[derive(Debug, Deserialize)]
struct CoinMarket {
    id: String,
    current_price: Option<Decimal>,
    total_volume: Option<Decimal>,
    price_change_percentage_24h: Option<Decimal>,
    market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Ping {
    gecko_says: Option<String>,
}

struct CachedSnapshot {
    fetched: Instant,
    snapshot: MarketSnapshot,
}

/// Market data adapter backed by the CoinGecko REST API.
pub struct CoinGeckoMarketData {
    client: Client,
    base_url: String,
    cache_ttl: Duration,
    /// Symbol to CoinGecko id.
    ids: HashMap<String, String>,
    /// CoinGecko id to symbol.
    symbols: HashMap<String, String>,
    cache: Mutex<Option<CachedSnapshot>>,
}

impl CoinGeckoMarketData {
    /// Creates an adapter tracking [`DEFAULT_SYMBOLS`].
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut adapter = Self {
            client: http::client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            ids: HashMap::new(),
            symbols: HashMap::new(),
            cache: Mutex::new(None),
        };
        adapter.set_symbols(DEFAULT_SYMBOLS.iter().copied());
        Ok(adapter)
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replaces the tracked `(symbol, id)` pairs.
    #[must_use]
    pub fn with_symbols<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.set_symbols(pairs);
        self
    }

    fn set_symbols<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        self.ids.clear();
        self.symbols.clear();
        for (symbol, id) in pairs {
            let symbol = symbol.to_uppercase();
            self.ids.insert(symbol.clone(), id.to_string());
            self.symbols.insert(id.to_string(), symbol);
        }
    }

    /// CoinGecko id for a symbol, case-insensitive.
    pub fn id_for(&self, symbol: &str) -> Option<&str> {
        self.ids.get(&symbol.to_uppercase()).map(String::as_str)
    }

    fn cached(&self, fresh_only: bool) -> Option<MarketSnapshot> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| !fresh_only || c.fetched.elapsed() < self.cache_ttl)
            .map(|c| c.snapshot.clone())
    }

    fn store(&self, snapshot: &MarketSnapshot) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some(CachedSnapshot {
            fetched: Instant::now(),
            snapshot: snapshot.clone(),
        });
    }

    async fn fetch_markets(&self) -> Result<Option<MarketSnapshot>, PortError> {
        let mut ids: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        ids.sort_unstable();
        let ids = ids.join(",");

        let response = self
            .client
            .get(format!("{}/coins/markets", self.base_url))
            .query(&[("vs_currency", "usd"), ("ids", ids.as_str())])
            .send()
            .await
            .map_err(http::transport_error)?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("CoinGecko rate limit hit");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(http::status_error(response).await);
        }

        let markets: Vec<CoinMarket> = response.json().await.map_err(http::transport_error)?;
        let mut snapshot = MarketSnapshot::new(Utc::now());
        for market in markets {
            let (Some(symbol), Some(price)) = (self.symbols.get(&market.id), market.current_price)
            else {
                continue;
            };
            if price <= Decimal::ZERO {
                continue;
            }
            snapshot.insert(MarketTick {
                symbol: symbol.clone(),
                price,
                volume_24h: market.total_volume.unwrap_or_default(),
                change_24h: market.price_change_percentage_24h.unwrap_or_default(),
                market_cap_rank: market.market_cap_rank,
            });
        }
        Ok(Some(snapshot))
    }

    async fn fetch_price(&self, id: &str) -> Result<Option<Decimal>, PortError> {
        let response = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[("ids", id), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Err(http::status_error(response).await);
        }

        let prices: HashMap<String, HashMap<String, Decimal>> =
            response.json().await.map_err(http::transport_error)?;
        Ok(prices.get(id).and_then(|p| p.get("usd")).copied())
    }
}

#[async_trait]
impl MarketDataPort for CoinGeckoMarketData {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn initialize(&self) -> Result<(), PortError> {
        info!(
            base_url = %self.base_url,
            symbols = self.ids.len(),
            "CoinGecko market data initialized"
        );
        Ok(())
    }

    async fn snapshot(&self) -> Result<MarketSnapshot, PortError> {
        if let Some(snapshot) = self.cached(true) {
            debug!(symbols = snapshot.len(), "Serving cached snapshot");
            return Ok(snapshot);
        }

        match self.fetch_markets().await {
            Ok(Some(snapshot)) => {
                debug!(symbols = snapshot.len(), "Fetched market snapshot");
                self.store(&snapshot);
                Ok(snapshot)
            }
            Ok(None) => Ok(self.cached(false).unwrap_or_else(MarketSnapshot::empty)),
            Err(e) => match self.cached(false) {
                Some(stale) => {
                    warn!(error = %e, "Snapshot refresh failed, serving stale data");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>, PortError> {
        let Some(id) = self.id_for(symbol) else {
            debug!(symbol = symbol, "Symbol not tracked");
            return Ok(None);
        };
        let symbol = symbol.to_uppercase();

        if let Some(tick) = self.cached(true).and_then(|s| s.get(&symbol).cloned()) {
            return Ok(Some(tick.price));
        }

        match self.fetch_price(id).await {
            Ok(price) => Ok(price),
            Err(e) => match self.cached(false).and_then(|s| s.get(&symbol).cloned()) {
                Some(tick) => {
                    warn!(symbol = %symbol, error = %e, "Price fetch failed, using stale price");
                    Ok(Some(tick.price))
                }
                None => Err(e),
            },
        }
    }

    async fn health_check(&self) -> bool {
        let response = match self
            .client
            .get(format!("{}/ping", self.base_url))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "CoinGecko ping failed");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "CoinGecko ping failed");
                return false;
            }
        };
        matches!(response.json::<Ping>().await, Ok(Ping { gecko_says: Some(_) }))
    }
}
