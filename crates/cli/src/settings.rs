//! Settings loaded from flags, the environment and `.env`.

use clap::Args;
use dex_trader_execution::config::EngineConfig;
use rust_decimal::Decimal;
use std::time::Duration;

/// Engine and adapter settings. Unset values fall back to
/// [`EngineConfig::default`].
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Trading capital in quote currency
    #[arg(long, env = "CAPITAL_USDT")]
    pub capital_usdt: Option<Decimal>,

    /// Maximum position size, percent of capital
    #[arg(long, env = "MAX_POSITION_SIZE_PERCENT")]
    pub max_position_size_percent: Option<Decimal>,

    /// Stop loss distance, percent
    #[arg(long, env = "STOP_LOSS_PERCENT")]
    pub stop_loss_percent: Option<Decimal>,

    /// Take profit distance, percent
    #[arg(long, env = "TAKE_PROFIT_PERCENT")]
    pub take_profit_percent: Option<Decimal>,

    /// Maximum simultaneous trades
    #[arg(long, env = "MAX_SIMULTANEOUS_TRADES")]
    pub max_simultaneous_trades: Option<u32>,

    /// Daily loss limit, percent of capital
    #[arg(long, env = "MAX_DAILY_LOSS_PERCENT")]
    pub max_daily_loss_percent: Option<Decimal>,

    /// Losing trades in a row before new trades are refused
    #[arg(long, env = "CONSECUTIVE_LOSS_LIMIT")]
    pub consecutive_loss_limit: Option<u32>,

    /// Market analysis period in seconds
    #[arg(long, env = "PRICE_UPDATE_INTERVAL")]
    pub price_update_interval: Option<u64>,

    /// CoinGecko API root
    #[arg(
        long,
        env = "COINGECKO_API_URL",
        default_value = "https://api.coingecko.com/api/v3"
    )]
    pub coingecko_api_url: String,

    /// How long a market snapshot is served from cache, in seconds
    #[arg(long, env = "MARKET_CACHE_TTL_SECS", default_value_t = 60)]
    pub market_cache_ttl_secs: u64,

    /// Tracked `SYMBOL=coingecko-id` pairs, comma separated; the built-in
    /// altcoin list when unset
    #[arg(long, env = "TRACKED_SYMBOLS", value_delimiter = ',', value_parser = parse_symbol_pair)]
    pub tracked_symbols: Vec<(String, String)>,

    /// Lower bound of simulated slippage, in basis points
    #[arg(long, env = "SIM_SLIPPAGE_MIN_BPS", default_value_t = 10)]
    pub sim_slippage_min_bps: u32,

    /// Upper bound of simulated slippage, in basis points
    #[arg(long, env = "SIM_SLIPPAGE_MAX_BPS", default_value_t = 50)]
    pub sim_slippage_max_bps: u32,

    /// Backend to report to; reports go to the log when unset
    #[arg(long, env = "BACKEND_API_URL")]
    pub backend_api_url: Option<String>,

    /// Timeout for every outbound HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(v) = self.capital_usdt {
            config.capital_usdt = v;
        }
        if let Some(v) = self.max_position_size_percent {
            config.max_position_size_percent = v;
        }
        if let Some(v) = self.stop_loss_percent {
            config.stop_loss_percent = v;
        }
        if let Some(v) = self.take_profit_percent {
            config.take_profit_percent = v;
        }
        if let Some(v) = self.max_simultaneous_trades {
            config.max_simultaneous_trades = v;
        }
        if let Some(v) = self.max_daily_loss_percent {
            config.max_daily_loss_percent = v;
        }
        if let Some(v) = self.consecutive_loss_limit {
            config.consecutive_loss_limit = v;
        }
        if let Some(v) = self.price_update_interval {
            config.price_update_interval_secs = v;
        }
        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn market_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.market_cache_ttl_secs)
    }
}

fn parse_symbol_pair(raw: &str) -> Result<(String, String), String> {
    let (symbol, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=id, got '{raw}'"))?;
    let (symbol, id) = (symbol.trim(), id.trim());
    if symbol.is_empty() || id.is_empty() {
        return Err(format!("expected SYMBOL=id, got '{raw}'"));
    }
    Ok((symbol.to_uppercase(), id.to_string()))
}
