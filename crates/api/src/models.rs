use chrono::{DateTime, Utc};
use dex_trader_domain::{EngineState, Side, Trade};
use dex_trader_execution::engine::ManualTradeResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub engine_active: bool,
}

/// Reply to lifecycle commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub status: EngineState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioResponse {
    pub active: bool,
    pub open_trades: usize,
    /// Sum of entry cost across open trades, in quote currency.
    pub total_value: Decimal,
    pub positions: Vec<Trade>,
}

impl PortfolioResponse {
    pub fn new(active: bool, positions: Vec<Trade>) -> Self {
        Self {
            active,
            open_trades: positions.len(),
            total_value: positions.iter().map(Trade::cost_basis).sum(),
            positions,
        }
    }
}

/// Manual trade request.
///
/// `pair` is either a bare symbol (`ETH`) or a pair against the quote token
/// (`ETH/USDT`, `ETH-USDT`); only the base symbol is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub pair: String,
    pub side: String,
    pub amount: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl ExecuteRequest {
    pub fn symbol(&self) -> &str {
        self.pair
            .split(['/', '-'])
            .next()
            .unwrap_or_default()
            .trim()
    }

    pub fn side(&self) -> Result<Side, String> {
        self.side.parse()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub message: String,
    pub result: ManualTradeResult,
}
