//! Simulated swap execution.
//!
//! Fills swaps at the current market price minus a random slippage. No
//! funds move; every fill gets a synthetic `0x` reference.

use async_trait::async_trait;
use chrono::Utc;
use dex_trader_domain::{SwapRequest, SwapResult};
use dex_trader_execution::error::PortError;
use dex_trader_execution::ports::{ExecutionPort, MarketDataPort};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default slippage range in basis points (0.1 % to 0.5 %).
pub const DEFAULT_SLIPPAGE_BPS: (u32, u32) = (10, 50);

/// Swap executor that quotes from a market data source.
pub struct SimulatedSwapExecutor {
    market: Arc<dyn MarketDataPort>,
    quote_token: String,
    slippage_bps: (u32, u32),
}

impl SimulatedSwapExecutor {
    pub fn new(market: Arc<dyn MarketDataPort>, quote_token: impl Into<String>) -> Self {
        Self {
            market,
            quote_token: quote_token.into().to_uppercase(),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }

    /// Overrides the slippage range. `min` above `max` is clamped to `max`.
    #[must_use]
    pub fn with_slippage_bps(mut self, min: u32, max: u32) -> Self {
        self.slippage_bps = (min.min(max), max);
        self
    }

    fn sample_slippage(&self) -> Decimal {
        let (min, max) = self.slippage_bps;
        let bps = rand::rng().random_range(min..=max);
        Decimal::new(i64::from(bps), 4)
    }

    fn execution_ref() -> String {
        let suffix: u64 = rand::rng().random_range(0..10_000_000_000);
        format!("0x{}{suffix:010}", Utc::now().format("%Y%m%d%H%M%S"))
    }
}

#[async_trait]
impl ExecutionPort for SimulatedSwapExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn initialize(&self) -> Result<(), PortError> {
        info!(
            quote_token = %self.quote_token,
            min_bps = self.slippage_bps.0,
            max_bps = self.slippage_bps.1,
            "Simulated swap executor initialized"
        );
        Ok(())
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapResult, PortError> {
        if request.amount <= Decimal::ZERO {
            return Ok(SwapResult::failed("amount must be positive"));
        }

        let from = request.from_token.to_uppercase();
        let to = request.to_token.to_uppercase();
        let buying = from == self.quote_token;
        if !buying && to != self.quote_token {
            return Ok(SwapResult::failed(format!(
                "unsupported pair {from}/{to}, one side must be {}",
                self.quote_token
            )));
        }
        let symbol = if buying { &to } else { &from };

        let price = match self.market.current_price(symbol).await {
            Ok(Some(price)) if price > Decimal::ZERO => price,
            Ok(_) => return Ok(SwapResult::failed(format!("no quote for {symbol}"))),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Quote unavailable");
                return Ok(SwapResult::failed(format!("no quote for {symbol}: {e}")));
            }
        };

        let slippage = self.sample_slippage();
        if slippage * Decimal::ONE_HUNDRED > request.slippage_percent {
            return Ok(SwapResult::failed(format!(
                "slippage {}% exceeds tolerance {}%",
                slippage * Decimal::ONE_HUNDRED,
                request.slippage_percent
            )));
        }

        let kept = Decimal::ONE - slippage;
        let (amount_out, execution_price) = if buying {
            let out = request.amount / price * kept;
            (out, request.amount / out)
        } else {
            (request.amount * price * kept, price * kept)
        };

        let execution_ref = Self::execution_ref();
        debug!(
            from = %from,
            to = %to,
            amount_in = %request.amount,
            amount_out = %amount_out,
            price = %execution_price,
            slippage = %slippage,
            execution_ref = %execution_ref,
            "Simulated swap filled"
        );
        Ok(SwapResult::filled(amount_out, execution_price, execution_ref))
    }

    async fn health_check(&self) -> bool {
        self.market.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_trader_domain::MarketSnapshot;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct StaticPrices(HashMap<String, Decimal>);

    #[async_trait]
    impl MarketDataPort for StaticPrices {
        fn name(&self) -> &str {
            "static"
        }

        async fn snapshot(&self) -> Result<MarketSnapshot, PortError> {
            Ok(MarketSnapshot::empty())
        }

        async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>, PortError> {
            Ok(self.0.get(symbol).copied())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn executor() -> SimulatedSwapExecutor {
        let prices = HashMap::from([("ETH".to_string(), dec!(2000))]);
        SimulatedSwapExecutor::new(Arc::new(StaticPrices(prices)), "usdt")
    }

    fn request(from: &str, to: &str, amount: Decimal) -> SwapRequest {
        SwapRequest {
            from_token: from.to_string(),
            to_token: to.to_string(),
            amount,
            slippage_percent: dec!(1),
        }
    }

    #[tokio::test]
    async fn test_buy_applies_slippage() {
        let executor = executor().with_slippage_bps(50, 50);
        let result = executor.swap(&request("USDT", "ETH", dec!(100))).await.unwrap();

        assert!(result.success);
        assert_eq!(result.amount_out, dec!(0.04975));
        assert!(result.execution_price > dec!(2000));
        assert!(result.execution_ref.unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn test_sell_applies_slippage() {
        let executor = executor().with_slippage_bps(10, 10);
        let result = executor.swap(&request("ETH", "USDT", dec!(0.5))).await.unwrap();

        assert!(result.success);
        assert_eq!(result.amount_out, dec!(999));
        assert_eq!(result.execution_price, dec!(1998));
    }

    #[tokio::test]
    async fn test_slippage_within_default_range() {
        let executor = executor();
        for _ in 0..20 {
            let result = executor.swap(&request("USDT", "ETH", dec!(100))).await.unwrap();
            assert!(result.amount_out >= dec!(0.04975));
            assert!(result.amount_out <= dec!(0.04995));
        }
    }

    #[tokio::test]
    async fn test_unquoted_symbol_fails() {
        let result = executor()
            .swap(&request("USDT", "DOGE", dec!(10)))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("DOGE"));
    }

    #[tokio::test]
    async fn test_tolerance_and_pair_checks() {
        let mut tight = request("USDT", "ETH", dec!(10));
        tight.slippage_percent = dec!(0.05);
        let result = executor().with_slippage_bps(10, 10).swap(&tight).await.unwrap();
        assert!(!result.success);

        let result = executor()
            .swap(&request("ETH", "SOL", dec!(1)))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
