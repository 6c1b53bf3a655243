use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A swap to submit to an execution venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Token sold.
    pub from_token: String,
    /// Token bought.
    pub to_token: String,
    /// Amount of `from_token` to sell.
    pub amount: Decimal,
    /// Maximum accepted slippage, in percent.
    pub slippage_percent: Decimal,
}

/// Outcome reported by an execution venue.
///
/// `execution_price` is always expressed in quote currency per unit of the
/// non-quote token, regardless of swap direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapResult {
    /// False when the venue rejected or failed the swap.
    pub success: bool,
    /// Amount of the bought token received.
    pub amount_out: Decimal,
    pub execution_price: Decimal,
    /// Transaction hash or order id, present on success.
    pub execution_ref: Option<String>,
    /// Venue error message, present on failure.
    pub error: Option<String>,
}

impl SwapResult {
    pub fn filled(amount_out: Decimal, execution_price: Decimal, execution_ref: String) -> Self {
        Self {
            success: true,
            amount_out,
            execution_price,
            execution_ref: Some(execution_ref),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            amount_out: Decimal::ZERO,
            execution_price: Decimal::ZERO,
            execution_ref: None,
            error: Some(error.into()),
        }
    }
}
