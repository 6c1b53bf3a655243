//! Error taxonomy for the execution engine.
//!
//! Risk rejections are deliberately absent: a rejected signal is a normal
//! outcome carried by [`crate::risk::RiskDecision`], not an error.

use dex_trader_domain::EngineState;
use rust_decimal::Decimal;

/// Failure reported by a collaborator adapter (network, API or venue).
///
/// Always transient from the engine's point of view: the current tick is
/// abandoned and the next tick retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),
    /// The adapter's own timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The collaborator is up but refuses service (rate limit, maintenance).
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// The collaborator answered with something that could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The collaborator rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Invalid engine settings. Fatal: prevents construction and `start()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),
    #[error("max position size must be within (0, 100]%, got {0}")]
    PositionSizeOutOfRange(Decimal),
    #[error("stop loss must be within (0, 50]%, got {0}")]
    StopLossOutOfRange(Decimal),
    #[error("take profit must be positive, got {0}")]
    NonPositiveTakeProfit(Decimal),
    #[error("max simultaneous trades must be positive")]
    NoTradesAllowed,
    #[error("price update interval must be positive")]
    ZeroPriceInterval,
    #[error("max daily loss must be within (0, 100]%, got {0}")]
    DailyLossOutOfRange(Decimal),
    #[error("consecutive loss limit must be positive")]
    ZeroLossLimit,
    #[error("minimum signal confidence must be within [0.70, 1], got {0}")]
    ConfidenceOutOfRange(Decimal),
    #[error("slippage must be within (0, 50]%, got {0}")]
    SlippageOutOfRange(Decimal),
    #[error("blackout window {start}..{end} is not a valid UTC hour range")]
    InvalidBlackout { start: u32, end: u32 },
    #[error("quote token must not be empty")]
    EmptyQuoteToken,
    #[error("{0} adapter is not wired")]
    MissingAdapter(&'static str),
}

/// Internal position-sizing failure. Never escapes the risk gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskError {
    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),
    #[error("volatility adjustment must be positive, got {0}")]
    InvalidAdjustment(Decimal),
    #[error("volatility model failed: {0}")]
    Volatility(String),
    #[error("arithmetic overflow while sizing position")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("symbol {0} already has an open trade")]
    SymbolExposure(String),
}

/// Errors surfaced by the engine's public operations and tick bodies.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("engine already active ({0})")]
    AlreadyActive(EngineState),
    #[error("engine not running ({0})")]
    NotRunning(EngineState),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("startup failed: {0}")]
    Startup(String),
    /// The venue reported `success = false`.
    #[error("execution failed: {0}")]
    Execution(String),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
