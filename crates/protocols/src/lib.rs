//! Concrete adapters for the engine's collaborator ports.
//!
//! - [`coingecko`]: market data from the CoinGecko public API
//! - [`simulated`]: swap executor that fills at market price with random slippage
//! - [`backend`]: reporter that posts events to an HTTP backend
//! - [`log_reporter`]: reporter that only writes to the log

/// HTTP backend reporter.
pub mod backend;
/// CoinGecko market data.
pub mod coingecko;
/// Log-only reporter.
pub mod log_reporter;
/// Simulated swap execution.
pub mod simulated;

mod http;

pub use backend::HttpReporter;
pub use coingecko::CoinGeckoMarketData;
pub use log_reporter::LogReporter;
pub use simulated::SimulatedSwapExecutor;
