//! Emergency controls and circuit breaker.
//!
//! Provides safety mechanisms for automated trading:
//! - Latching breaker over collaborator health and risk thresholds
//! - Concurrent best-effort exit of all live trades

mod circuit_breaker;
mod emergency_exit;

pub use circuit_breaker::*;
pub use emergency_exit::*;
