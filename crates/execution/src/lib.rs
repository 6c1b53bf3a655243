//! Trading engine orchestration.
//!
//! This crate turns market data into supervised trades:
//! - Strategy signal generation (momentum by default)
//! - Risk gating and position sizing
//! - Trade ledger with daily counters
//! - Periodic analysis, monitoring, health and reporting loops
//! - Emergency controls and circuit breaker
//!
//! External venues are reached only through the traits in [`ports`].

/// Prelude module for convenient imports.
pub mod prelude;

/// Time source.
pub mod clock;
/// Engine settings.
pub mod config;
/// Emergency controls and circuit breaker.
pub mod emergency;
/// Engine lifecycle and loops.
pub mod engine;
/// Error types.
pub mod error;
/// Trade ledger.
pub mod ledger;
/// Collaborator interfaces.
pub mod ports;
/// Risk gate.
pub mod risk;
/// Periodic loop scheduler.
pub mod scheduler;
/// Signal-generating strategies.
pub mod strategy;

#[cfg(test)]
mod test_support;
