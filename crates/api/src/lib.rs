//! REST API for the trading engine.
//!
//! This crate exposes the engine's operator surface over HTTP:
//! - Health and status endpoints
//! - Portfolio of open trades
//! - Engine start and stop
//! - Manual trade execution

/// Error types.
pub mod error;
/// Request handlers.
pub mod handlers;
/// API request/response models.
pub mod models;
/// Route definitions.
pub mod routes;
/// Server configuration and startup.
pub mod server;
/// Application state.
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::{ApiServer, ServerConfig};
pub use state::AppState;
