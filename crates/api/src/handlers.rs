//! HTTP handlers for the engine endpoints.

use crate::error::ApiError;
use crate::models::{
    ExecuteRequest, ExecuteResponse, HealthResponse, MessageResponse, PortfolioResponse,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use dex_trader_execution::engine::EngineStatus;
use tracing::info;

/// Liveness of the API process, plus whether the engine is active.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        engine_active: state.engine.state().is_active(),
    })
}

pub async fn get_status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status().await)
}

pub async fn get_portfolio(State(state): State<AppState>) -> Json<PortfolioResponse> {
    let positions = state.engine.portfolio().await;
    Json(PortfolioResponse::new(state.engine.is_running(), positions))
}

/// Starts the engine. Responds 409 if it is already active.
pub async fn start_engine(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.engine.start().await?;
    info!("Trading engine started via API");
    Ok(Json(MessageResponse {
        message: "Trading engine started".to_string(),
        status: state.engine.state(),
    }))
}

pub async fn stop_engine(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.engine.stop().await?;
    info!("Trading engine stopped via API");
    Ok(Json(MessageResponse {
        message: "Trading engine stopped".to_string(),
        status: state.engine.state(),
    }))
}

/// Executes a manual trade. Responds 400 unless the engine is running.
pub async fn execute_trade(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let side = request.side().map_err(ApiError::BadRequest)?;
    let symbol = request.symbol();

    let result = state
        .engine
        .execute_manual(symbol, side, request.amount, request.price)
        .await?;
    info!(pair = %request.pair, side = %side, amount = %request.amount, "Manual trade executed via API");

    Ok(Json(ExecuteResponse {
        message: "Trade executed".to_string(),
        result,
    }))
}
