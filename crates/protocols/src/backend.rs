//! Reporter that posts engine events to an HTTP backend.

use crate::http;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dex_trader_domain::{AlertSeverity, CloseReason, PerformanceSnapshot, Trade, TradeId};
use dex_trader_execution::error::PortError;
use dex_trader_execution::ports::ReportingPort;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Posts JSON reports under `{base_url}/api/trading/`.
pub struct HttpReporter {
    client: Client,
    base_url: String,
}

impl HttpReporter {
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), PortError> {
        let url = format!("{}/api/trading/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            let error = http::status_error(response).await;
            warn!(path = path, error = %error, "Backend rejected report");
            return Err(error);
        }
        debug!(path = path, "Report delivered");
        Ok(())
    }
}

#[async_trait]
impl ReportingPort for HttpReporter {
    fn name(&self) -> &str {
        "http-backend"
    }

    async fn initialize(&self) -> Result<(), PortError> {
        info!(base_url = %self.base_url, "Backend reporter initialized");
        Ok(())
    }

    async fn report_execution(&self, trade: &Trade) -> Result<(), PortError> {
        let body = json!({
            "trade_id": trade.id,
            "symbol": trade.symbol,
            "side": trade.side,
            "amount": trade.amount,
            "entry_price": trade.entry_price,
            "stop_loss": trade.stop_loss,
            "take_profit": trade.take_profit,
            "timestamp": trade.opened_at,
            "tx_hash": trade.execution_ref,
            "status": "active",
        });
        self.post("execution", &body).await
    }

    async fn report_close(
        &self,
        trade_id: TradeId,
        pnl: Decimal,
        reason: CloseReason,
    ) -> Result<(), PortError> {
        let body = json!({
            "trade_id": trade_id,
            "pnl": pnl,
            "close_reason": reason,
            "close_timestamp": Utc::now(),
            "status": "closed",
        });
        self.post("close", &body).await
    }

    async fn report_performance(&self, snapshot: &PerformanceSnapshot) -> Result<(), PortError> {
        let body = json!({
            "timestamp": snapshot.timestamp,
            "metrics": snapshot,
            "engine_status": "active",
        });
        self.post("performance", &body).await
    }

    async fn report_alert(
        &self,
        alert_type: &str,
        message: &str,
        severity: AlertSeverity,
    ) -> Result<(), PortError> {
        let body = json!({
            "type": alert_type,
            "message": message,
            "severity": severity,
            "timestamp": Utc::now(),
        });
        self.post("alert", &body).await
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn record(
        State(received): State<Received>,
        Path(kind): Path<String>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        if kind == "alert" && body["severity"] == "critical" {
            return StatusCode::BAD_REQUEST;
        }
        received.lock().unwrap().push((kind, body));
        StatusCode::OK
    }

    async fn serve(received: Received) -> String {
        let app = Router::new()
            .route("/api/trading/{kind}", post(record))
            .route("/api/health", get(|| async { StatusCode::OK }))
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_close_payload() {
        let received = Received::default();
        let reporter = HttpReporter::new(serve(received.clone()).await, Duration::from_secs(5))
            .unwrap();
        let id = TradeId::new();

        reporter
            .report_close(id, dec!(-1.5), CloseReason::StopLoss)
            .await
            .unwrap();

        let received = received.lock().unwrap();
        let (kind, body) = &received[0];
        assert_eq!(kind, "close");
        assert_eq!(body["close_reason"], "stop_loss");
        assert_eq!(body["status"], "closed");
        assert_eq!(body["trade_id"], id.0.to_string());
    }

    #[tokio::test]
    async fn test_rejected_report_is_an_error() {
        let received = Received::default();
        let reporter = HttpReporter::new(serve(received.clone()).await, Duration::from_secs(5))
            .unwrap();

        reporter
            .report_alert("engine_started", "up", AlertSeverity::Info)
            .await
            .unwrap();
        let result = reporter
            .report_alert("emergency_stop", "down", AlertSeverity::Critical)
            .await;
        assert!(matches!(result, Err(PortError::Rejected(_))));
        assert_eq!(received.lock().unwrap().len(), 1);
        assert!(reporter.health_check().await);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let reporter =
            HttpReporter::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(!reporter.health_check().await);
        assert!(
            reporter
                .report_alert("x", "y", AlertSeverity::Info)
                .await
                .is_err()
        );
    }
}
