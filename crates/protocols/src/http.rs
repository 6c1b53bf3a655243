use anyhow::{Context, Result};
use dex_trader_execution::error::PortError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("dex-trader/", env!("CARGO_PKG_VERSION"));

pub(crate) fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

pub(crate) fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(e.to_string())
    } else if e.is_decode() {
        PortError::InvalidResponse(e.to_string())
    } else {
        PortError::Network(e.to_string())
    }
}

/// Maps a non-success status to a [`PortError`], consuming the body.
pub(crate) async fn status_error(response: Response) -> PortError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            PortError::Unavailable(format!("{status}: {body}"))
        }
        s if s.is_client_error() => PortError::Rejected(format!("{status}: {body}")),
        _ => PortError::Unavailable(format!("{status}: {body}")),
    }
}
