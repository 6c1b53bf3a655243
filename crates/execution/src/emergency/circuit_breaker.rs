//! Latching emergency circuit breaker.

use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::{error, info};

/// Health of the three external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollaboratorHealth {
    /// Market data source answered its last health check.
    pub market_data: bool,
    /// Execution venue answered its last health check.
    pub execution: bool,
    /// Reporting sink answered its last health check.
    pub reporting: bool,
}

impl CollaboratorHealth {
    fn unhealthy(&self) -> Vec<&'static str> {
        [
            ("market_data", self.market_data),
            ("execution", self.execution),
            ("reporting", self.reporting),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Risk thresholds watched by the health loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskStatus {
    /// False once today's loss reaches the daily limit.
    pub daily_loss_ok: bool,
    /// False once the losing streak reaches the limit.
    pub consecutive_losses_ok: bool,
    /// False when more trades are live than the configured maximum.
    pub position_count_ok: bool,
}

impl RiskStatus {
    /// Evaluates the thresholds against current counters.
    pub fn assess(
        config: &EngineConfig,
        daily_pnl: Decimal,
        consecutive_losses: u32,
        open_trades: usize,
    ) -> Self {
        Self {
            daily_loss_ok: daily_pnl.min(Decimal::ZERO).abs() < config.daily_loss_limit(),
            consecutive_losses_ok: consecutive_losses < config.consecutive_loss_limit,
            position_count_ok: open_trades <= config.max_simultaneous_trades as usize,
        }
    }

    /// True when no threshold is breached.
    pub fn safe(&self) -> bool {
        self.daily_loss_ok && self.consecutive_losses_ok && self.position_count_ok
    }

    fn breaches(&self) -> Vec<&'static str> {
        [
            ("daily_loss", self.daily_loss_ok),
            ("consecutive_losses", self.consecutive_losses_ok),
            ("position_count", self.position_count_ok),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Statistics for the emergency controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyStats {
    /// Whether the breaker is currently tripped.
    pub latched: bool,
    /// Trips since the controller was created.
    pub trip_count: u32,
    /// Time of the most recent trip.
    pub tripped_at: Option<DateTime<Utc>>,
    /// Reason given for the most recent trip.
    pub last_reason: Option<String>,
}

/// Circuit breaker that latches on unsafe conditions.
///
/// Once tripped it stays latched until [`EmergencyController::reset`], which
/// the engine only calls from an explicit `start()`.
#[derive(Default)]
pub struct EmergencyController {
    latched: AtomicBool,
    trip_count: AtomicU32,
    tripped_at: RwLock<Option<DateTime<Utc>>>,
    last_reason: RwLock<Option<String>>,
}

impl EmergencyController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a description of the trigger if conditions are unsafe.
    pub fn evaluate(&self, health: &CollaboratorHealth, risk: &RiskStatus) -> Option<String> {
        let mut causes = Vec::new();
        let unhealthy = health.unhealthy();
        if !unhealthy.is_empty() {
            causes.push(format!("unhealthy: {}", unhealthy.join(", ")));
        }
        let breaches = risk.breaches();
        if !breaches.is_empty() {
            causes.push(format!("risk breached: {}", breaches.join(", ")));
        }

        if causes.is_empty() {
            None
        } else {
            Some(causes.join("; "))
        }
    }

    /// Latches the breaker. Returns `true` only for the call that latched it.
    pub async fn trip(&self, reason: &str, at: DateTime<Utc>) -> bool {
        if self
            .latched
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.trip_count.fetch_add(1, Ordering::SeqCst);
        *self.tripped_at.write().await = Some(at);
        *self.last_reason.write().await = Some(reason.to_string());
        error!(reason = reason, "Emergency stop triggered");
        true
    }

    pub fn is_latched(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    /// Clears the latch. Trip history is kept.
    pub fn reset(&self) {
        if self.latched.swap(false, Ordering::SeqCst) {
            info!("Emergency latch reset");
        }
    }

    pub async fn stats(&self) -> EmergencyStats {
        EmergencyStats {
            latched: self.is_latched(),
            trip_count: self.trip_count.load(Ordering::SeqCst),
            tripped_at: *self.tripped_at.read().await,
            last_reason: self.last_reason.read().await.clone(),
        }
    }
}
