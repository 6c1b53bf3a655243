use super::{Engine, EngineInner};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::emergency::EmergencyController;
use crate::error::ConfigError;
use crate::ledger::TradeLedger;
use crate::ports::{ExecutionPort, MarketDataPort, ReportingPort};
use crate::risk::RiskGate;
use crate::strategy::{MomentumConfig, MomentumStrategy, Strategy};
use dex_trader_domain::EngineState;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Wires collaborators into an [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    market_data: Option<Arc<dyn MarketDataPort>>,
    execution: Option<Arc<dyn ExecutionPort>>,
    reporting: Option<Arc<dyn ReportingPort>>,
    strategy: Option<Box<dyn Strategy>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            market_data: None,
            execution: None,
            reporting: None,
            strategy: None,
            clock: None,
        }
    }

    #[must_use]
    pub fn market_data(mut self, port: Arc<dyn MarketDataPort>) -> Self {
        self.market_data = Some(port);
        self
    }

    #[must_use]
    pub fn execution(mut self, port: Arc<dyn ExecutionPort>) -> Self {
        self.execution = Some(port);
        self
    }

    #[must_use]
    pub fn reporting(mut self, port: Arc<dyn ReportingPort>) -> Self {
        self.reporting = Some(port);
        self
    }

    /// Defaults to [`MomentumStrategy`] configured from the engine settings.
    #[must_use]
    pub fn strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the settings and builds a stopped engine.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for invalid settings or a missing adapter.
    pub fn build(self) -> Result<Engine, ConfigError> {
        self.config.validate()?;

        let market_data = self
            .market_data
            .ok_or(ConfigError::MissingAdapter("market data"))?;
        let execution = self
            .execution
            .ok_or(ConfigError::MissingAdapter("execution"))?;
        let reporting = self
            .reporting
            .ok_or(ConfigError::MissingAdapter("reporting"))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let strategy = self.strategy.unwrap_or_else(|| {
            Box::new(MomentumStrategy::new(MomentumConfig::from_engine(
                &self.config,
            )))
        });
        let risk = RiskGate::new(self.config.clone(), clock.clone());

        let inner = EngineInner {
            ledger: TradeLedger::new(clock.clone()),
            risk,
            strategy: tokio::sync::Mutex::new(strategy),
            market_data,
            execution,
            reporting,
            breaker: EmergencyController::new(),
            state: Mutex::new(EngineState::Stopped),
            token: Mutex::new(CancellationToken::new()),
            scheduler: tokio::sync::Mutex::new(None),
            started_at: Mutex::new(None),
            clock,
            config: self.config,
        };

        Ok(Engine {
            inner: Arc::new(inner),
        })
    }
}
