//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use dex_trader_execution::prelude::*;
//! ```

// Clock
pub use crate::clock::{Clock, ManualClock, SystemClock};

// Config
pub use crate::config::EngineConfig;

// Emergency
pub use crate::emergency::{
    CollaboratorHealth, EmergencyController, EmergencyStats, ExitResult, ExitStatus, ExitSummary,
    RiskStatus,
};

// Engine
pub use crate::engine::{Engine, EngineBuilder, EngineStatus, ManualTradeResult};

// Errors
pub use crate::error::{ConfigError, EngineError, LedgerError, PortError, RiskError};

// Ledger
pub use crate::ledger::{ClosedTrade, LedgerCounters, LedgerView, TradeLedger};

// Ports
pub use crate::ports::{ExecutionPort, MarketDataPort, ReportingPort};

// Risk
pub use crate::risk::{FixedVolatility, RiskDecision, RiskGate, VolatilityModel};

// Scheduler
pub use crate::scheduler::Scheduler;

// Strategy
pub use crate::strategy::{MomentumConfig, MomentumStrategy, Strategy};
