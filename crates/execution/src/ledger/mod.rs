//! Authoritative in-memory record of live trades and daily counters.

mod trade_ledger;

pub use trade_ledger::*;
