pub mod signal;
pub mod trade;

pub use signal::Signal;
pub use trade::{Trade, TradeId};
