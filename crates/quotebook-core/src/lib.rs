//! Core domain types for the quotebook market-making engine.
//!
//! This crate provides fundamental types used throughout the engine:
//! - `InstrumentKey`: Case-sensitive identifier for a tradable symbol
//! - `Side`: Buy/sell direction
//! - `Quote`: Immutable bid/offer produced by the pricer
//! - `PositionSnapshot`, `TradeRecord`, `InstrumentStats`: Ledger views
//! - Input validation for prices and sizes

pub mod error;
pub mod instrument;
pub mod numeric;
pub mod order;
pub mod types;

pub use error::{CoreError, Result};
pub use instrument::InstrumentKey;
pub use numeric::{ensure_price, ensure_size, is_cancellation_noise, CANCELLATION_ULPS};
pub use order::Side;
pub use types::{InstrumentStats, PositionSnapshot, Quote, QuotePricing, TradeRecord};
