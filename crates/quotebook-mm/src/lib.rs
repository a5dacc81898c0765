//! Market-making quote engine.
//!
//! Provides quoting and position tracking for one or many instruments:
//! - Quote calculation with volatility-driven spread and inventory skew
//! - Position ledger with volume-weighted average price and realized PnL
//! - Rolling volatility estimation from observed reference prices
//! - Append-only trade ledger with per-instrument statistics
//!
//! # Architecture
//!
//! ```text
//! reference price → MarketMaker.quote()
//!                    ├─ VolatilityEstimator: observe + estimate
//!                    ├─ PositionLedger: inventory ratio for skew
//!                    └─ compute_quote(): bid / offer
//!                         ↓
//! caller decides   → MarketMaker.execute()
//!                    ├─ PositionLedger: apply_trade
//!                    └─ TradeRecorder: record
//! ```
//!
//! [`MarketMaker`] is for single-threaded use. [`SharedMarketMaker`] exposes
//! the same operations through `&self` with per-instrument locking.

pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod quote_engine;
pub mod recorder;
pub mod shared;
pub mod volatility;

pub use config::MakerConfig;
pub use engine::MarketMaker;
pub use error::{MakerError, MakerResult};
pub use inventory::{Position, PositionLedger};
pub use quote_engine::{compute_quote, PricingInputs};
pub use recorder::TradeRecorder;
pub use shared::SharedMarketMaker;
pub use volatility::{PriceWindow, VolatilityEstimator};
