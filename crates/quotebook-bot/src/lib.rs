//! Market-making simulation driver.
//!
//! Drives a [`quotebook_mm::MarketMaker`] with a seeded random walk per
//! instrument:
//! - Configuration layered from a TOML file and environment variables
//! - Quote every instrument each step, fill with a fixed probability
//! - Metrics, trade logging and an end-of-run session summary

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, SessionOutcome};
pub use config::{AppConfig, InstrumentConfig, SimulationConfig};
pub use error::{AppError, AppResult};
