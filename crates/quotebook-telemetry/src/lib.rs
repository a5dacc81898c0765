//! Prometheus metrics, structured logging and session reporting for quotebook.
//!
//! The engine crates only emit `tracing` events. Binaries call
//! [`init_logging`] once, record [`Metrics`] around engine calls, and hand
//! per-instrument statistics to a [`SessionReporter`] at the end of a run.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod report;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use report::{InstrumentSummary, SessionReporter};
