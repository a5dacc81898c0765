//! Engine error types.

use quotebook_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MakerError {
    /// Rejected argument; no state was mutated.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    #[error("Fill size {requested} exceeds quoted size {quoted}")]
    SizeExceedsQuote { requested: f64, quoted: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type MakerResult<T> = Result<T, MakerError>;
