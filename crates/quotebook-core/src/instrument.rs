//! Instrument identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::error::{CoreError, Result};

/// Identifier for a tradable symbol (e.g. "AAPL", "BTC-PERP").
///
/// This is the primary key for all per-instrument engine state.
/// Comparison is exact and case-sensitive: "aapl" and "AAPL" are
/// different instruments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentKey(String);

impl InstrumentKey {
    /// Create a key, rejecting empty symbols.
    pub fn new(symbol: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(CoreError::InvalidInstrument(
                "instrument symbol must not be empty".to_string(),
            ));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets maps keyed by `InstrumentKey` be queried with a plain `&str`.
impl Borrow<str> for InstrumentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InstrumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for InstrumentKey {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for InstrumentKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}
