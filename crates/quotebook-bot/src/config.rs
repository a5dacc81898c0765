//! Application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Field defaults
//! 2. TOML file (`--config`, `QUOTEBOOK_CONFIG`, or `config/default.toml`)
//! 3. Environment variables such as `QUOTEBOOK__MAKER__BASE_HALF_SPREAD_BPS`

use std::collections::HashSet;
use std::path::Path;

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use quotebook_core::ensure_price;
use quotebook_mm::MakerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const ENV_PREFIX: &str = "QUOTEBOOK";
const ENV_SEPARATOR: &str = "__";

/// One simulated instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// Initial reference price.
    pub start_price: f64,
}

/// Random-walk simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentConfig>,

    /// Steps to run. Every instrument is quoted once per step.
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Size of every quote.
    #[serde(default = "default_order_size")]
    pub order_size: f64,

    /// Probability that a quote is executed, in [0, 1].
    #[serde(default = "default_fill_probability")]
    pub fill_probability: f64,

    /// Per-step return is uniform in `[-step_volatility, step_volatility]`.
    #[serde(default = "default_step_volatility")]
    pub step_volatility: f64,

    /// RNG seed; identical seeds replay identical sessions.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_instruments() -> Vec<InstrumentConfig> {
    vec![
        InstrumentConfig {
            symbol: "AAPL".to_string(),
            start_price: 150.0,
        },
        InstrumentConfig {
            symbol: "MSFT".to_string(),
            start_price: 300.0,
        },
    ]
}

fn default_steps() -> usize {
    1_000
}

fn default_order_size() -> f64 {
    10.0
}

fn default_fill_probability() -> f64 {
    0.5
}

fn default_step_volatility() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    42
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            steps: default_steps(),
            order_size: default_order_size(),
            fill_probability: default_fill_probability(),
            step_volatility: default_step_volatility(),
            seed: default_seed(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.instruments.is_empty() {
            return Err(AppError::Config(
                "simulation.instruments must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if instrument.symbol.is_empty() {
                return Err(AppError::Config("instrument symbol is empty".to_string()));
            }
            if !seen.insert(instrument.symbol.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate instrument: {}",
                    instrument.symbol
                )));
            }
            ensure_price(instrument.start_price).map_err(|e| {
                AppError::Config(format!("{}: start_price {e}", instrument.symbol))
            })?;
        }
        if !self.order_size.is_finite() || self.order_size <= 0.0 {
            return Err(AppError::Config(format!(
                "order_size must be positive, got {}",
                self.order_size
            )));
        }
        if !(0.0..=1.0).contains(&self.fill_probability) {
            return Err(AppError::Config(format!(
                "fill_probability must be in [0, 1], got {}",
                self.fill_probability
            )));
        }
        // Below 1 so a step can never drive the price to zero
        if !(0.0..1.0).contains(&self.step_volatility) {
            return Err(AppError::Config(format!(
                "step_volatility must be in [0, 1), got {}",
                self.step_volatility
            )));
        }
        Ok(())
    }
}

/// `QUOTEBOOK__SECTION__FIELD` overrides.
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub maker: MakerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Load from `path` (required to exist) or, without a path, from
    /// [`DEFAULT_CONFIG_PATH`] if present. Environment overrides apply
    /// in both cases.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH)
                .format(FileFormat::Toml)
                .required(false),
        };
        Self::from_builder(Config::builder().add_source(file).add_source(env_source()))
    }

    /// Parse and validate TOML content alone. The environment is not read.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<::config::builder::DefaultState>) -> AppResult<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.maker.validate()?;
        self.simulation.validate()
    }
}
