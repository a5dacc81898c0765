//! Market making configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MakerError, MakerResult};

/// Market making configuration.
///
/// Every field has a serde default, so a config file only needs to name
/// the parameters it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Half-spread in basis points at a volatility estimate of 1.0.
    /// The effective half-spread scales linearly with the estimate.
    #[serde(default = "default_base_half_spread_bps")]
    pub base_half_spread_bps: f64,

    /// Floor on the effective half-spread in basis points.
    #[serde(default = "default_min_half_spread_bps")]
    pub min_half_spread_bps: f64,

    /// Number of reference prices retained per instrument for volatility.
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,

    /// Estimate reported until at least two prices have been observed.
    #[serde(default = "default_volatility_prior")]
    pub volatility_prior: f64,

    /// Lower bound on the volatility estimate.
    #[serde(default = "default_volatility_floor")]
    pub volatility_floor: f64,

    /// Observations per year, used to annualize return dispersion.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    /// Inventory skew factor (0.0 = no skew, 1.0 = full skew).
    /// When long, both bid and offer shift down by
    /// `factor * inventory_ratio * half_spread` (less aggressive buying,
    /// more aggressive selling). Mirrored when short.
    #[serde(default = "default_inventory_skew_factor")]
    pub inventory_skew_factor: f64,

    /// Position notional at which the inventory ratio saturates at ±1.
    #[serde(default = "default_max_position_notional")]
    pub max_position_notional: f64,

    /// Number of consecutive same-side fills that triggers spread widening.
    /// 0 disables the check.
    #[serde(default = "default_adverse_consecutive_fills")]
    pub adverse_consecutive_fills: u32,

    /// Spread multiplier applied when adverse selection is detected.
    #[serde(default = "default_adverse_spread_multiplier")]
    pub adverse_spread_multiplier: f64,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            base_half_spread_bps: default_base_half_spread_bps(),
            min_half_spread_bps: default_min_half_spread_bps(),
            volatility_window: default_volatility_window(),
            volatility_prior: default_volatility_prior(),
            volatility_floor: default_volatility_floor(),
            periods_per_year: default_periods_per_year(),
            inventory_skew_factor: default_inventory_skew_factor(),
            max_position_notional: default_max_position_notional(),
            adverse_consecutive_fills: default_adverse_consecutive_fills(),
            adverse_spread_multiplier: default_adverse_spread_multiplier(),
        }
    }
}

impl MakerConfig {
    /// Check parameter ranges. Called by the engines on construction.
    pub fn validate(&self) -> MakerResult<()> {
        fn finite_non_negative(name: &str, value: f64) -> MakerResult<()> {
            if !value.is_finite() || value < 0.0 {
                return Err(MakerError::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
            Ok(())
        }

        finite_non_negative("base_half_spread_bps", self.base_half_spread_bps)?;
        finite_non_negative("min_half_spread_bps", self.min_half_spread_bps)?;
        finite_non_negative("volatility_prior", self.volatility_prior)?;
        finite_non_negative("volatility_floor", self.volatility_floor)?;

        if self.volatility_window < 2 {
            return Err(MakerError::InvalidConfig(format!(
                "volatility_window must be >= 2, got {}",
                self.volatility_window
            )));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(MakerError::InvalidConfig(format!(
                "periods_per_year must be > 0, got {}",
                self.periods_per_year
            )));
        }
        if !(0.0..=1.0).contains(&self.inventory_skew_factor) {
            return Err(MakerError::InvalidConfig(format!(
                "inventory_skew_factor must be within [0, 1], got {}",
                self.inventory_skew_factor
            )));
        }
        if !self.max_position_notional.is_finite() || self.max_position_notional <= 0.0 {
            return Err(MakerError::InvalidConfig(format!(
                "max_position_notional must be > 0, got {}",
                self.max_position_notional
            )));
        }
        if !self.adverse_spread_multiplier.is_finite() || self.adverse_spread_multiplier < 1.0 {
            return Err(MakerError::InvalidConfig(format!(
                "adverse_spread_multiplier must be >= 1, got {}",
                self.adverse_spread_multiplier
            )));
        }
        Ok(())
    }
}

fn default_base_half_spread_bps() -> f64 {
    200.0 // 2%
}
fn default_min_half_spread_bps() -> f64 {
    1.0
}
fn default_volatility_window() -> usize {
    20
}
fn default_volatility_prior() -> f64 {
    1.0
}
fn default_volatility_floor() -> f64 {
    0.01
}
fn default_periods_per_year() -> f64 {
    252.0 // daily observations
}
fn default_inventory_skew_factor() -> f64 {
    0.3
}
fn default_max_position_notional() -> f64 {
    100_000.0
}
fn default_adverse_consecutive_fills() -> u32 {
    3
}
fn default_adverse_spread_multiplier() -> f64 {
    2.0
}
