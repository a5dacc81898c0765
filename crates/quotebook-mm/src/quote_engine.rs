//! Quote price calculation engine.
//!
//! Computes bid/offer prices based on:
//! - Reference price (source of truth)
//! - Volatility-scaled half-spread (`base_half_spread_bps * volatility`)
//! - Inventory skew (shift both sides to reduce exposure)
//! - Adverse-selection spread multiplier

use quotebook_core::QuotePricing;

use crate::config::MakerConfig;

const BPS_DIVISOR: f64 = 10_000.0;

/// Cap on the half-spread (40%). With `|skew| <= half_spread` the bid stays
/// at or above 20% of the reference, so every quoted price is a valid fill price.
pub const MAX_HALF_SPREAD_BPS: f64 = 4_000.0;

/// Inputs to [`compute_quote`] for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInputs {
    /// Current reference (mid) price. Must be finite and positive.
    pub reference_price: f64,
    /// Signed inventory (positive = long).
    pub net_quantity: f64,
    /// Volatility estimate after observing `reference_price`.
    pub volatility: f64,
    /// Spread multiplier (1.0 = normal). Values below 1.0 are clamped.
    pub spread_multiplier: f64,
}

/// Signed inventory notional as a fraction of `max_position_notional`, in [-1, 1].
pub fn inventory_ratio(net_quantity: f64, reference_price: f64, max_notional: f64) -> f64 {
    if max_notional <= 0.0 {
        return 0.0;
    }
    (net_quantity * reference_price / max_notional).clamp(-1.0, 1.0)
}

/// Calculate a two-sided quote.
///
/// ```text
/// half_bps = clamp(base_half_spread_bps * volatility * multiplier,
///                  min_half_spread_bps, MAX_HALF_SPREAD_BPS)
/// half     = reference * half_bps / 10_000
/// skew     = inventory_skew_factor * inventory_ratio * half
/// bid      = reference - half - skew
/// offer    = reference + half - skew
/// ```
///
/// A long inventory yields a positive skew, lowering both prices so that
/// buying becomes less attractive and selling more. Because the skew factor
/// is at most 1 and the ratio is clamped to [-1, 1], the reference price
/// always lies within `[bid, offer]`.
pub fn compute_quote(inputs: &PricingInputs, config: &MakerConfig) -> QuotePricing {
    let reference = inputs.reference_price;
    let multiplier = inputs.spread_multiplier.max(1.0);

    let half_bps = (config.base_half_spread_bps * inputs.volatility * multiplier)
        .max(config.min_half_spread_bps)
        .min(MAX_HALF_SPREAD_BPS);
    let half_spread = reference * half_bps / BPS_DIVISOR;

    let ratio = inventory_ratio(
        inputs.net_quantity,
        reference,
        config.max_position_notional,
    );
    let skew = config.inventory_skew_factor.clamp(0.0, 1.0) * ratio * half_spread;

    QuotePricing {
        bid: reference - half_spread - skew,
        offer: reference + half_spread - skew,
        half_spread,
        skew,
        volatility: inputs.volatility,
        spread_multiplier: multiplier,
    }
}
