//! Validation for the floating-point inputs the engine accepts.
//!
//! Every public engine operation runs its arguments through these checks
//! before touching state, so a rejected call never leaves a partial update.

use crate::error::{CoreError, Result};

/// Rounding allowance, in units of `f64::EPSILON` relative to the operands.
pub const CANCELLATION_ULPS: f64 = 4.0;

/// Accept a strictly positive, finite price.
pub fn ensure_price(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(CoreError::InvalidPrice(format!(
            "price must be finite, got {value}"
        )));
    }
    if value <= 0.0 {
        return Err(CoreError::InvalidPrice(format!(
            "price must be positive, got {value}"
        )));
    }
    Ok(value)
}

/// Accept a strictly positive, finite size.
pub fn ensure_size(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(CoreError::InvalidSize(format!(
            "size must be finite, got {value}"
        )));
    }
    if value <= 0.0 {
        return Err(CoreError::InvalidSize(format!(
            "size must be positive, got {value}"
        )));
    }
    Ok(value)
}

/// Whether `residual`, the sum of quantities no larger than `scale` in
/// magnitude, is only rounding error around zero.
///
/// The allowance is relative, so any size that passes [`ensure_size`]
/// stays distinguishable from zero.
#[inline]
pub fn is_cancellation_noise(residual: f64, scale: f64) -> bool {
    residual.abs() <= CANCELLATION_ULPS * f64::EPSILON * scale.abs()
}
