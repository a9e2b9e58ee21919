//! Guarded arithmetic and price validation helpers.
//!
//! Zero-liquidity pools are a legitimate transient state, so divides against
//! liquidity, reserves, or utilization denominators must resolve to a defined
//! neutral value instead of crashing or producing NaN/inf.

// ============================================
// Validation Constants
// ============================================

/// Maximum reasonable pegged-asset price. The asset is designed to track 1.0;
/// anything beyond this bound indicates a calculation error, not a market move.
pub const MAX_PEG_PRICE: f64 = 1e6;

/// Minimum reasonable pegged-asset price. Inverse of MAX_PEG_PRICE.
pub const MIN_PEG_PRICE: f64 = 1e-6;

// ============================================
// Guarded Arithmetic
// ============================================

/// Divide two f64 values, resolving a zero or invalid denominator to 0.0.
#[inline]
pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let result = numerator / denominator;
    if result.is_finite() {
        result
    } else {
        0.0
    }
}

/// Validate a pegged-asset price is within reasonable bounds.
/// Returns Some(price) if valid, None if invalid.
#[inline]
pub fn validate_peg_price(price: f64) -> Option<f64> {
    if price > 0.0 && price.is_finite() && price >= MIN_PEG_PRICE && price <= MAX_PEG_PRICE {
        Some(price)
    } else {
        None
    }
}
