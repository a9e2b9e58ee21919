//! Numeric conversion utilities.
//!
//! Functions for converting raw fixed-point token amounts (u128/i128) into
//! decimal-adjusted f64 values with proper precision handling.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

// ============================================
// Raw Amount Conversions
// ============================================

/// Convert a raw u128 token amount to f64 with decimal adjustment using BigDecimal.
///
/// This avoids precision loss that occurs when directly casting u128 to f64
/// for values larger than 2^53.
///
/// # Arguments
/// * `amount` - The raw token amount
/// * `decimals` - The token's decimal precision
///
/// # Returns
/// * The adjusted f64 value, or 0.0 if conversion fails
pub fn amount_to_f64(amount: u128, decimals: u8) -> f64 {
    let big_value = BigDecimal::from(amount);

    let adjusted = if decimals == 0 { big_value } else { big_value / big_pow10(decimals) };

    adjusted.to_f64().unwrap_or(0.0)
}

/// Convert a signed raw i128 amount (e.g. deltaB) to f64 with decimal adjustment.
pub fn signed_to_f64(amount: i128, decimals: u8) -> f64 {
    let big_value = BigDecimal::from(BigInt::from(amount));

    let adjusted = if decimals == 0 { big_value } else { big_value / big_pow10(decimals) };

    adjusted.to_f64().unwrap_or(0.0)
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}
