//! Constant-product invariant pricing.
//!
//! Pure routines for pools enforcing `x * y = k`. Prices are quoted for the
//! pegged asset against the pool's counterparty token, and deltaB is the
//! signed quantity of pegged asset that would move the pool exactly to peg.

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use crate::utils::big_pow10;

/// Price of the pegged asset implied by a constant-product pool.
///
/// `price = otherReserve * otherPrice / beanReserve`, with all reserves
/// decimal-adjusted. A drained pegged-asset side has no defined price.
///
/// # Returns
/// * `Some(price)` when the pool can be priced, `None` when beanReserve is zero
pub fn constant_product_price(
    bean_reserve: f64,
    other_reserve: f64,
    other_price: f64,
) -> Option<f64> {
    if bean_reserve <= 0.0 {
        return None;
    }
    let price = other_reserve * other_price / bean_reserve;
    if price.is_finite() {
        Some(price)
    } else {
        None
    }
}

/// DeltaB of a constant-product pool, in raw pegged-asset units.
///
/// Let `product = beanReserve * otherReserve * otherPrice`, scaled back to
/// the asset's decimal precision. The pegged-asset balance the pool would
/// hold at peg is `integerSqrt(product)`, so
/// `deltaB = beansAfterSwap - beanReserve`.
///
/// The product is computed in BigDecimal and truncated (never rounded) before
/// the integer square root.
///
/// # Arguments
/// * `bean_reserve` - Raw pegged-asset reserve
/// * `other_reserve` - Decimal-adjusted counterparty reserve
/// * `other_price` - Counterparty token USD price
/// * `decimals` - The pegged asset's decimal precision
pub fn constant_product_delta_b(
    bean_reserve: u128,
    other_reserve: f64,
    other_price: f64,
    decimals: u8,
) -> i128 {
    if bean_reserve == 0 || other_reserve <= 0.0 || other_price <= 0.0 {
        return 0;
    }

    let Some(other) = BigDecimal::from_f64(other_reserve) else {
        return 0;
    };
    let Some(price) = BigDecimal::from_f64(other_price) else {
        return 0;
    };

    let product =
        BigDecimal::from(BigInt::from(bean_reserve)) * other * price * big_pow10(decimals);

    let (truncated, _) = product
        .with_scale_round(0, RoundingMode::Down)
        .into_bigint_and_exponent();

    let beans_after_swap = BigInt::from(integer_sqrt(truncated.magnitude()));
    let delta = beans_after_swap - BigInt::from(bean_reserve);

    delta.to_i128().unwrap_or(if delta.is_negative() {
        i128::MIN
    } else {
        i128::MAX
    })
}

/// Floor integer square root via Babylonian (Newton) iteration.
///
/// Starts from a power-of-two upper bound on the root, so the sequence is
/// monotonically decreasing and terminates at floor(sqrt(value)).
pub(crate) fn integer_sqrt(value: &BigUint) -> BigUint {
    if value.is_zero() {
        return BigUint::zero();
    }

    // 2^ceil(bits/2) >= sqrt(value)
    let shift = (value.bits() + 1) / 2;
    let mut x = BigUint::one() << shift;

    loop {
        let next = (&x + value / &x) >> 1u32;
        if next >= x {
            return x;
        }
        x = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_price_inverts_reserve_product() {
        // price * beanReserve should recover otherReserve * otherPrice
        let cases = [
            (1_000.0, 500.0, 2.0),
            (1_000_000.0, 500.0, 2_000.0),
            (123_456.0, 987.0, 13.37),
        ];
        for (bean, other, price) in cases {
            let p = constant_product_price(bean, other, price).unwrap();
            assert!((p * bean - other * price).abs() < 1e-6 * other * price);
        }
    }

    #[test]
    fn test_price_undefined_for_zero_bean_reserve() {
        assert_eq!(constant_product_price(0.0, 500.0, 2.0), None);
    }

    #[test]
    fn test_delta_b_zero_at_peg() {
        // 1M beans (6 decimals) against 500 tokens at $2000: both sides $1M
        let delta = constant_product_delta_b(1_000_000_000_000, 500.0, 2_000.0, 6);
        assert_eq!(delta, 0);
    }

    #[test]
    fn test_delta_b_positive_above_peg() {
        // Fewer beans than the counterparty value: price above peg, beans
        // must be added to return to it
        let delta = constant_product_delta_b(900_000_000_000, 500.0, 2_000.0, 6);
        assert!(delta > 0);
        // sqrt(0.9e24) = 948_683_298_050.51..., truncated
        assert_eq!(delta, 948_683_298_050 - 900_000_000_000);
    }

    #[test]
    fn test_delta_b_negative_below_peg() {
        let delta = constant_product_delta_b(1_100_000_000_000, 500.0, 2_000.0, 6);
        assert!(delta < 0);
    }

    #[test]
    fn test_delta_b_zero_reserves() {
        assert_eq!(constant_product_delta_b(0, 500.0, 2_000.0, 6), 0);
        assert_eq!(constant_product_delta_b(1_000_000, 0.0, 2_000.0, 6), 0);
    }

    #[test]
    fn test_integer_sqrt_exact_squares() {
        let k = BigUint::from_str("1000000000000000007").unwrap();
        let square = &k * &k;
        assert_eq!(integer_sqrt(&square), k);
        // One above a perfect square still floors to k
        assert_eq!(integer_sqrt(&(square + 1u32)), k);
    }

    #[test]
    fn test_integer_sqrt_small_values() {
        for (n, expected) in [(0u32, 0u32), (1, 1), (2, 1), (3, 1), (4, 2), (15, 3), (16, 4)] {
            assert_eq!(integer_sqrt(&BigUint::from(n)), BigUint::from(expected));
        }
    }
}
