//! Constant-product pool adapter.
//!
//! Reserves come straight from the event payload (explicit arrays in
//! sync-style events, reconstructed from delta amounts otherwise); price,
//! deltaB, and liquidity all derive locally from the solver plus the
//! counterparty token's last known USD price.

use crate::adapters::PoolSample;
use crate::solver::{constant_product_delta_b, constant_product_price};
use crate::utils::{amount_to_f64, validate_peg_price};

/// Produce a canonical sample from a constant-product pool's reserves.
///
/// A drained pegged-asset side yields the neutral zero price rather than a
/// crash; zero-liquidity pools are a legitimate transient state.
pub fn sample(
    reserves: &[u128],
    bean_index: usize,
    asset_decimals: u8,
    other_decimals: u8,
    other_price_usd: f64,
) -> PoolSample {
    let bean_raw = reserves.get(bean_index).copied().unwrap_or(0);
    let other_raw = reserves.get(1 - bean_index).copied().unwrap_or(0);

    let bean_reserve = amount_to_f64(bean_raw, asset_decimals);
    let other_reserve = amount_to_f64(other_raw, other_decimals);

    let price = constant_product_price(bean_reserve, other_reserve, other_price_usd)
        .and_then(validate_peg_price)
        .unwrap_or(0.0);

    let delta_b =
        constant_product_delta_b(bean_raw, other_reserve, other_price_usd, asset_decimals);

    let liquidity_usd = bean_reserve * price + other_reserve * other_price_usd;

    PoolSample {
        price,
        liquidity_usd,
        delta_b,
        updated_reserves: reserves.to_vec(),
    }
}
