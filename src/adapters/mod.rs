//! Pool price adapters.
//!
//! One adapter per pool family, each normalizing a raw event into the
//! canonical sample shape the rest of the pipeline consumes:
//!
//! - [`constant_product`] - prices from reserves via the x*y=k solver
//! - [`stableswap`] - prices via the D/Y invariant solve and virtual-price metadata
//! - [`pump`] - delegates wholesale to the external price service

pub mod constant_product;
pub mod pump;
pub mod stableswap;

use crate::price::PoolPriceData;

/// Canonical per-pool sample: the single internal shape every adapter
/// produces, regardless of where the numbers came from.
#[derive(Debug, Clone)]
pub struct PoolSample {
    pub price: f64,
    pub liquidity_usd: f64,
    pub delta_b: i128,
    pub updated_reserves: Vec<u128>,
}

impl PoolSample {
    /// Explicit field-by-field conversion from the price service's row shape.
    pub fn from_service(data: &PoolPriceData) -> Self {
        Self {
            price: data.price,
            liquidity_usd: data.liquidity_usd,
            delta_b: data.delta_b,
            updated_reserves: data.balances.clone(),
        }
    }
}
