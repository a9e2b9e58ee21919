//! Pump-backed pool adapter.
//!
//! The underlying pricing function is pluggable, so price, liquidity, and
//! deltaB all come from the external price service. A revert leaves the
//! handler with nothing to write: all-or-nothing per event.

use crate::adapters::PoolSample;
use crate::error::EngineError;
use crate::price::PriceService;

/// Fetch one pool's sample from the price service at the given block.
pub fn sample(
    service: &dyn PriceService,
    pool_id: &str,
    block: u64,
) -> Result<PoolSample, EngineError> {
    let data = service.pool(pool_id, block)?;
    Ok(PoolSample::from_service(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::{PoolPriceData, PriceSnapshot, TablePriceService};

    #[test]
    fn test_sample_delegates_to_service() {
        let service = TablePriceService::new([(
            50,
            PriceSnapshot {
                price: 1.02,
                liquidity_usd: 500_000.0,
                delta_b: 7_000_000,
                pools: vec![PoolPriceData {
                    pool: "bean-weth-pump".to_string(),
                    tokens: vec!["bean".to_string(), "weth".to_string()],
                    balances: vec![490_000_000_000, 255_000_000_000_000_000_000],
                    price: 1.02,
                    liquidity_usd: 500_000.0,
                    delta_b: 7_000_000,
                }],
            },
        )]);

        let s = sample(&service, "bean-weth-pump", 50).unwrap();
        assert_eq!(s.price, 1.02);
        assert_eq!(s.delta_b, 7_000_000);
        assert_eq!(s.updated_reserves.len(), 2);
    }

    #[test]
    fn test_revert_propagates() {
        let service = TablePriceService::default();
        assert!(matches!(
            sample(&service, "bean-weth-pump", 50),
            Err(EngineError::PriceRevert { block: 50 })
        ));
    }
}
