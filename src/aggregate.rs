//! Whitelist-aware aggregate computations.
//!
//! Aggregate price, liquidity, and deltaB are not simple sums over every
//! pool: only pools currently in the whitelist contribute. The aggregate
//! price is the liquidity-weighted average of contributing pools' prices.

use crate::store::Store;
use crate::utils::guarded_div;

/// Liquidity-weighted average price over whitelisted pools.
/// Zero total liquidity resolves to 0.0, not a crash.
pub fn weighted_price(store: &Store) -> f64 {
    let Some(asset) = store.asset() else {
        return 0.0;
    };
    let mut weighted = 0.0;
    let mut total = 0.0;
    for id in &asset.pools {
        if let Some(pool) = store.pool(id) {
            weighted += pool.last_price * pool.liquidity_usd;
            total += pool.liquidity_usd;
        }
    }
    guarded_div(weighted, total)
}

/// Total USD liquidity over whitelisted pools.
pub fn total_liquidity(store: &Store) -> f64 {
    let Some(asset) = store.asset() else {
        return 0.0;
    };
    asset
        .pools
        .iter()
        .filter_map(|id| store.pool(id))
        .map(|pool| pool.liquidity_usd)
        .sum()
}

/// Summed deltaB over whitelisted pools, in raw pegged-asset units.
pub fn total_delta_b(store: &Store) -> i128 {
    let Some(asset) = store.asset() else {
        return 0;
    };
    asset
        .pools
        .iter()
        .filter_map(|id| store.pool(id))
        .fold(0i128, |acc, pool| acc.saturating_add(pool.delta_b))
}

/// Liquidity-weighted average of whitelisted pools' time-weighted prices.
pub fn weighted_twa_price(store: &Store) -> f64 {
    let Some(asset) = store.asset() else {
        return 0.0;
    };
    let mut weighted = 0.0;
    let mut total = 0.0;
    for id in &asset.pools {
        if let Some(pool) = store.pool(id) {
            weighted += pool.twa_price * pool.liquidity_usd;
            total += pool.liquidity_usd;
        }
    }
    guarded_div(weighted, total)
}

/// Summed time-weighted deltaB over whitelisted pools.
pub fn total_twa_delta_b(store: &Store) -> i128 {
    let Some(asset) = store.asset() else {
        return 0;
    };
    asset
        .pools
        .iter()
        .filter_map(|id| store.pool(id))
        .fold(0i128, |acc, pool| acc.saturating_add(pool.twa_delta_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetSettings, PoolFamily, PoolSettings, ScanSettings, Settings};

    fn two_pool_settings() -> Settings {
        let pool = |id: &str| PoolSettings {
            id: id.to_string(),
            family: PoolFamily::ConstantProduct,
            tokens: vec!["bean".to_string(), "weth".to_string()],
            whitelisted: true,
            amplifier: 10_000,
            virtual_price: "1000000000000000000".to_string(),
            lp_supply: "0".to_string(),
        };
        Settings {
            asset: AssetSettings {
                token: "bean".to_string(),
                name: "Bean".to_string(),
                decimals: 6,
            },
            tokens: vec![],
            pools: vec![pool("pool-a"), pool("pool-b")],
            scan: ScanSettings::default(),
            replay: None,
        }
    }

    fn store_with_prices(prices: &[(&str, f64, f64, i128)]) -> (Store, Settings) {
        let settings = two_pool_settings();
        let mut store = Store::new();
        for (id, price, liquidity, delta_b) in prices {
            store.pool_or_create(&settings, id, 1, 100).unwrap();
            let pool = store.pool_mut(id).unwrap();
            pool.last_price = *price;
            pool.liquidity_usd = *liquidity;
            pool.delta_b = *delta_b;
        }
        (store, settings)
    }

    #[test]
    fn test_weighted_price_favors_deeper_pool() {
        let (store, _) = store_with_prices(&[
            ("pool-a", 1.02, 3_000_000.0, 30_000_000),
            ("pool-b", 0.90, 1_000_000.0, -100_000_000),
        ]);
        let expected = (1.02 * 3_000_000.0 + 0.90 * 1_000_000.0) / 4_000_000.0;
        assert!((weighted_price(&store) - expected).abs() < 1e-12);
        assert_eq!(total_liquidity(&store), 4_000_000.0);
        assert_eq!(total_delta_b(&store), -70_000_000);
    }

    #[test]
    fn test_zero_total_liquidity_resolves_to_zero() {
        let (store, _) = store_with_prices(&[
            ("pool-a", 1.02, 0.0, 0),
            ("pool-b", 0.90, 0.0, 0),
        ]);
        assert_eq!(weighted_price(&store), 0.0);
    }

    #[test]
    fn test_empty_store_is_neutral() {
        let store = Store::new();
        assert_eq!(weighted_price(&store), 0.0);
        assert_eq!(total_liquidity(&store), 0.0);
        assert_eq!(total_delta_b(&store), 0);
    }

    #[test]
    fn test_dewhitelisted_pool_excluded() {
        let (mut store, settings) = store_with_prices(&[
            ("pool-a", 1.0, 2_000_000.0, 0),
            ("pool-b", 0.80, 2_000_000.0, -500_000_000),
        ]);
        let asset = store.asset_or_create(&settings);
        let position = asset.pools.iter().position(|p| p == "pool-b").unwrap();
        let id = asset.pools.remove(position);
        asset.dewhitelisted_pools.push(id);

        assert!((weighted_price(&store) - 1.0).abs() < 1e-12);
        assert_eq!(total_liquidity(&store), 2_000_000.0);
        assert_eq!(total_delta_b(&store), 0);
        // The pool itself keeps its state
        assert_eq!(store.pool("pool-b").unwrap().delta_b, -500_000_000);
    }
}
