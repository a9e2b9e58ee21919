//! Liquidity and volume rollups.
//!
//! Every qualifying event adds its deltas to the owning pool's running
//! totals, to the current hourly/daily snapshots' absolute totals, and to
//! the snapshots' delta-within-period fields. Delta fields reset only when a
//! new bucket is created, never mid-bucket. The same deltas propagate to the
//! aggregate asset when the pool is whitelisted.

use crate::config::Settings;
use crate::error::EngineError;
use crate::store::models::SnapshotPeriod;
use crate::store::Store;
use crate::utils::{amount_to_f64, guarded_div};

// ============================================
// Pool Rollups
// ============================================

/// Apply a volume/liquidity delta to a pool and its current snapshots.
#[allow(clippy::too_many_arguments)]
pub fn update_pool_values(
    store: &mut Store,
    pool_id: &str,
    block: u64,
    timestamp: u64,
    volume: u128,
    volume_usd: f64,
    delta_liquidity_usd: f64,
    delta_b: i128,
) -> Result<(), EngineError> {
    let pool = store.pool_mut(pool_id)?;
    pool.volume = pool.volume.saturating_add(volume);
    pool.volume_usd += volume_usd;
    pool.liquidity_usd = (pool.liquidity_usd + delta_liquidity_usd).max(0.0);
    pool.delta_b = delta_b;
    pool.touch(block, timestamp);

    let (abs_volume, abs_volume_usd, abs_liquidity, abs_delta_b) =
        (pool.volume, pool.volume_usd, pool.liquidity_usd, pool.delta_b);

    for period in SnapshotPeriod::ALL {
        let snapshot = store.pool_snapshot_or_create(pool_id, period, timestamp)?;
        snapshot.volume = abs_volume;
        snapshot.volume_usd = abs_volume_usd;
        snapshot.liquidity_usd = abs_liquidity;
        snapshot.delta_b = abs_delta_b;
        snapshot.delta_volume = snapshot.delta_volume.saturating_add(volume);
        snapshot.delta_volume_usd += volume_usd;
        snapshot.delta_liquidity_usd += delta_liquidity_usd;
        snapshot.utilization = guarded_div(snapshot.delta_volume_usd, snapshot.liquidity_usd);
        snapshot.updated_at = timestamp;
    }
    Ok(())
}

/// Write a pool's recomputed price, returning the previous one for the
/// caller's cross check.
pub fn update_pool_price(
    store: &mut Store,
    pool_id: &str,
    block: u64,
    timestamp: u64,
    price: f64,
) -> Result<f64, EngineError> {
    let pool = store.pool_mut(pool_id)?;
    let old_price = pool.last_price;
    pool.last_price = price;
    pool.touch(block, timestamp);

    for period in SnapshotPeriod::ALL {
        let snapshot = store.pool_snapshot_or_create(pool_id, period, timestamp)?;
        snapshot.last_price = price;
        snapshot.updated_at = timestamp;
    }
    Ok(old_price)
}

/// Overwrite a pool's reserve array (sync-style events and service reads).
pub fn set_pool_reserves(
    store: &mut Store,
    pool_id: &str,
    reserves: Vec<u128>,
) -> Result<(), EngineError> {
    let pool = store.pool_mut(pool_id)?;
    pool.reserves = reserves;
    Ok(())
}

/// Store a pool's freshly computed time-weighted price and deltaB.
pub fn update_pool_twa(
    store: &mut Store,
    pool_id: &str,
    block: u64,
    timestamp: u64,
    twa_price: f64,
    twa_delta_b: i128,
) -> Result<(), EngineError> {
    let pool = store.pool_mut(pool_id)?;
    pool.twa_price = twa_price;
    pool.twa_delta_b = twa_delta_b;
    pool.touch(block, timestamp);
    Ok(())
}

// ============================================
// Aggregate Asset Rollups
// ============================================

/// Apply recomputed aggregate values plus this event's volume deltas to the
/// asset and its current snapshots. `liquidity_usd` and `delta_b` arrive as
/// recomputed totals (whitelist-aware), not deltas.
#[allow(clippy::too_many_arguments)]
pub fn update_asset_values(
    store: &mut Store,
    settings: &Settings,
    timestamp: u64,
    price: f64,
    volume: u128,
    volume_usd: f64,
    liquidity_usd: f64,
    delta_b: i128,
) {
    let decimals = settings.asset.decimals;
    let asset = store.asset_or_create(settings);
    let delta_liquidity_usd = liquidity_usd - asset.liquidity_usd;

    asset.volume = asset.volume.saturating_add(volume);
    asset.volume_usd += volume_usd;
    asset.liquidity_usd = liquidity_usd.max(0.0);
    asset.price = price;
    asset.delta_b = delta_b;
    asset.market_cap_usd = amount_to_f64(asset.supply, decimals) * price;
    asset.updated_at = chrono::DateTime::from_timestamp(timestamp as i64, 0);

    let (abs_supply, abs_market_cap, abs_volume, abs_volume_usd, abs_liquidity, abs_delta_b) = (
        asset.supply,
        asset.market_cap_usd,
        asset.volume,
        asset.volume_usd,
        asset.liquidity_usd,
        asset.delta_b,
    );

    for period in SnapshotPeriod::ALL {
        let snapshot = store.asset_snapshot_or_create(settings, period, timestamp);
        snapshot.supply = abs_supply;
        snapshot.market_cap_usd = abs_market_cap;
        snapshot.price = price;
        snapshot.volume = abs_volume;
        snapshot.volume_usd = abs_volume_usd;
        snapshot.liquidity_usd = abs_liquidity;
        snapshot.delta_b = abs_delta_b;
        snapshot.delta_volume = snapshot.delta_volume.saturating_add(volume);
        snapshot.delta_volume_usd += volume_usd;
        snapshot.delta_liquidity_usd += delta_liquidity_usd;
        snapshot.utilization = guarded_div(snapshot.delta_volume_usd, snapshot.liquidity_usd);
        snapshot.updated_at = timestamp;
    }
}

/// Mint or burn pegged-asset supply, maintaining marketCap = supply * price.
pub fn update_asset_supply(
    store: &mut Store,
    settings: &Settings,
    timestamp: u64,
    delta: i128,
) {
    let decimals = settings.asset.decimals;
    let asset = store.asset_or_create(settings);
    if delta >= 0 {
        asset.supply = asset.supply.saturating_add(delta as u128);
    } else {
        asset.supply = asset.supply.saturating_sub(delta.unsigned_abs());
    }
    asset.market_cap_usd = amount_to_f64(asset.supply, decimals) * asset.price;
    asset.updated_at = chrono::DateTime::from_timestamp(timestamp as i64, 0);

    let (abs_supply, abs_market_cap) = (asset.supply, asset.market_cap_usd);
    for period in SnapshotPeriod::ALL {
        let snapshot = store.asset_snapshot_or_create(settings, period, timestamp);
        snapshot.supply = abs_supply;
        snapshot.market_cap_usd = abs_market_cap;
        snapshot.updated_at = timestamp;
    }
}

/// Refresh the asset's time-weighted aggregates from whitelisted pools.
pub fn update_asset_twa(store: &mut Store, settings: &Settings, timestamp: u64) {
    let twa_price = crate::aggregate::weighted_twa_price(store);
    let twa_delta_b = crate::aggregate::total_twa_delta_b(store);
    let asset = store.asset_or_create(settings);
    asset.twa_price = twa_price;
    asset.twa_delta_b = twa_delta_b;
    asset.updated_at = chrono::DateTime::from_timestamp(timestamp as i64, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetSettings, PoolFamily, PoolSettings, ScanSettings, Settings};
    use crate::store::models::SnapshotPeriod;

    fn test_settings() -> Settings {
        Settings {
            asset: AssetSettings {
                token: "bean".to_string(),
                name: "Bean".to_string(),
                decimals: 6,
            },
            tokens: vec![],
            pools: vec![PoolSettings {
                id: "pool-a".to_string(),
                family: PoolFamily::ConstantProduct,
                tokens: vec!["bean".to_string(), "weth".to_string()],
                whitelisted: true,
                amplifier: 10_000,
                virtual_price: "1000000000000000000".to_string(),
                lp_supply: "0".to_string(),
            }],
            scan: ScanSettings::default(),
            replay: None,
        }
    }

    #[test]
    fn test_three_updates_accumulate_in_one_hourly_bucket() {
        let settings = test_settings();
        let mut store = Store::new();
        store.pool_or_create(&settings, "pool-a", 1, 7_200).unwrap();

        for (ts, volume, volume_usd) in
            [(7_200u64, 10_000_000u128, 10.0), (8_000, 20_000_000, 20.0), (10_700, 5_000_000, 5.0)]
        {
            update_pool_values(&mut store, "pool-a", 1, ts, volume, volume_usd, 100.0, 42)
                .unwrap();
        }

        let snapshot = store
            .pool_snapshot("pool-a", SnapshotPeriod::Hourly, 7_200)
            .unwrap();
        assert_eq!(snapshot.delta_volume, 35_000_000);
        assert_eq!(snapshot.delta_volume_usd, 35.0);
        assert_eq!(snapshot.delta_liquidity_usd, 300.0);
        assert_eq!(snapshot.volume, 35_000_000);
        assert_eq!(snapshot.liquidity_usd, 300.0);
        assert_eq!(snapshot.delta_b, 42);
        // utilization = deltaVolumeUSD / liquidityUSD
        assert!((snapshot.utilization - 35.0 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_hour_starts_fresh_deltas_but_keeps_totals() {
        let settings = test_settings();
        let mut store = Store::new();
        store.pool_or_create(&settings, "pool-a", 1, 7_200).unwrap();

        for ts in [7_200u64, 8_000, 10_700] {
            update_pool_values(&mut store, "pool-a", 1, ts, 10_000_000, 10.0, 100.0, 0).unwrap();
        }
        // Fourth update lands in the next hourly bucket
        update_pool_values(&mut store, "pool-a", 1, 11_000, 7_000_000, 7.0, 50.0, 0).unwrap();

        let next = store
            .pool_snapshot("pool-a", SnapshotPeriod::Hourly, 11_000)
            .unwrap();
        assert_eq!(next.delta_volume, 7_000_000);
        assert_eq!(next.delta_volume_usd, 7.0);
        assert_eq!(next.delta_liquidity_usd, 50.0);
        // Absolute totals keep accumulating across buckets
        assert_eq!(next.volume, 37_000_000);
        assert_eq!(next.liquidity_usd, 350.0);

        // All four land in the same daily bucket
        let daily = store
            .pool_snapshot("pool-a", SnapshotPeriod::Daily, 11_000)
            .unwrap();
        assert_eq!(daily.delta_volume, 37_000_000);
    }

    #[test]
    fn test_utilization_guarded_when_liquidity_zero() {
        let settings = test_settings();
        let mut store = Store::new();
        store.pool_or_create(&settings, "pool-a", 1, 100).unwrap();

        update_pool_values(&mut store, "pool-a", 1, 100, 1_000_000, 1.0, 0.0, 0).unwrap();
        let snapshot = store
            .pool_snapshot("pool-a", SnapshotPeriod::Hourly, 100)
            .unwrap();
        assert_eq!(snapshot.utilization, 0.0);
    }

    #[test]
    fn test_liquidity_never_negative() {
        let settings = test_settings();
        let mut store = Store::new();
        store.pool_or_create(&settings, "pool-a", 1, 100).unwrap();

        update_pool_values(&mut store, "pool-a", 1, 100, 0, 0.0, -500.0, 0).unwrap();
        assert_eq!(store.pool("pool-a").unwrap().liquidity_usd, 0.0);
    }

    #[test]
    fn test_market_cap_tracks_supply_and_price() {
        let settings = test_settings();
        let mut store = Store::new();

        update_asset_supply(&mut store, &settings, 100, 5_000_000_000_000); // 5M beans
        update_asset_values(&mut store, &settings, 100, 0.98, 0, 0.0, 1_000.0, 0);
        let asset = store.asset().unwrap();
        assert!((asset.market_cap_usd - 5_000_000.0 * 0.98).abs() < 1e-6);

        update_asset_supply(&mut store, &settings, 200, -1_000_000_000_000); // burn 1M
        let asset = store.asset().unwrap();
        assert!((asset.market_cap_usd - 4_000_000.0 * 0.98).abs() < 1e-6);
    }
}
