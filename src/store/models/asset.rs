use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AssetSettings;
use crate::store::models::pool::SnapshotPeriod;

/// The aggregate pegged asset: totals rolled up only over currently
/// whitelisted pools. De-whitelisted pools keep their history but stop
/// contributing going forward.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub id: String,
    pub decimals: u8,
    /// Raw circulating supply.
    pub supply: u128,
    /// Invariant: marketCap = supply * price.
    pub market_cap_usd: f64,
    pub price: f64,
    pub liquidity_usd: f64,
    pub volume: u128,
    pub volume_usd: f64,
    pub delta_b: i128,
    pub twa_price: f64,
    pub twa_delta_b: i128,
    pub crosses: u32,
    pub last_cross_timestamp: u64,
    /// Pools currently contributing to the aggregate.
    pub pools: Vec<String>,
    pub dewhitelisted_pools: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Asset {
    pub fn new(settings: &AssetSettings) -> Self {
        Self {
            id: settings.token.clone(),
            decimals: settings.decimals,
            supply: 0,
            market_cap_usd: 0.0,
            price: 0.0,
            liquidity_usd: 0.0,
            volume: 0,
            volume_usd: 0.0,
            delta_b: 0,
            twa_price: 0.0,
            twa_delta_b: 0,
            crosses: 0,
            last_cross_timestamp: 0,
            pools: Vec::new(),
            dewhitelisted_pools: Vec::new(),
            updated_at: None,
        }
    }
}

/// Periodic rollup of the aggregate asset, same bucket semantics as the pool
/// snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct AssetSnapshot {
    /// Composite id: "{asset}-{bucket}".
    pub id: String,
    pub asset: String,
    pub period: SnapshotPeriod,
    pub bucket: u64,

    // Absolute running totals
    pub supply: u128,
    pub market_cap_usd: f64,
    pub price: f64,
    pub liquidity_usd: f64,
    pub volume: u128,
    pub volume_usd: f64,
    pub delta_b: i128,
    pub crosses: u32,

    // Deltas accrued within this bucket
    pub delta_volume: u128,
    pub delta_volume_usd: f64,
    pub delta_liquidity_usd: f64,
    pub delta_crosses: u32,
    pub utilization: f64,

    pub created_at: u64,
    pub updated_at: u64,
}

impl AssetSnapshot {
    pub fn snapshot_id(asset: &str, period: SnapshotPeriod, timestamp: u64) -> String {
        format!("{asset}-{}", period.bucket(timestamp))
    }

    pub fn new(asset: &Asset, period: SnapshotPeriod, timestamp: u64) -> Self {
        Self {
            id: Self::snapshot_id(&asset.id, period, timestamp),
            asset: asset.id.clone(),
            period,
            bucket: period.bucket(timestamp),
            supply: asset.supply,
            market_cap_usd: asset.market_cap_usd,
            price: asset.price,
            liquidity_usd: asset.liquidity_usd,
            volume: asset.volume,
            volume_usd: asset.volume_usd,
            delta_b: asset.delta_b,
            crosses: asset.crosses,
            delta_volume: 0,
            delta_volume_usd: 0.0,
            delta_liquidity_usd: 0.0,
            delta_crosses: 0,
            utilization: 0.0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
