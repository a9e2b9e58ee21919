use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PoolSettings;

/// Snapshot bucket granularities. Bucket key = floor(timestamp / seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPeriod {
    Hourly,
    Daily,
}

impl SnapshotPeriod {
    pub fn seconds(&self) -> u64 {
        match self {
            SnapshotPeriod::Hourly => 3_600,
            SnapshotPeriod::Daily => 86_400,
        }
    }

    pub fn bucket(&self, timestamp: u64) -> u64 {
        timestamp / self.seconds()
    }

    pub const ALL: [SnapshotPeriod; 2] = [SnapshotPeriod::Hourly, SnapshotPeriod::Daily];
}

/// Current state of one liquidity pool backing the pegged asset.
///
/// Created lazily on first event referencing it, defaulted to zero/neutral
/// values. Reserves length always matches the token-set length; liquidity
/// and volume never go negative; deltaB may.
#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub id: String,
    pub tokens: Vec<String>,
    pub reserves: Vec<u128>,
    pub last_price: f64,
    pub liquidity_usd: f64,
    /// Cumulative trade volume in raw pegged-asset units.
    pub volume: u128,
    pub volume_usd: f64,
    pub delta_b: i128,
    pub twa_price: f64,
    pub twa_delta_b: i128,
    pub crosses: u32,
    pub last_cross_timestamp: u64,
    pub whitelisted: bool,
    pub block_number: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pool {
    pub fn new(settings: &PoolSettings, block: u64, timestamp: u64) -> Self {
        Self {
            id: settings.id.clone(),
            tokens: settings.tokens.clone(),
            reserves: vec![0; settings.tokens.len()],
            last_price: 0.0,
            liquidity_usd: 0.0,
            volume: 0,
            volume_usd: 0.0,
            delta_b: 0,
            twa_price: 0.0,
            twa_delta_b: 0,
            crosses: 0,
            last_cross_timestamp: 0,
            whitelisted: settings.whitelisted,
            block_number: block,
            created_at: DateTime::from_timestamp(timestamp as i64, 0),
            updated_at: None,
        }
    }

    /// Record the last event that touched this pool. Stale blocks (behind the
    /// pool's current block) leave the reference untouched.
    pub fn touch(&mut self, block: u64, timestamp: u64) {
        if block >= self.block_number {
            self.block_number = block;
            self.updated_at = DateTime::from_timestamp(timestamp as i64, 0);
        }
    }
}

/// Periodic rollup of one pool's state.
///
/// Absolute running totals are copied at creation and refreshed on every
/// update; delta-within-period fields accumulate across repeated updates in
/// the same bucket and reset only when a new bucket id is created.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    /// Composite id: "{pool}-{bucket}".
    pub id: String,
    pub pool: String,
    pub period: SnapshotPeriod,
    pub bucket: u64,

    // Absolute running totals
    pub reserves: Vec<u128>,
    pub last_price: f64,
    pub volume: u128,
    pub volume_usd: f64,
    pub liquidity_usd: f64,
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

impl PoolSnapshot {
    pub fn snapshot_id(pool: &str, period: SnapshotPeriod, timestamp: u64) -> String {
        format!("{pool}-{}", period.bucket(timestamp))
    }

    pub fn new(pool: &Pool, period: SnapshotPeriod, timestamp: u64) -> Self {
        Self {
            id: Self::snapshot_id(&pool.id, period, timestamp),
            pool: pool.id.clone(),
            period,
            bucket: period.bucket(timestamp),
            reserves: pool.reserves.clone(),
            last_price: pool.last_price,
            volume: pool.volume,
            volume_usd: pool.volume_usd,
            liquidity_usd: pool.liquidity_usd,
            delta_b: pool.delta_b,
            crosses: pool.crosses,
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
