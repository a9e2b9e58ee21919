//! In-memory entity repository.
//!
//! Replaces the host's lazy load-or-create entity layer with an explicit
//! repository exposing get-or-insert keyed by id. Every derived entity is
//! addressable by a stable id for the downstream query layer: pool/asset ids,
//! composite "id-bucket" snapshot ids, and "entity-index" cross ids.

pub mod models;

use rustc_hash::FxHashMap;

use crate::config::Settings;
use crate::error::EngineError;
use crate::oracle::TwaOracle;
use models::{Asset, AssetSnapshot, CrossRecord, Pool, PoolSnapshot, SnapshotPeriod, Token};

#[derive(Debug, Default)]
pub struct Store {
    tokens: FxHashMap<String, Token>,
    pools: FxHashMap<String, Pool>,
    asset: Option<Asset>,
    pool_hourly: FxHashMap<String, PoolSnapshot>,
    pool_daily: FxHashMap<String, PoolSnapshot>,
    asset_hourly: FxHashMap<String, AssetSnapshot>,
    asset_daily: FxHashMap<String, AssetSnapshot>,
    crosses: FxHashMap<String, CrossRecord>,
    twa: FxHashMap<String, TwaOracle>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Tokens
    // ============================================

    /// Get or create a token by id. Tokens must be configured (or be the
    /// pegged asset itself); anything else is a configuration defect.
    pub fn token_or_create(
        &mut self,
        settings: &Settings,
        id: &str,
    ) -> Result<&mut Token, EngineError> {
        if !self.tokens.contains_key(id) {
            let token = if id == settings.asset.token {
                Token::from_asset(&settings.asset)
            } else {
                let cfg = settings
                    .token(id)
                    .ok_or_else(|| EngineError::UnknownToken(id.to_string()))?;
                Token::from_settings(cfg)
            };
            self.tokens.insert(id.to_string(), token);
        }
        self.tokens
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownToken(id.to_string()))
    }

    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.get(id)
    }

    /// Resolve a token's USD price: live entity state first, then the
    /// configured seed price.
    pub fn token_price(&self, settings: &Settings, id: &str) -> Result<f64, EngineError> {
        if let Some(token) = self.tokens.get(id) {
            return Ok(token.last_price_usd);
        }
        settings
            .token(id)
            .map(|t| t.price_usd)
            .ok_or_else(|| EngineError::UnknownToken(id.to_string()))
    }

    // ============================================
    // Pools
    // ============================================

    /// Get or create a pool by id, registering whitelisted pools on the
    /// aggregate asset as the original load path does.
    pub fn pool_or_create(
        &mut self,
        settings: &Settings,
        id: &str,
        block: u64,
        timestamp: u64,
    ) -> Result<&mut Pool, EngineError> {
        if !self.pools.contains_key(id) {
            let cfg = settings
                .pool(id)
                .ok_or_else(|| EngineError::UnknownPool(id.to_string()))?;
            let pool = Pool::new(cfg, block, timestamp);

            let asset = self.asset_or_create(settings);
            if pool.whitelisted {
                asset.pools.push(id.to_string());
            } else {
                asset.dewhitelisted_pools.push(id.to_string());
            }

            self.pools.insert(id.to_string(), pool);
        }
        self.pools
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownPool(id.to_string()))
    }

    pub fn pool(&self, id: &str) -> Option<&Pool> {
        self.pools.get(id)
    }

    pub fn pool_mut(&mut self, id: &str) -> Result<&mut Pool, EngineError> {
        self.pools
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownPool(id.to_string()))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    // ============================================
    // Aggregate Asset
    // ============================================

    pub fn asset_or_create(&mut self, settings: &Settings) -> &mut Asset {
        self.asset.get_or_insert_with(|| Asset::new(&settings.asset))
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    // ============================================
    // Snapshots
    // ============================================

    fn pool_snapshots(&self, period: SnapshotPeriod) -> &FxHashMap<String, PoolSnapshot> {
        match period {
            SnapshotPeriod::Hourly => &self.pool_hourly,
            SnapshotPeriod::Daily => &self.pool_daily,
        }
    }

    fn pool_snapshots_mut(
        &mut self,
        period: SnapshotPeriod,
    ) -> &mut FxHashMap<String, PoolSnapshot> {
        match period {
            SnapshotPeriod::Hourly => &mut self.pool_hourly,
            SnapshotPeriod::Daily => &mut self.pool_daily,
        }
    }

    /// Get or create the pool snapshot covering `timestamp`. New buckets copy
    /// the pool's absolute totals and start with zeroed delta fields.
    pub fn pool_snapshot_or_create(
        &mut self,
        pool_id: &str,
        period: SnapshotPeriod,
        timestamp: u64,
    ) -> Result<&mut PoolSnapshot, EngineError> {
        let seed = {
            let pool = self
                .pools
                .get(pool_id)
                .ok_or_else(|| EngineError::UnknownPool(pool_id.to_string()))?;
            PoolSnapshot::new(pool, period, timestamp)
        };
        let key = seed.id.clone();
        Ok(self.pool_snapshots_mut(period).entry(key).or_insert(seed))
    }

    pub fn pool_snapshot(
        &self,
        pool_id: &str,
        period: SnapshotPeriod,
        timestamp: u64,
    ) -> Option<&PoolSnapshot> {
        self.pool_snapshots(period)
            .get(&PoolSnapshot::snapshot_id(pool_id, period, timestamp))
    }

    fn asset_snapshots_mut(
        &mut self,
        period: SnapshotPeriod,
    ) -> &mut FxHashMap<String, AssetSnapshot> {
        match period {
            SnapshotPeriod::Hourly => &mut self.asset_hourly,
            SnapshotPeriod::Daily => &mut self.asset_daily,
        }
    }

    pub fn asset_snapshot_or_create(
        &mut self,
        settings: &Settings,
        period: SnapshotPeriod,
        timestamp: u64,
    ) -> &mut AssetSnapshot {
        let seed = AssetSnapshot::new(self.asset_or_create(settings), period, timestamp);
        let key = seed.id.clone();
        self.asset_snapshots_mut(period).entry(key).or_insert(seed)
    }

    pub fn asset_snapshot(
        &self,
        asset_id: &str,
        period: SnapshotPeriod,
        timestamp: u64,
    ) -> Option<&AssetSnapshot> {
        let key = AssetSnapshot::snapshot_id(asset_id, period, timestamp);
        match period {
            SnapshotPeriod::Hourly => self.asset_hourly.get(&key),
            SnapshotPeriod::Daily => self.asset_daily.get(&key),
        }
    }

    // ============================================
    // Cross Records
    // ============================================

    /// Insert an immutable cross record. Ids never collide because the index
    /// is scoped to the owning entity's monotonically increasing counter.
    pub fn insert_cross(&mut self, record: CrossRecord) {
        self.crosses.insert(record.id.clone(), record);
    }

    pub fn cross(&self, id: &str) -> Option<&CrossRecord> {
        self.crosses.get(id)
    }

    /// All cross records for one entity, ordered by index.
    pub fn crosses_for(&self, entity: &str) -> Vec<&CrossRecord> {
        let mut records: Vec<&CrossRecord> =
            self.crosses.values().filter(|c| c.entity == entity).collect();
        records.sort_by_key(|c| c.index);
        records
    }

    // ============================================
    // TWA Oracles
    // ============================================

    pub fn twa_or_create(&mut self, pool_id: &str, reserve_count: usize) -> &mut TwaOracle {
        self.twa
            .entry(pool_id.to_string())
            .or_insert_with(|| TwaOracle::new(pool_id.to_string(), reserve_count))
    }

    pub fn twa(&self, pool_id: &str) -> Option<&TwaOracle> {
        self.twa.get(pool_id)
    }
}
