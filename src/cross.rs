//! Peg cross detection.
//!
//! A two-state machine per tracked entity (pool or aggregate): BELOW_PEG and
//! ABOVE_PEG, with the threshold inclusive on the above side (price >= 1.0 is
//! above). Transitions create an immutable cross record, bump the entity's
//! counter, and bump both absolute and delta-within-period counters on the
//! entity's current hourly/daily snapshots.
//!
//! Detection runs only when a caller invokes it after a recompute; it is not
//! wired to every ledger event.

use crate::config::Settings;
use crate::error::EngineError;
use crate::store::models::{CrossRecord, SnapshotPeriod};
use crate::store::Store;

/// The reference price the tracked asset is designed to hold.
pub const PEG: f64 = 1.0;

/// Classify a price transition: Some(true) crossed upward, Some(false)
/// crossed downward, None stayed on one side.
fn crossed(old_price: f64, new_price: f64) -> Option<bool> {
    if old_price < PEG && new_price >= PEG {
        Some(true)
    } else if old_price >= PEG && new_price < PEG {
        Some(false)
    } else {
        None
    }
}

/// Check one pool's price transition, recording a cross if it happened.
pub fn check_pool_cross(
    store: &mut Store,
    pool_id: &str,
    block: u64,
    timestamp: u64,
    old_price: f64,
    new_price: f64,
) -> Result<bool, EngineError> {
    let Some(above) = crossed(old_price, new_price) else {
        return Ok(false);
    };

    let pool = store.pool_mut(pool_id)?;
    let index = pool.crosses;
    let time_since_last_cross = if pool.last_cross_timestamp == 0 {
        0
    } else {
        timestamp.saturating_sub(pool.last_cross_timestamp)
    };
    pool.crosses += 1;
    pool.last_cross_timestamp = timestamp;
    let total_crosses = pool.crosses;

    store.insert_cross(CrossRecord {
        id: CrossRecord::record_id(pool_id, index),
        entity: pool_id.to_string(),
        index,
        price: new_price,
        block,
        timestamp,
        time_since_last_cross,
        above,
    });

    for period in SnapshotPeriod::ALL {
        let snapshot = store.pool_snapshot_or_create(pool_id, period, timestamp)?;
        snapshot.crosses = total_crosses;
        snapshot.delta_crosses += 1;
        snapshot.updated_at = timestamp;
    }
    Ok(true)
}

/// Check the aggregate asset's price transition.
pub fn check_asset_cross(
    store: &mut Store,
    settings: &Settings,
    block: u64,
    timestamp: u64,
    old_price: f64,
    new_price: f64,
) -> bool {
    let Some(above) = crossed(old_price, new_price) else {
        return false;
    };

    let asset = store.asset_or_create(settings);
    let asset_id = asset.id.clone();
    let index = asset.crosses;
    let time_since_last_cross = if asset.last_cross_timestamp == 0 {
        0
    } else {
        timestamp.saturating_sub(asset.last_cross_timestamp)
    };
    asset.crosses += 1;
    asset.last_cross_timestamp = timestamp;
    let total_crosses = asset.crosses;

    store.insert_cross(CrossRecord {
        id: CrossRecord::record_id(&asset_id, index),
        entity: asset_id,
        index,
        price: new_price,
        block,
        timestamp,
        time_since_last_cross,
        above,
    });

    for period in SnapshotPeriod::ALL {
        let snapshot = store.asset_snapshot_or_create(settings, period, timestamp);
        snapshot.crosses = total_crosses;
        snapshot.delta_crosses += 1;
        snapshot.updated_at = timestamp;
    }
    true
}
