//! Per-pool time-weighted-average oracle state.
//!
//! Each pool owns a cumulative reserve accumulator and the timestamp of the
//! last reading. A time-weighted reserve is the difference between two
//! cumulative samples divided by the elapsed seconds between them.

use serde::Serialize;

/// Neutral reserve returned before the oracle has two samples to difference.
const NEUTRAL_RESERVE: u128 = 1;

/// Cumulative-accumulator bookkeeping for one pool.
///
/// `last_updated == 0` is the uninitialized state, distinct from "has one
/// sample": the first reading only records a baseline and cannot yet produce
/// a rate.
#[derive(Debug, Clone, Serialize)]
pub struct TwaOracle {
    pub pool: String,
    pub cumulative_last: Vec<u128>,
    pub last_reserves: Vec<u128>,
    pub last_updated: u64,
}

impl TwaOracle {
    pub fn new(pool: String, reserve_count: usize) -> Self {
        Self {
            pool,
            cumulative_last: vec![0; reserve_count],
            last_reserves: vec![0; reserve_count],
            last_updated: 0,
        }
    }

    /// Produce time-weighted reserves from a new cumulative sample.
    ///
    /// On the first call (uninitialized oracle) the cumulative baseline and
    /// timestamp are stored and a neutral placeholder of 1 per reserve is
    /// returned; elapsed time is never zero in the divide. On subsequent
    /// calls the TWA is `(newCumulative - storedCumulative) / elapsed`, and
    /// the stored baseline is overwritten as a side effect.
    ///
    /// This call is NOT idempotent: invoking it twice for the same timestamp
    /// corrupts the next reading's elapsed-time base. Callers must invoke it
    /// at most once per distinct timestamp per pool.
    pub fn twa_reserves(&mut self, cumulative: &[u128], timestamp: u64) -> Vec<u128> {
        if self.last_updated == 0 || timestamp <= self.last_updated {
            self.cumulative_last = cumulative.to_vec();
            self.last_updated = timestamp;
            return vec![NEUTRAL_RESERVE; cumulative.len()];
        }

        let elapsed = (timestamp - self.last_updated) as u128;
        let twa = cumulative
            .iter()
            .zip(self.cumulative_last.iter())
            .map(|(new, old)| new.saturating_sub(*old) / elapsed)
            .collect();

        self.cumulative_last = cumulative.to_vec();
        self.last_updated = timestamp;
        twa
    }

    /// Manually grow the accumulator for pools that do not expose a running
    /// cumulative counter: `cumulativeLast + currentReserve * elapsedSeconds`.
    ///
    /// Returns the grown cumulative without committing it; the subsequent
    /// [`TwaOracle::twa_reserves`] call performs the store.
    pub fn accumulate(&mut self, reserves: &[u128], timestamp: u64) -> Vec<u128> {
        let elapsed = if self.last_updated == 0 {
            0
        } else {
            (timestamp.saturating_sub(self.last_updated)) as u128
        };

        let cumulative = self
            .cumulative_last
            .iter()
            .zip(reserves.iter())
            .map(|(cum, reserve)| cum.saturating_add(reserve.saturating_mul(elapsed)))
            .collect();

        self.last_reserves = reserves.to_vec();
        cumulative
    }
}
