//! External price service interface.
//!
//! Pump-backed pools delegate pricing to an external collaborator because the
//! underlying pricing function is pluggable. The call is synchronous and
//! fallible: a revert is an expected condition (pool too new, contract
//! paused) and maps to the recoverable error class.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Per-pool result row from the price service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPriceData {
    pub pool: String,
    pub tokens: Vec<String>,
    pub balances: Vec<u128>,
    pub price: f64,
    pub liquidity_usd: f64,
    pub delta_b: i128,
}

/// Fully-populated price service response for one block.
///
/// The overall fields describe the service's own view of the aggregate; the
/// engine accepts them on the wire but recomputes the aggregate from
/// whitelisted pools, which keeps whitelist rules authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub price: f64,
    pub liquidity_usd: f64,
    pub delta_b: i128,
    pub pools: Vec<PoolPriceData>,
}

/// Synchronous, blocking price lookup keyed by block number.
pub trait PriceService: Send {
    /// Full snapshot for a block, or a revert signal.
    fn snapshot(&self, block: u64) -> Result<PriceSnapshot, EngineError>;

    /// Single-pool lookup. Pools absent from the snapshot revert, which
    /// covers unavailability shortly after a pool's first deployment.
    fn pool(&self, pool_id: &str, block: u64) -> Result<PoolPriceData, EngineError> {
        let snapshot = self.snapshot(block)?;
        snapshot
            .pools
            .into_iter()
            .find(|p| p.pool == pool_id)
            .ok_or(EngineError::PriceRevert { block })
    }
}

/// Table-backed price service: a static map from block number to snapshot.
///
/// Blocks absent from the table revert, mirroring how the live collaborator
/// behaves when it cannot serve a query.
#[derive(Debug, Default)]
pub struct TablePriceService {
    rows: FxHashMap<u64, PriceSnapshot>,
}

/// One row of the JSON table file.
#[derive(Debug, Deserialize)]
struct TableRow {
    block: u64,
    snapshot: PriceSnapshot,
}

impl TablePriceService {
    pub fn new(rows: impl IntoIterator<Item = (u64, PriceSnapshot)>) -> Self {
        Self { rows: rows.into_iter().collect() }
    }

    /// Parse a JSON array of `{block, snapshot}` rows.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let rows: Vec<TableRow> = serde_json::from_str(json)?;
        Ok(Self::new(rows.into_iter().map(|r| (r.block, r.snapshot))))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl PriceService for TablePriceService {
    fn snapshot(&self, block: u64) -> Result<PriceSnapshot, EngineError> {
        self.rows
            .get(&block)
            .cloned()
            .ok_or(EngineError::PriceRevert { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> PriceSnapshot {
        PriceSnapshot {
            price: 1.01,
            liquidity_usd: 2_000_000.0,
            delta_b: 12_000_000,
            pools: vec![PoolPriceData {
                pool: "bean-weth-pump".to_string(),
                tokens: vec!["bean".to_string(), "weth".to_string()],
                balances: vec![1_000_000_000_000, 500_000_000_000_000_000_000],
                price: 1.01,
                liquidity_usd: 2_000_000.0,
                delta_b: 12_000_000,
            }],
        }
    }

    #[test]
    fn test_missing_block_reverts() {
        let service = TablePriceService::default();
        assert!(matches!(
            service.snapshot(100),
            Err(EngineError::PriceRevert { block: 100 })
        ));
    }

    #[test]
    fn test_pool_lookup_finds_row() {
        let service = TablePriceService::new([(100, sample_snapshot())]);
        let data = service.pool("bean-weth-pump", 100).unwrap();
        assert_eq!(data.delta_b, 12_000_000);
    }

    #[test]
    fn test_unknown_pool_reverts() {
        let service = TablePriceService::new([(100, sample_snapshot())]);
        assert!(matches!(
            service.pool("brand-new-pool", 100),
            Err(EngineError::PriceRevert { block: 100 })
        ));
    }

    #[test]
    fn test_from_json_table() {
        let json = r#"[{"block": 7, "snapshot": {"price": 0.99, "liquidity_usd": 1.0, "delta_b": -5, "pools": []}}]"#;
        let service = TablePriceService::from_json(json).unwrap();
        assert_eq!(service.len(), 1);
        assert_eq!(service.snapshot(7).unwrap().delta_b, -5);
    }
}
