//! Inbound ledger event records.
//!
//! Events arrive strictly ordered by (block, log index) from the host's
//! delivery mechanism. Each record carries the block context plus one payload
//! shape; the worker applies them one at a time, to completion.

use serde::{Deserialize, Serialize};

/// One ordered record from the ledger event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub block: u64,
    pub timestamp: u64,
    pub kind: EventKind,
}

/// Payload shapes for the inbound stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A trade against a pool. `to_token` identifies the side the trader
    /// received.
    Swap {
        pool: String,
        to_token: String,
        amount_in: u128,
        amount_out: u128,
    },
    /// Add/remove liquidity, as signed per-token reserve deltas (additions
    /// positive, removals negative).
    LiquidityChange { pool: String, amounts: Vec<i128> },
    /// Explicit reserve array replacing the pool's current reserves.
    ReserveSync { pool: String, reserves: Vec<u128> },
    /// A time-weighted-average oracle reading for one pool.
    TwaUpdate { pool: String, payload: TwaPayload },
    /// Periodic notification with no payload beyond block/timestamp. Gated
    /// by the block scan optimizer before reaching the recompute pipeline.
    Tick,
    /// Mint (positive) or burn (negative) of the pegged asset's supply.
    SupplyChange { delta: i128 },
    /// USD price update for a non-pegged token.
    PriceUpdate { token: String, price_usd: f64 },
    /// Remove a pool from the aggregate whitelist going forward. Historical
    /// data for the pool is retained.
    Dewhitelist { pool: String },
}

/// Shapes a TWA reading can take, depending on what the pool exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwaPayload {
    /// The pool's own running cumulative counters.
    Cumulative(Vec<u128>),
    /// Plain current reserves; the oracle accumulates manually.
    Reserves(Vec<u128>),
    /// Opaque fixed-point buffer of cumulative reserves (pump-backed pools).
    Encoded(#[serde(with = "hex::serde")] Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trips_through_json() {
        let event = LedgerEvent {
            block: 18_000_000,
            timestamp: 1_700_000_000,
            kind: EventKind::Swap {
                pool: "bean-weth-cp".to_string(),
                to_token: "weth".to_string(),
                amount_in: 10_000_000_000,
                amount_out: 4_950_495_049_504_950_495,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        match back.kind {
            EventKind::Swap { amount_out, .. } => {
                assert_eq!(amount_out, 4_950_495_049_504_950_495)
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_encoded_twa_payload_uses_hex() {
        let event = LedgerEvent {
            block: 1,
            timestamp: 2,
            kind: EventKind::TwaUpdate {
                pool: "p".to_string(),
                payload: TwaPayload::Encoded(vec![0xde, 0xad, 0xbe, 0xef]),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("deadbeef"));
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        match back.kind {
            EventKind::TwaUpdate { payload: TwaPayload::Encoded(bytes), .. } => {
                assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef])
            }
            _ => panic!("wrong variant"),
        }
    }
}
