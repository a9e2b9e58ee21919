use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The pegged asset the engine tracks.
#[derive(Debug, Deserialize, Clone)]
pub struct AssetSettings {
    /// Token id of the pegged asset.
    pub token: String,
    pub name: String,
    #[serde(default = "default_asset_decimals")]
    pub decimals: u8,
}

fn default_asset_decimals() -> u8 {
    6
}

/// A non-pegged token referenced by one or more pools.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenSettings {
    pub id: String,
    pub name: String,
    pub decimals: u8,
    /// Seed USD price, used until a price update event arrives.
    #[serde(default)]
    pub price_usd: f64,
}

/// Pool families the adapters know how to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolFamily {
    ConstantProduct,
    StableSwap,
    PumpBacked,
}

/// Static per-pool configuration. Pools are still created lazily in the
/// store on first event, but family, token set, and invariant metadata come
/// from here; an event referencing an id absent from this registry is a
/// configuration defect.
#[derive(Debug, Deserialize, Clone)]
pub struct PoolSettings {
    pub id: String,
    pub family: PoolFamily,
    /// Constituent tokens in pool order. Must contain the pegged asset.
    pub tokens: Vec<String>,
    #[serde(default = "default_whitelisted")]
    pub whitelisted: bool,
    /// Precise amplification coefficient (A * A_PRECISION), StableSwap only.
    #[serde(default = "default_amplifier")]
    pub amplifier: u64,
    /// LP virtual price as an 1e18 fixed-point decimal string.
    #[serde(default = "default_virtual_price")]
    pub virtual_price: String,
    /// LP token supply as a raw 18-decimal string.
    #[serde(default = "default_lp_supply")]
    pub lp_supply: String,
}

fn default_whitelisted() -> bool {
    true
}

fn default_amplifier() -> u64 {
    10_000
}

fn default_virtual_price() -> String {
    "1000000000000000000".to_string()
}

fn default_lp_supply() -> String {
    "0".to_string()
}

/// Parsed invariant metadata for a StableSwap pool, resolved once at startup.
#[derive(Debug, Clone)]
pub struct InvariantMeta {
    pub amplifier: u64,
    pub virtual_price: u128,
    pub lp_supply: u128,
}

impl PoolSettings {
    pub fn invariant_meta(&self) -> Result<InvariantMeta, EngineError> {
        let virtual_price = self.virtual_price.parse().map_err(|_| EngineError::BadPoolConfig {
            pool: self.id.clone(),
            reason: format!("invalid virtual_price {:?}", self.virtual_price),
        })?;
        let lp_supply = self.lp_supply.parse().map_err(|_| EngineError::BadPoolConfig {
            pool: self.id.clone(),
            reason: format!("invalid lp_supply {:?}", self.lp_supply),
        })?;
        Ok(InvariantMeta { amplifier: self.amplifier, virtual_price, lp_supply })
    }
}

/// Block scan optimizer inputs: blocks known (from an out-of-band backfill)
/// to contain at least one peg cross.
///
/// Consistency of this list with live history is an operational precondition;
/// the engine does not verify it. A stale list silently skips genuine crosses.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScanSettings {
    #[serde(default)]
    pub cross_blocks: Vec<u64>,
}

/// Event replay inputs for the binary.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySettings {
    /// JSON Lines file of ordered LedgerEvent records.
    pub events_path: String,
    /// Optional JSON table backing the price service (block -> snapshot).
    #[serde(default)]
    pub price_table_path: Option<String>,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub asset: AssetSettings,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
    pub pools: Vec<PoolSettings>,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub replay: Option<ReplaySettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    pub fn pool(&self, id: &str) -> Option<&PoolSettings> {
        self.pools.iter().find(|p| p.id == id)
    }

    pub fn token(&self, id: &str) -> Option<&TokenSettings> {
        self.tokens.iter().find(|t| t.id == id)
    }
}
