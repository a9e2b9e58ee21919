mod config;

pub use config::{
    AssetSettings, InvariantMeta, PoolFamily, PoolSettings, ReplaySettings, ScanSettings,
    Settings, TokenSettings,
};
