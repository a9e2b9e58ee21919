use serde::Serialize;

use crate::config::{AssetSettings, TokenSettings};

/// A token referenced by at least one pool. Created on first reference,
/// mutated by price updates, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub id: String,
    pub name: String,
    pub decimals: u8,
    pub last_price_usd: f64,
}

impl Token {
    pub fn from_settings(settings: &TokenSettings) -> Self {
        Self {
            id: settings.id.clone(),
            name: settings.name.clone(),
            decimals: settings.decimals,
            last_price_usd: settings.price_usd,
        }
    }

    /// The pegged asset itself, tracked like any other token. Its USD price
    /// is derived state, so it seeds at zero.
    pub fn from_asset(asset: &AssetSettings) -> Self {
        Self {
            id: asset.token.clone(),
            name: asset.name.clone(),
            decimals: asset.decimals,
            last_price_usd: 0.0,
        }
    }
}
