use serde::Serialize;

/// A discrete record of the moment a tracked entity's price transitioned
/// across the peg threshold. Immutable once created; the index increments
/// per owning entity.
#[derive(Debug, Clone, Serialize)]
pub struct CrossRecord {
    /// Composite id: "{entity}-{index}".
    pub id: String,
    /// Owning pool id or aggregate asset id.
    pub entity: String,
    pub index: u32,
    /// Price observed at the cross.
    pub price: f64,
    pub block: u64,
    pub timestamp: u64,
    /// Seconds since the entity's previous cross; zero for the first cross.
    pub time_since_last_cross: u64,
    /// True when the price crossed upward through the peg.
    pub above: bool,
}

impl CrossRecord {
    pub fn record_id(entity: &str, index: u32) -> String {
        format!("{entity}-{index}")
    }
}
