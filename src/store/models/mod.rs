pub mod asset;
pub mod cross;
pub mod pool;
pub mod token;

pub use asset::{Asset, AssetSnapshot};
pub use cross::CrossRecord;
pub use pool::{Pool, PoolSnapshot, SnapshotPeriod};
pub use token::Token;
