pub mod adapters;
pub mod aggregate;
pub mod aggregator;
pub mod config;
pub mod cross;
pub mod error;
pub mod events;
pub mod oracle;
pub mod price;
pub mod scan;
pub mod solver;
pub mod store;
pub mod utils;
pub mod worker;

pub use config::Settings;
pub use error::EngineError;
pub use events::{EventKind, LedgerEvent, TwaPayload};
pub use price::{PriceService, PriceSnapshot, TablePriceService};
pub use scan::CrossBlocks;
pub use store::Store;
pub use worker::{Engine, EngineWorker};
