//! Time-weighted-average oracle bookkeeping.
//!
//! - [`twa`] - per-pool cumulative accumulator state
//! - [`decode`] - fixed-point cumulative-reserve buffer decoding

pub mod decode;
pub mod twa;

pub use decode::decode_cumulative_reserves;
pub use twa::TwaOracle;
