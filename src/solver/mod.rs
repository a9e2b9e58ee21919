//! Pure invariant-solver routines.
//!
//! - [`constant_product`] - x*y=k pricing and deltaB with a verified integer sqrt
//! - [`stableswap`] - D/Y Newton iterations and fixed-point price extraction

pub mod constant_product;
pub mod stableswap;

pub use constant_product::{constant_product_delta_b, constant_product_price};
pub use stableswap::{get_d, get_y, price_from_y, A_PRECISION, N_COINS};
