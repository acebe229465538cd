//! Domain module - parsed product contract
//!
//! Types shared by every parser and returned to callers unchanged.

pub mod constants;
pub mod parsed_product;

pub use constants::{DEFAULT_CURRENCY, MAX_IMAGES};
pub use parsed_product::{Marketplace, ParsedProduct, ProductDetails, normalize_images};
