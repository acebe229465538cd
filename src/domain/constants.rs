//! Fixed values of the parsed-product contract

/// Currency reported when the source does not name one
pub const DEFAULT_CURRENCY: &str = "RUB";

/// Upper bound of `ParsedProduct::images`
pub const MAX_IMAGES: usize = 5;
