//! Wishlist product-link resolver
//!
//! Turns a product link from Wildberries, Ozon, Yandex Market or any shop that
//! publishes Open Graph / JSON-LD metadata into a normalized [`ParsedProduct`].
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use wishlist_parser::{ParserConfig, ProductResolver};
//!
//! let resolver = ProductResolver::from_config(&ParserConfig::default())?;
//! let product = resolver.resolve("https://www.wildberries.ru/catalog/123456789/detail.aspx").await;
//! println!("{}", serde_json::to_string_pretty(&product)?);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ProductResolver;
pub use domain::{Marketplace, ParsedProduct, ProductDetails};
pub use infrastructure::{AppConfig, ParserConfig, ParsingError, ParsingResult};
