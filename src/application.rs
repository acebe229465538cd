//! Application layer - link resolution use case

pub mod product_resolver;

pub use product_resolver::ProductResolver;
