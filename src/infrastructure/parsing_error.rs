//! Error types for product link parsing
//!
//! The `Display` text of every variant is what ends up in
//! `ParsedProduct::error`, so messages are written for end users.

use thiserror::Error;

use crate::domain::Marketplace;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not extract the {marketplace} product id from the link")]
    ProductIdNotFound { marketplace: Marketplace, url: String },

    #[error("failed to load the product page")]
    PageUnavailable { url: String, reason: String },

    #[error("HTTP request failed: {status} - {url}")]
    HttpRequestFailed { status: u16, url: String },

    #[error("network error while fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("empty response from {url}")]
    EmptyResponse { url: String },

    #[error("invalid JSON from {url}: {message}")]
    InvalidJson { url: String, message: String },

    #[error(
        "product {article} was not found on {marketplace}; it may have been removed or the link is wrong"
    )]
    ProductNotFound {
        marketplace: Marketplace,
        article: String,
    },

    #[error("could not extract product information: '{field}' not found")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String, field: String },
}

impl ParsingError {
    pub fn invalid_url(url: &str, reason: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn product_id_not_found(marketplace: Marketplace, url: &str) -> Self {
        Self::ProductIdNotFound {
            marketplace,
            url: url.to_string(),
        }
    }

    /// Wraps a fetch error for a page the parser cannot do without
    pub fn page_unavailable(url: &str, cause: &Self) -> Self {
        Self::PageUnavailable {
            url: url.to_string(),
            reason: cause.to_string(),
        }
    }

    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn configuration(field: &str, message: &str) -> Self {
        Self::ConfigurationError {
            message: message.to_string(),
            field: field.to_string(),
        }
    }

    /// Whether trying the same URL again later could succeed
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::PageUnavailable { .. }
            | Self::Network { .. }
            | Self::EmptyResponse { .. }
            | Self::ProductNotFound { .. } => true,
            Self::HttpRequestFailed { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl { .. }
            | Self::ProductIdNotFound { .. }
            | Self::InvalidJson { .. }
            | Self::RequiredFieldMissing { .. }
            | Self::InvalidSelector { .. }
            | Self::ConfigurationError { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
