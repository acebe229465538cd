//! Product link resolver
//!
//! Holds the ordered parser list and picks the first parser that recognizes
//! a link. Resolution never fails outright: every outcome, including invalid
//! input and misbehaving parsers, comes back as a [`ParsedProduct`].

use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{Marketplace, ParsedProduct};
use crate::infrastructure::config::ParserConfig;
use crate::infrastructure::http_client::{HttpClient, PageFetcher};
use crate::infrastructure::parsing::{
    OpenGraphParser, OzonParser, ProductParser, WildberriesParser, YandexMarketParser,
};
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Error reported when no parser accepts a link
pub const UNPARSEABLE_LINK: &str = "unable to parse the link";

pub struct ProductResolver {
    parsers: Vec<Arc<dyn ProductParser>>,
}

impl ProductResolver {
    /// Marketplace parsers first, the generic Open Graph parser last
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ParserConfig) -> ParsingResult<Self> {
        let parsers: Vec<Arc<dyn ProductParser>> = vec![
            Arc::new(WildberriesParser::new(Arc::clone(&fetcher), config)?),
            Arc::new(OzonParser::new(Arc::clone(&fetcher))?),
            Arc::new(YandexMarketParser::new(Arc::clone(&fetcher))?),
            Arc::new(OpenGraphParser::new(fetcher)?),
        ];
        Ok(Self::with_parsers(parsers))
    }

    /// Resolver backed by a real HTTP client
    pub fn from_config(config: &ParserConfig) -> ParsingResult<Self> {
        config.validate()?;
        let client = HttpClient::from_parser_config(config)?;
        Self::new(Arc::new(client), config)
    }

    /// Resolver over a caller-chosen parser order
    pub fn with_parsers(parsers: Vec<Arc<dyn ProductParser>>) -> Self {
        debug!(
            "Product resolver ready with parsers: {:?}",
            parsers.iter().map(|p| p.marketplace().as_str()).collect::<Vec<_>>()
        );
        Self { parsers }
    }

    pub fn parsers(&self) -> &[Arc<dyn ProductParser>] {
        &self.parsers
    }

    /// Resolve one link into a normalized product record
    pub async fn resolve(&self, url: &str) -> ParsedProduct {
        let url = url.trim();
        if let Err(e) = validate_url(url) {
            warn!("Rejected link '{}': {}", url, e);
            return ParsedProduct::failure(Marketplace::Other, e.to_string());
        }

        for parser in &self.parsers {
            let marketplace = parser.marketplace();

            let recognized = panic::catch_unwind(AssertUnwindSafe(|| parser.can_parse(url)))
                .unwrap_or_else(|payload| {
                    warn!("💥 {} parser panicked recognizing {}: {}", marketplace, url, panic_message(&*payload));
                    false
                });
            if !recognized {
                continue;
            }

            debug!("{} parser accepted {}", marketplace, url);
            match AssertUnwindSafe(parser.retrieve(url)).catch_unwind().await {
                Ok(product) => {
                    if product.success {
                        info!("✅ Resolved {} via {}", url, marketplace);
                    } else {
                        info!(
                            "❌ {} parser could not resolve {}: {}",
                            marketplace,
                            url,
                            product.error.as_deref().unwrap_or_default()
                        );
                    }
                    return product;
                }
                Err(payload) => {
                    warn!(
                        "💥 {} parser panicked on {}: {}; trying the next parser",
                        marketplace,
                        url,
                        panic_message(&*payload)
                    );
                }
            }
        }

        warn!("No parser could handle {}", url);
        ParsedProduct::failure(Marketplace::Other, UNPARSEABLE_LINK)
    }

    /// Resolve links one after another, keeping input order
    pub async fn resolve_many<S: AsRef<str>>(&self, urls: &[S]) -> Vec<ParsedProduct> {
        let mut products = Vec::with_capacity(urls.len());
        for url in urls {
            products.push(self.resolve(url.as_ref()).await);
        }
        products
    }
}

/// Only absolute http(s) links are worth handing to a parser
fn validate_url(url: &str) -> ParsingResult<()> {
    if url.is_empty() {
        return Err(ParsingError::invalid_url(url, "the link is empty"));
    }

    let lowercase = url.to_ascii_lowercase();
    if !(lowercase.starts_with("http://") || lowercase.starts_with("https://")) {
        return Err(ParsingError::invalid_url(
            url,
            "the link must start with http:// or https://",
        ));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
