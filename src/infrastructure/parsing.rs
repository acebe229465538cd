//! Product link parsing infrastructure
//!
//! One [`ProductParser`] per marketplace plus a generic Open Graph parser.
//! The resolver asks each parser in turn whether it recognizes a link and
//! lets the first one that does produce the result.

pub mod markup;
pub mod opengraph;
pub mod ozon;
pub mod wildberries;
pub mod yandex_market;

pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use markup::{MarkupInspector, MarkupSelectors, extract_price};
pub use opengraph::OpenGraphParser;
pub use ozon::OzonParser;
pub use wildberries::WildberriesParser;
pub use yandex_market::YandexMarketParser;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{Marketplace, ParsedProduct, ProductDetails};

/// A recognizer plus retriever for one kind of product link
#[async_trait]
pub trait ProductParser: Send + Sync {
    /// Tag stamped on every record this parser produces
    fn marketplace(&self) -> Marketplace;

    /// Cheap, pattern-only check; never performs I/O
    fn can_parse(&self, url: &str) -> bool;

    /// Extract product details, reporting why when it cannot
    async fn parse(&self, url: &str) -> ParsingResult<ProductDetails>;

    /// [`parse`](Self::parse) folded into the normalized record
    async fn retrieve(&self, url: &str) -> ParsedProduct {
        match self.parse(url).await {
            Ok(details) => {
                debug!("{} parser extracted '{}'", self.marketplace(), details.title);
                ParsedProduct::success(self.marketplace(), details)
            }
            Err(e) => {
                warn!(
                    recoverable = e.is_recoverable(),
                    "{} parser failed for {}: {}",
                    self.marketplace(),
                    url,
                    e
                );
                ParsedProduct::failure(self.marketplace(), e.to_string())
            }
        }
    }
}

/// Compile a parser's regex, reporting the pattern on failure
pub fn compile_regex(name: &str, pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ParsingError::configuration(name, &format!("invalid pattern '{pattern}': {e}")))
}

/// Path component of a link; query and fragment are never part of a product id
pub fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Protocol-relative image sources (`//cdn...`) become https URLs
pub fn absolutize_image_url(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_path_drops_query_and_fragment() {
        assert_eq!(
            url_path("https://www.ozon.ru/product/kettle-123456/?asb=1#reviews"),
            "/product/kettle-123456/"
        );
        assert_eq!(url_path("not a url?x=1"), "not a url");
    }

    #[test]
    fn test_absolutize_image_url() {
        assert_eq!(
            absolutize_image_url("//avatars.mds.yandex.net/a/1/orig"),
            "https://avatars.mds.yandex.net/a/1/orig"
        );
        assert_eq!(absolutize_image_url("https://x/1.jpg"), "https://x/1.jpg");
    }

    #[test]
    fn test_compile_regex_reports_bad_pattern() {
        assert!(compile_regex("broken", "(").is_err());
        assert!(compile_regex("digits", r"\d+").is_ok());
    }
}
