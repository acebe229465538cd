//! Generic parser for any shop that describes its pages with standard tags
//!
//! Recognizes every link, so the resolver keeps it last.

use async_trait::async_trait;
use std::sync::Arc;

use super::ProductParser;
use super::markup::{MarkupInspector, MarkupSelectors};
use crate::domain::{Marketplace, ProductDetails};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

pub struct OpenGraphParser {
    fetcher: Arc<dyn PageFetcher>,
    selectors: MarkupSelectors,
}

impl OpenGraphParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            selectors: MarkupSelectors::new()?,
        })
    }

    pub fn extract_details(&self, html: &str) -> ParsingResult<ProductDetails> {
        let page = MarkupInspector::parse(html, &self.selectors);

        let title = page
            .title()
            .ok_or_else(|| ParsingError::required_field_missing("title", Some("product page")))?;

        Ok(ProductDetails::new(title)
            .with_description(page.description())
            .with_price(page.price())
            .with_currency(page.price_currency())
            .with_images(page.images()))
    }
}

#[async_trait]
impl ProductParser for OpenGraphParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Other
    }

    fn can_parse(&self, _url: &str) -> bool {
        true
    }

    async fn parse(&self, url: &str) -> ParsingResult<ProductDetails> {
        let html = self
            .fetcher
            .fetch_html(url)
            .await
            .map_err(|e| ParsingError::page_unavailable(url, &e))?;

        self.extract_details(&html)
    }
}
