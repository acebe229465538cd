//! Yandex Market product page parser

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::markup::{MarkupInspector, MarkupSelectors};
use super::{ProductParser, absolutize_image_url, compile_regex, url_path};
use crate::domain::{MAX_IMAGES, Marketplace, ProductDetails};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

pub struct YandexMarketParser {
    fetcher: Arc<dyn PageFetcher>,
    selectors: MarkupSelectors,
    product_id_pattern: Regex,
    script_price_pattern: Regex,
    avatar_image_pattern: Regex,
    image_size_pattern: Regex,
}

impl YandexMarketParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            selectors: MarkupSelectors::new()?,
            product_id_pattern: compile_regex("yandex_product_id", r"/product[/-](\d+)")?,
            script_price_pattern: compile_regex("yandex_script_price", r#""price["\s:]+(\d+)"#)?,
            avatar_image_pattern: compile_regex("yandex_avatar_image", r"(?i)avatars\.(mds\.)?yandex")?,
            image_size_pattern: compile_regex("yandex_image_size", r"/\d+x\d+/")?,
        })
    }

    pub fn extract_product_id(&self, url: &str) -> Option<String> {
        let path = url_path(url);
        self.product_id_pattern
            .captures(&path)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
    }

    pub fn extract_details(&self, html: &str) -> ParsingResult<ProductDetails> {
        let page = MarkupInspector::parse(html, &self.selectors);

        let title = page
            .json_ld_name()
            .or_else(|| page.meta_property("og:title"))
            .or_else(|| page.h1_text())
            .ok_or_else(|| {
                ParsingError::required_field_missing("title", Some("yandex market product page"))
            })?;

        Ok(ProductDetails::new(title)
            .with_description(page.meta_property("og:description"))
            .with_price(self.extract_price_value(&page))
            .with_currency(page.json_ld_currency())
            .with_images(self.extract_images(&page)))
    }

    /// JSON-LD offer, else the first `"price": N` inside an inline script
    fn extract_price_value(&self, page: &MarkupInspector<'_>) -> Option<f64> {
        page.json_ld_price().or_else(|| {
            page.inline_scripts()
                .filter(|script| script.contains("\"price\""))
                .find_map(|script| {
                    self.script_price_pattern
                        .captures(&script)
                        .and_then(|captures| captures.get(1))
                        .and_then(|digits| digits.as_str().parse::<f64>().ok())
                })
        })
    }

    /// og:image then avatar-CDN images, all rewritten to `800x800`
    fn extract_images(&self, page: &MarkupInspector<'_>) -> Vec<String> {
        let og_image = page.meta_property("og:image");
        let gallery = page
            .image_sources()
            .filter(|src| self.avatar_image_pattern.is_match(src))
            .take(MAX_IMAGES)
            .map(ToString::to_string);

        let mut images: Vec<String> = Vec::new();
        for src in og_image.into_iter().chain(gallery) {
            let url = absolutize_image_url(&self.image_size_pattern.replace(&src, "/800x800/"));
            if !images.contains(&url) {
                images.push(url);
            }
        }
        images
    }
}

#[async_trait]
impl ProductParser for YandexMarketParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::YandexMarket
    }

    fn can_parse(&self, url: &str) -> bool {
        url.contains("market.yandex.ru") && url.contains("/product/")
    }

    async fn parse(&self, url: &str) -> ParsingResult<ProductDetails> {
        let product_id = self
            .extract_product_id(url)
            .ok_or_else(|| ParsingError::product_id_not_found(Marketplace::YandexMarket, url))?;
        debug!("Yandex Market product {} from {}", product_id, url);

        let html = self
            .fetcher
            .fetch_html(url)
            .await
            .map_err(|e| ParsingError::page_unavailable(url, &e))?;

        self.extract_details(&html)
    }
}
