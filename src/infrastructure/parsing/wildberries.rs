//! Wildberries parser
//!
//! Product data comes from the public product-card API; image URLs are
//! derived from the article number alone, following the CDN's basket layout:
//! `https://basket-{NN}.{host}/vol{article/100000}/part{vol*100}/{article}/images/big/{n}.webp`.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ProductParser, compile_regex, url_path};
use crate::domain::{MAX_IMAGES, Marketplace, ProductDetails};
use crate::infrastructure::config::ParserConfig;
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Inclusive upper `vol` bound of each image basket
const BASKET_RANGES: [(u64, &str); 14] = [
    (143, "01"),
    (287, "02"),
    (431, "03"),
    (719, "04"),
    (1007, "05"),
    (1061, "06"),
    (1115, "07"),
    (1169, "08"),
    (1313, "09"),
    (1601, "10"),
    (1655, "11"),
    (1919, "12"),
    (2045, "13"),
    (2189, "14"),
];

/// Basket for volumes past the last bound
const LAST_BASKET: &str = "15";

/// Basket (image shard) code for a volume number
pub fn basket_number(vol: u64) -> &'static str {
    BASKET_RANGES
        .iter()
        .find(|(upper, _)| vol <= *upper)
        .map_or(LAST_BASKET, |(_, basket)| basket)
}

pub struct WildberriesParser {
    fetcher: Arc<dyn PageFetcher>,
    api_url: String,
    image_host: String,
    article_pattern: Regex,
}

impl WildberriesParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ParserConfig) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            api_url: config.wildberries_api_url.clone(),
            image_host: config.wildberries_image_host.clone(),
            article_pattern: compile_regex("wildberries_article", r"/catalog/(\d+)(?:/|$)")?,
        })
    }

    /// Article number from `/catalog/{article}/...`
    pub fn extract_article(&self, url: &str) -> Option<u64> {
        let path = url_path(url);
        self.article_pattern
            .captures(&path)
            .and_then(|captures| captures.get(1))
            .and_then(|article| article.as_str().parse().ok())
    }

    /// The five "big" image URLs of an article; no network access involved
    pub fn image_urls(&self, article: u64) -> Vec<String> {
        let vol = article / 100_000;
        let part = vol * 100;
        let basket = basket_number(vol);
        let base_url = format!(
            "https://basket-{basket}.{}/vol{vol}/part{part}/{article}/images/big/",
            self.image_host
        );

        (1..=MAX_IMAGES)
            .map(|n| format!("{base_url}{n}.webp"))
            .collect()
    }

    fn api_request_url(&self, article: u64) -> String {
        let separator = if self.api_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}nm={article}", self.api_url)
    }

    /// First product card of the API response
    async fn fetch_card(&self, article: u64) -> ParsingResult<Value> {
        let not_found = || ParsingError::ProductNotFound {
            marketplace: Marketplace::Wildberries,
            article: article.to_string(),
        };

        let response = self
            .fetcher
            .fetch_json(&self.api_request_url(article))
            .await
            .map_err(|e| {
                warn!("Wildberries API request failed for {}: {}", article, e);
                not_found()
            })?;

        response
            .pointer("/data/products/0")
            .filter(|card| card.is_object())
            .cloned()
            .ok_or_else(not_found)
    }
}

#[async_trait]
impl ProductParser for WildberriesParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Wildberries
    }

    fn can_parse(&self, url: &str) -> bool {
        url.contains("wildberries.ru") || url.contains("wb.ru")
    }

    async fn parse(&self, url: &str) -> ParsingResult<ProductDetails> {
        let article = self
            .extract_article(url)
            .ok_or_else(|| ParsingError::product_id_not_found(Marketplace::Wildberries, url))?;
        debug!("Wildberries article {} from {}", article, url);

        let images = self.image_urls(article);
        let card = self.fetch_card(article).await?;

        let name = text_field(&card, "name").ok_or_else(|| {
            ParsingError::required_field_missing("title", Some("wildberries product card"))
        })?;
        let title = match text_field(&card, "brand") {
            Some(brand) => format!("{brand} / {name}"),
            None => name,
        };

        // salePriceU is in kopecks
        let price = card
            .get("salePriceU")
            .and_then(Value::as_f64)
            .map(|kopecks| kopecks / 100.0)
            .filter(|price| *price > 0.0);

        Ok(ProductDetails::new(title)
            .with_price(price)
            .with_currency(Some("RUB".to_string()))
            .with_images(images))
    }
}

fn text_field(card: &Value, key: &str) -> Option<String> {
    card.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
