//! Ozon product page parser

use async_trait::async_trait;
use regex::Regex;
use scraper::Selector;
use std::sync::Arc;
use tracing::debug;

use super::markup::{MarkupInspector, MarkupSelectors, compile_selector, extract_price};
use super::{ProductParser, absolutize_image_url, compile_regex, url_path};
use crate::domain::{MAX_IMAGES, Marketplace, ProductDetails};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

pub struct OzonParser {
    fetcher: Arc<dyn PageFetcher>,
    selectors: MarkupSelectors,
    web_price: Selector,
    price_block: Selector,
    product_id_pattern: Regex,
    cdn_image_pattern: Regex,
    image_size_pattern: Regex,
}

impl OzonParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            selectors: MarkupSelectors::new()?,
            web_price: compile_selector(r#"[data-widget="webPrice"]"#)?,
            price_block: compile_selector(r#"div[class*="price"], div[class*="Price"]"#)?,
            product_id_pattern: compile_regex("ozon_product_id", r"-(\d+)/?$")?,
            cdn_image_pattern: compile_regex("ozon_cdn_image", r"(?i)cdn.*ozon")?,
            image_size_pattern: compile_regex("ozon_image_size", r"/wc\d+/")?,
        })
    }

    /// Trailing numeric id of `/product/{slug}-{id}/`
    pub fn extract_product_id(&self, url: &str) -> Option<String> {
        let path = url_path(url);
        self.product_id_pattern
            .captures(&path)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
    }

    /// Everything the page itself says about the product
    pub fn extract_details(&self, html: &str) -> ParsingResult<ProductDetails> {
        let page = MarkupInspector::parse(html, &self.selectors);

        let title = page
            .json_ld_name()
            .or_else(|| page.meta_property("og:title"))
            .or_else(|| page.h1_text())
            .ok_or_else(|| ParsingError::required_field_missing("title", Some("ozon product page")))?;

        Ok(ProductDetails::new(title)
            .with_description(page.meta_property("og:description"))
            .with_price(self.extract_price_value(&page))
            .with_currency(page.json_ld_currency())
            .with_images(self.extract_images(&page)))
    }

    /// JSON-LD offer → price meta → price widget → any price-looking block
    fn extract_price_value(&self, page: &MarkupInspector<'_>) -> Option<f64> {
        let positive = |price: &f64| *price > 0.0;

        page.json_ld_price()
            .filter(positive)
            .or_else(|| page.product_price_amount().and_then(|t| extract_price(&t)).filter(positive))
            .or_else(|| page.first_text(&self.web_price).and_then(|t| extract_price(&t)).filter(positive))
            .or_else(|| page.first_text(&self.price_block).and_then(|t| extract_price(&t)).filter(positive))
    }

    /// og:image first, then CDN gallery images upsized to `wc1000`
    fn extract_images(&self, page: &MarkupInspector<'_>) -> Vec<String> {
        let mut images: Vec<String> = page.meta_property("og:image").into_iter().collect();

        let gallery = page
            .image_sources()
            .filter(|src| self.cdn_image_pattern.is_match(src))
            .take(MAX_IMAGES)
            .map(|src| {
                let full_size = self.image_size_pattern.replace(src, "/wc1000/");
                absolutize_image_url(&full_size)
            });

        for url in gallery {
            if !images.contains(&url) {
                images.push(url);
            }
        }
        images
    }
}

#[async_trait]
impl ProductParser for OzonParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ozon
    }

    fn can_parse(&self, url: &str) -> bool {
        url.contains("ozon.ru") && url.contains("/product/")
    }

    async fn parse(&self, url: &str) -> ParsingResult<ProductDetails> {
        let product_id = self
            .extract_product_id(url)
            .ok_or_else(|| ParsingError::product_id_not_found(Marketplace::Ozon, url))?;
        debug!("Ozon product {} from {}", product_id, url);

        let html = self
            .fetcher
            .fetch_html(url)
            .await
            .map_err(|e| ParsingError::page_unavailable(url, &e))?;

        self.extract_details(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::Value;

    struct FixedPage(ParsingResult<String>);

    #[async_trait]
    impl PageFetcher for FixedPage {
        async fn fetch_html(&self, _url: &str) -> ParsingResult<String> {
            self.0.clone()
        }

        async fn fetch_json(&self, url: &str) -> ParsingResult<Value> {
            Err(ParsingError::EmptyResponse { url: url.to_string() })
        }
    }

    fn parser_with_page(page: ParsingResult<String>) -> OzonParser {
        OzonParser::new(Arc::new(FixedPage(page))).unwrap()
    }

    fn parser() -> OzonParser {
        parser_with_page(Ok(String::new()))
    }

    #[rstest]
    #[case("https://www.ozon.ru/product/smartfon-apple-iphone-15-1234567890/", Some("1234567890"))]
    #[case("https://www.ozon.ru/product/chaynik-987654?asb=abc&sh=1", Some("987654"))]
    #[case("https://ozon.ru/product/chaynik-987654/#reviews", Some("987654"))]
    #[case("https://www.ozon.ru/product/bez-nomera/", None)]
    fn test_extract_product_id(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(parser().extract_product_id(url).as_deref(), expected);
    }

    #[test]
    fn test_recognition_needs_product_path() {
        let parser = parser();
        assert!(parser.can_parse("https://www.ozon.ru/product/kettle-1/"));
        assert!(!parser.can_parse("https://www.ozon.ru/category/kettles/"));
        assert!(!parser.can_parse("https://market.yandex.ru/product/1"));
    }

    #[test]
    fn test_extract_details_from_json_ld() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Kettle">
            <meta property="og:description" content="Steel kettle, 1.7 l">
            <meta property="og:image" content="https://cdn1.ozone.ru/s3/multimedia-1/wc1000/main.jpg">
            <script type="application/ld+json">
                {"@type":"Product","name":"Kettle X","offers":{"price":"2999","priceCurrency":"RUB"}}
            </script>
        </head><body>
            <img src="https://cdn1.ozon.ru/s3/multimedia-2/wc50/thumb.jpg">
            <img src="//ir.ozone.ru/s3/multimedia-3/wc250/side.jpg">
            <img src="https://example.com/banner.png">
        </body></html>"#;

        let details = parser().extract_details(html).unwrap();
        assert_eq!(details.title, "Kettle X");
        assert_eq!(details.description.as_deref(), Some("Steel kettle, 1.7 l"));
        assert_eq!(details.price, Some(2999.0));
        assert_eq!(details.currency.as_deref(), Some("RUB"));
        assert_eq!(
            details.images,
            vec![
                "https://cdn1.ozone.ru/s3/multimedia-1/wc1000/main.jpg".to_string(),
                "https://cdn1.ozon.ru/s3/multimedia-2/wc1000/thumb.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_price_from_widget_text() {
        let html = r#"<html><body>
            <h1> Чайник  электрический </h1>
            <div data-widget="webPrice"><span>1 499 ₽</span></div>
        </body></html>"#;

        let details = parser().extract_details(html).unwrap();
        assert_eq!(details.title, "Чайник электрический");
        assert_eq!(details.price, Some(1499.0));
    }

    #[test]
    fn test_price_from_class_block() {
        let html = r#"<html><body><h1>Lamp</h1><div class="b-productPrice">2 090 ₽</div></body></html>"#;
        assert_eq!(parser().extract_details(html).unwrap().price, Some(2090.0));
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let html = "<html><body><p>captcha</p></body></html>";
        assert!(matches!(
            parser().extract_details(html),
            Err(ParsingError::RequiredFieldMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_unavailable_page() {
        let parser = parser_with_page(Err(ParsingError::HttpRequestFailed {
            status: 403,
            url: "https://www.ozon.ru/product/kettle-1/".to_string(),
        }));

        let err = parser.parse("https://www.ozon.ru/product/kettle-1/").await.unwrap_err();
        assert!(matches!(err, ParsingError::PageUnavailable { .. }));
        assert_eq!(err.to_string(), "failed to load the product page");
    }

    #[tokio::test]
    async fn test_missing_id_is_reported_before_fetching() {
        let parser = parser_with_page(Ok("<h1>Never read</h1>".to_string()));
        let err = parser.parse("https://www.ozon.ru/product/no-id/").await.unwrap_err();
        assert!(matches!(err, ParsingError::ProductIdNotFound { .. }));
    }
}
