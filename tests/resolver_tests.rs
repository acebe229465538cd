//! End-to-end resolution scenarios over an in-memory fetcher

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use wishlist_parser::domain::ProductDetails;
use wishlist_parser::infrastructure::parsing::{OpenGraphParser, WildberriesParser};
use wishlist_parser::infrastructure::{PageFetcher, ProductParser};
use wishlist_parser::{Marketplace, ParserConfig, ParsingError, ParsingResult, ProductResolver};

const WB_URL: &str = "https://www.wildberries.ru/catalog/123456789/detail.aspx";
const WB_API_URL: &str = "https://card.wb.ru/cards/v2/detail?nm=123456789";
const OZON_URL: &str = "https://www.ozon.ru/product/chaynik-elektricheskiy-987654/";
const YANDEX_URL: &str = "https://market.yandex.ru/product/1779416112/";
const SHOP_URL: &str = "https://shop.example/lamp";

/// Serves canned responses and counts every request
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    json: HashMap<String, Value>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    fn with_json(mut self, url: &str, body: Value) -> Self {
        self.json.insert(url.to_string(), body);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_html(&self, url: &str) -> ParsingResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(url).cloned().ok_or_else(|| ParsingError::HttpRequestFailed {
            status: 404,
            url: url.to_string(),
        })
    }

    async fn fetch_json(&self, url: &str) -> ParsingResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.json.get(url).cloned().ok_or_else(|| ParsingError::Network {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn resolver(fetcher: &Arc<ScriptedFetcher>) -> ProductResolver {
    ProductResolver::new(Arc::clone(fetcher) as Arc<dyn PageFetcher>, &ParserConfig::default()).unwrap()
}

fn wildberries_card() -> Value {
    json!({"data": {"products": [{"name": "Widget", "salePriceU": 150000, "brand": "Acme"}]}})
}

const OZON_PAGE: &str = r#"<html><head>
    <meta property="og:title" content="Чайник электрический">
    <meta property="og:image" content="https://cdn1.ozone.ru/s3/multimedia-1/wc1000/main.jpg">
</head><body>
    <div data-widget="webPrice"><span>1 499 ₽</span></div>
    <img src="https://cdn1.ozon.ru/s3/multimedia-2/wc50/side.jpg">
</body></html>"#;

const YANDEX_PAGE: &str = r#"<html><head>
    <script type="application/ld+json">
        {"@type":"Product","name":"Headphones Z","offers":{"price":8990,"priceCurrency":"RUB"}}
    </script>
    <meta property="og:image" content="https://avatars.mds.yandex.net/get-mpic/1/img/300x300/">
</head></html>"#;

const LAMP_PAGE: &str = r#"<html><head><meta property="og:title" content="Lamp"></head></html>"#;

#[tokio::test]
async fn invalid_url_is_rejected_without_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let resolver = resolver(&fetcher);

    for input in ["not-a-url", "", "   ", "ftp://shop.example/x"] {
        let product = resolver.resolve(input).await;
        assert!(!product.success);
        assert!(product.error.as_deref().unwrap().starts_with("invalid URL"));
        assert_eq!(product.marketplace, Marketplace::Other);
    }
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn wildberries_link_uses_product_api() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_json(WB_API_URL, wildberries_card()));
    let product = resolver(&fetcher).resolve(WB_URL).await;

    assert!(product.success);
    assert_eq!(product.title.as_deref(), Some("Acme / Widget"));
    assert_eq!(product.price, Some(1500.0));
    assert_eq!(product.currency, "RUB");
    assert_eq!(product.marketplace, Marketplace::Wildberries);
    assert_eq!(product.images.len(), 5);
    for (i, image) in product.images.iter().enumerate() {
        assert!(image.starts_with("https://basket-09.wbbasket.ru/vol1234/part123400/123456789/images/big/"));
        assert!(image.ends_with(&format!("/{}.webp", i + 1)));
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn wildberries_api_failure_does_not_fall_through() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(WB_URL, LAMP_PAGE));
    let product = resolver(&fetcher).resolve(WB_URL).await;

    assert!(!product.success);
    assert_eq!(product.marketplace, Marketplace::Wildberries);
    assert!(product.error.as_deref().unwrap().contains("123456789"));
    assert_eq!(fetcher.calls(), 1);

    // image URLs never depend on the API answer
    let parser =
        WildberriesParser::new(Arc::clone(&fetcher) as Arc<dyn PageFetcher>, &ParserConfig::default()).unwrap();
    let images = parser.image_urls(123_456_789);
    assert_eq!(images.len(), 5);
    let prefix = "https://basket-09.wbbasket.ru/vol1234/part123400/123456789/images/big/";
    for (i, image) in images.iter().enumerate() {
        assert_eq!(image, &format!("{prefix}{}.webp", i + 1));
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn ozon_fetch_failure_does_not_fall_through() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let product = resolver(&fetcher).resolve(OZON_URL).await;

    assert!(!product.success);
    assert_eq!(product.marketplace, Marketplace::Ozon);
    assert_eq!(product.error.as_deref(), Some("failed to load the product page"));
    // one request: the generic parser never got a turn
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn ozon_and_yandex_pages() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(OZON_URL, OZON_PAGE)
            .with_page(YANDEX_URL, YANDEX_PAGE),
    );
    let resolver = resolver(&fetcher);

    let ozon = resolver.resolve(OZON_URL).await;
    assert!(ozon.success);
    assert_eq!(ozon.marketplace, Marketplace::Ozon);
    assert_eq!(ozon.title.as_deref(), Some("Чайник электрический"));
    assert_eq!(ozon.price, Some(1499.0));
    assert_eq!(ozon.images.len(), 2);

    let yandex = resolver.resolve(YANDEX_URL).await;
    assert!(yandex.success);
    assert_eq!(yandex.marketplace, Marketplace::YandexMarket);
    assert_eq!(yandex.title.as_deref(), Some("Headphones Z"));
    assert_eq!(yandex.price, Some(8990.0));
    assert_eq!(
        yandex.image_url.as_deref(),
        Some("https://avatars.mds.yandex.net/get-mpic/1/img/800x800/")
    );
}

#[tokio::test]
async fn open_graph_only_page() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(SHOP_URL, LAMP_PAGE));
    let product = resolver(&fetcher).resolve(SHOP_URL).await;

    assert!(product.success);
    assert_eq!(product.title.as_deref(), Some("Lamp"));
    assert_eq!(product.description, None);
    assert_eq!(product.price, None);
    assert_eq!(product.image_url, None);
    assert!(product.images.is_empty());
    assert_eq!(product.currency, "RUB");
    assert_eq!(product.marketplace, Marketplace::Other);
    assert_eq!(product.error, None);
}

#[tokio::test]
async fn unknown_shops_go_to_the_generic_parser() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let product = resolver(&fetcher).resolve("https://unknown-shop.example/item/1").await;

    // the generic parser accepted the link and reported its own failure
    assert!(!product.success);
    assert_eq!(product.marketplace, Marketplace::Other);
    assert_ne!(product.error.as_deref(), Some("unable to parse the link"));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn image_url_is_always_the_first_image() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_json(WB_API_URL, wildberries_card())
            .with_page(OZON_URL, OZON_PAGE)
            .with_page(YANDEX_URL, YANDEX_PAGE)
            .with_page(SHOP_URL, LAMP_PAGE),
    );
    let resolver = resolver(&fetcher);

    for product in resolver.resolve_many(&[WB_URL, OZON_URL, YANDEX_URL, SHOP_URL]).await {
        assert_eq!(product.image_url, product.images.first().cloned());
        assert!(product.images.len() <= 5);
    }
}

#[test]
fn resolution_is_idempotent() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_json(WB_API_URL, wildberries_card())
            .with_page(OZON_URL, OZON_PAGE),
    );
    let resolver = resolver(&fetcher);

    for url in [WB_URL, OZON_URL, "bogus"] {
        let first = tokio_test::block_on(resolver.resolve(url));
        let second = tokio_test::block_on(resolver.resolve(url));
        assert_eq!(first, second);
    }
}

/// Local page that sets a session cookie and serves a different title once
/// the cookie comes back
async fn spawn_cookie_sensitive_shop() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let request = String::from_utf8_lossy(&request).to_ascii_lowercase();
            let title = if request.contains("\r\ncookie:") { "Captcha" } else { "Lamp" };
            let body = format!(r#"<html><head><meta property="og:title" content="{title}"></head></html>"#);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nSet-Cookie: session=abc; Path=/\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/lamp")
}

#[tokio::test]
async fn cookies_do_not_leak_between_resolutions() {
    let url = spawn_cookie_sensitive_shop().await;
    let resolver = ProductResolver::from_config(&ParserConfig::default()).unwrap();

    let first = resolver.resolve(&url).await;
    let second = resolver.resolve(&url).await;

    assert_eq!(first.title.as_deref(), Some("Lamp"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn resolve_many_keeps_order() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(SHOP_URL, LAMP_PAGE));
    let products = resolver(&fetcher).resolve_many(&["bad", SHOP_URL]).await;

    assert_eq!(products.len(), 2);
    assert!(!products[0].success);
    assert_eq!(products[1].title.as_deref(), Some("Lamp"));
}

struct PanickingParser;

#[async_trait]
impl ProductParser for PanickingParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ozon
    }

    fn can_parse(&self, _url: &str) -> bool {
        true
    }

    async fn parse(&self, _url: &str) -> ParsingResult<ProductDetails> {
        panic!("parser bug");
    }
}

struct RejectingParser;

#[async_trait]
impl ProductParser for RejectingParser {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Wildberries
    }

    fn can_parse(&self, _url: &str) -> bool {
        false
    }

    async fn parse(&self, _url: &str) -> ParsingResult<ProductDetails> {
        unreachable!("never recognizes a link")
    }
}

#[tokio::test]
async fn panicking_parser_falls_through_to_the_next() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(SHOP_URL, LAMP_PAGE));
    let parsers: Vec<Arc<dyn ProductParser>> = vec![
        Arc::new(PanickingParser),
        Arc::new(OpenGraphParser::new(Arc::clone(&fetcher) as Arc<dyn PageFetcher>).unwrap()),
    ];
    let resolver = ProductResolver::with_parsers(parsers);

    let product = resolver.resolve(SHOP_URL).await;
    assert!(product.success);
    assert_eq!(product.title.as_deref(), Some("Lamp"));
    assert_eq!(product.marketplace, Marketplace::Other);
}

#[tokio::test]
async fn no_recognizer_means_unparseable_link() {
    let parsers: Vec<Arc<dyn ProductParser>> = vec![Arc::new(RejectingParser), Arc::new(PanickingParser)];
    let resolver = ProductResolver::with_parsers(parsers);

    let product = resolver.resolve(SHOP_URL).await;
    assert!(!product.success);
    assert_eq!(product.error.as_deref(), Some("unable to parse the link"));
    assert_eq!(product.marketplace, Marketplace::Other);
}

#[tokio::test]
async fn serialized_contract_uses_snake_case() {
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(YANDEX_URL, YANDEX_PAGE));
    let product = resolver(&fetcher).resolve(YANDEX_URL).await;

    let value = serde_json::to_value(&product).unwrap();
    assert_eq!(value["marketplace"], "yandex_market");
    assert_eq!(value["success"], true);
    assert_eq!(value["error"], Value::Null);
    assert!(value["image_url"].is_string());
    assert_eq!(value["images"].as_array().map(Vec::len), Some(1));
}
