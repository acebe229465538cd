//! Markup inspection for product pages
//!
//! Lookups over the conventions product pages use to describe themselves:
//! JSON-LD blocks, Open Graph and Twitter Card tags, schema.org microdata,
//! and plain `<title>`/`<h1>` text. Every lookup skips blank values, so the
//! first source with real content wins.

use once_cell::unsync::OnceCell;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::domain::MAX_IMAGES;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Compiled selectors shared by every inspector
#[derive(Debug, Clone)]
pub struct MarkupSelectors {
    meta: Selector,
    json_ld: Selector,
    title: Selector,
    h1: Selector,
    img: Selector,
    inline_script: Selector,
    itemprop_name: Selector,
    itemprop_description: Selector,
    itemprop_price: Selector,
    itemprop_image: Selector,
}

impl MarkupSelectors {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            meta: compile_selector("meta")?,
            json_ld: compile_selector(r#"script[type="application/ld+json"]"#)?,
            title: compile_selector("title")?,
            h1: compile_selector("h1")?,
            img: compile_selector("img[src]")?,
            inline_script: compile_selector("script:not([src])")?,
            itemprop_name: compile_selector(r#"[itemprop="name"]"#)?,
            itemprop_description: compile_selector(r#"[itemprop="description"]"#)?,
            itemprop_price: compile_selector(r#"[itemprop="price"]"#)?,
            itemprop_image: compile_selector(r#"[itemprop="image"]"#)?,
        })
    }
}

/// Compile a CSS selector, reporting the failing selector text
pub fn compile_selector(css: &str) -> ParsingResult<Selector> {
    Selector::parse(css).map_err(|e| ParsingError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// A parsed document plus the lookups the parsers build on.
///
/// Not `Send`: create it, extract, and drop it without crossing an `.await`.
pub struct MarkupInspector<'s> {
    document: Html,
    selectors: &'s MarkupSelectors,
    json_ld: OnceCell<Option<Value>>,
}

impl<'s> MarkupInspector<'s> {
    pub fn parse(html: &str, selectors: &'s MarkupSelectors) -> Self {
        Self {
            document: Html::parse_document(html),
            selectors,
            json_ld: OnceCell::new(),
        }
    }

    // ---- primitives ---------------------------------------------------

    /// `content` of the first `<meta property=...>` with a non-blank value
    pub fn meta_property(&self, property: &str) -> Option<String> {
        self.meta_contents("property", property).next()
    }

    /// `content` of every `<meta property=...>`, document order
    pub fn meta_properties(&self, property: &str) -> Vec<String> {
        self.meta_contents("property", property).collect()
    }

    /// `content` of the first `<meta name=...>` with a non-blank value
    pub fn meta_name(&self, name: &str) -> Option<String> {
        self.meta_contents("name", name).next()
    }

    fn meta_contents<'a>(&'a self, attr: &'a str, key: &'a str) -> impl Iterator<Item = String> + 'a {
        self.document
            .select(&self.selectors.meta)
            .filter(move |meta| {
                meta.value()
                    .attr(attr)
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case(key))
            })
            .filter_map(|meta| non_blank(meta.value().attr("content")))
    }

    /// Trimmed text of the first element matching `selector` that has any
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.document
            .select(selector)
            .find_map(|element| non_blank(Some(element_text(element).as_str())))
    }

    /// Microdata value: `content`, then `src`/`href`, then element text
    fn itemprop(&self, selector: &Selector) -> Option<String> {
        self.document.select(selector).find_map(|element| {
            let attrs = element.value();
            non_blank(attrs.attr("content"))
                .or_else(|| non_blank(attrs.attr("src")))
                .or_else(|| non_blank(attrs.attr("href")))
                .or_else(|| non_blank(Some(element_text(element).as_str())))
        })
    }

    /// `src` of every `<img>` in document order
    pub fn image_sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.document
            .select(&self.selectors.img)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
    }

    /// Text of every inline `<script>`
    pub fn inline_scripts(&self) -> impl Iterator<Item = String> + '_ {
        self.document
            .select(&self.selectors.inline_script)
            .map(|script| script.text().collect::<String>())
    }

    pub fn h1_text(&self) -> Option<String> {
        self.first_text(&self.selectors.h1)
    }

    // ---- JSON-LD ------------------------------------------------------

    /// The product object described by the page's JSON-LD blocks.
    ///
    /// Blocks are read in document order; an object typed `Product` wins,
    /// otherwise the first object carrying a `name`. Parsed once per inspector.
    pub fn json_ld_product(&self) -> Option<&Value> {
        self.json_ld
            .get_or_init(|| self.find_json_ld_product())
            .as_ref()
    }

    fn find_json_ld_product(&self) -> Option<Value> {
        let mut candidates = Vec::new();
        for script in self.document.select(&self.selectors.json_ld) {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => collect_json_ld_objects(value, &mut candidates),
                Err(e) => debug!("Skipping unparseable JSON-LD block: {}", e),
            }
        }

        let product_index = candidates
            .iter()
            .position(is_product_object)
            .or_else(|| candidates.iter().position(|c| c.get("name").is_some()))?;
        Some(candidates.swap_remove(product_index))
    }

    pub fn json_ld_name(&self) -> Option<String> {
        self.json_ld_product()
            .and_then(|product| non_blank(product.get("name").and_then(Value::as_str)))
    }

    pub fn json_ld_price(&self) -> Option<f64> {
        self.json_ld_product()
            .and_then(|product| first_offer(product).and_then(offer_price))
    }

    pub fn json_ld_currency(&self) -> Option<String> {
        self.json_ld_product().and_then(|product| {
            first_offer(product)
                .and_then(|offer| non_blank(offer.get("priceCurrency").and_then(Value::as_str)))
        })
    }

    // ---- composite lookups ----------------------------------------------

    /// JSON-LD name → og:title → twitter:title → microdata name → `<title>` → `<h1>`
    pub fn title(&self) -> Option<String> {
        self.json_ld_name()
            .or_else(|| self.meta_property("og:title"))
            .or_else(|| self.meta_name("twitter:title"))
            .or_else(|| self.itemprop(&self.selectors.itemprop_name))
            .or_else(|| self.first_text(&self.selectors.title))
            .or_else(|| self.h1_text())
    }

    /// og:description → twitter:description → meta description → microdata description
    pub fn description(&self) -> Option<String> {
        self.meta_property("og:description")
            .or_else(|| self.meta_name("twitter:description"))
            .or_else(|| self.meta_name("description"))
            .or_else(|| self.itemprop(&self.selectors.itemprop_description))
    }

    /// Microdata price → `product:price:amount`
    pub fn price(&self) -> Option<f64> {
        self.itemprop(&self.selectors.itemprop_price)
            .and_then(|text| extract_price(&text))
            .or_else(|| {
                self.product_price_amount()
                    .and_then(|text| extract_price(&text))
            })
    }

    /// `product:price:amount`, published either as `property` or as `name`
    pub fn product_price_amount(&self) -> Option<String> {
        self.meta_property("product:price:amount")
            .or_else(|| self.meta_name("product:price:amount"))
    }

    pub fn price_currency(&self) -> Option<String> {
        self.json_ld_currency()
            .or_else(|| self.meta_property("product:price:currency"))
            .or_else(|| self.meta_property("og:price:currency"))
    }

    /// Up to five og:image URLs; else twitter:image; else microdata image
    pub fn images(&self) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        for url in self.meta_properties("og:image") {
            if !images.contains(&url) {
                images.push(url);
            }
            if images.len() == MAX_IMAGES {
                break;
            }
        }

        if images.is_empty() {
            if let Some(url) = self
                .meta_name("twitter:image")
                .or_else(|| self.meta_property("twitter:image"))
                .or_else(|| self.itemprop(&self.selectors.itemprop_image))
            {
                images.push(url);
            }
        }

        images
    }
}

/// Price from free text such as `"1 499,90 ₽"`.
///
/// Keeps digits and separators, treats a comma as the decimal point, and
/// gives `None` for anything that still does not parse as a non-negative number.
pub fn extract_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

fn collect_json_ld_objects(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_json_ld_objects(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(Value::Array(graph)) = map.remove("@graph") {
                for item in graph {
                    collect_json_ld_objects(item, out);
                }
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_product_object(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case("product"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case("product")),
        _ => false,
    }
}

fn first_offer(product: &Value) -> Option<&Value> {
    match product.get("offers")? {
        Value::Array(offers) => offers.first(),
        offer @ Value::Object(_) => Some(offer),
        _ => None,
    }
}

fn offer_price(offer: &Value) -> Option<f64> {
    ["price", "lowPrice"].iter().find_map(|key| match offer.get(*key)? {
        Value::Number(number) => number.as_f64().filter(|p| p.is_finite() && *p >= 0.0),
        Value::String(text) => extract_price(text),
        _ => None,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    let collapsed = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
