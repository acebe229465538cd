use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::constants::{DEFAULT_CURRENCY, MAX_IMAGES};

/// Marketplace that produced a parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Wildberries,
    Ozon,
    YandexMarket,
    #[default]
    Other,
}

impl Marketplace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wildberries => "wildberries",
            Self::Ozon => "ozon",
            Self::YandexMarket => "yandex_market",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product data a parser managed to extract.
///
/// `title` is the only field a parser must find to report success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDetails {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// ISO 4217 code reported by the source, if any
    pub currency: Option<String>,
    /// Image URLs in discovery order
    pub images: Vec<String>,
}

impl ProductDetails {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Normalized result of resolving a product link.
///
/// Field names are part of the public JSON contract of the parse-url endpoint.
/// Build values through [`ParsedProduct::success`] or [`ParsedProduct::failure`]
/// so the success/error and image invariants always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub marketplace: Marketplace,
    pub success: bool,
    pub error: Option<String>,
}

impl ParsedProduct {
    /// Successful record built from extracted details
    pub fn success(marketplace: Marketplace, details: ProductDetails) -> Self {
        let ProductDetails {
            title,
            description,
            price,
            currency,
            images,
        } = details;

        let title = title.trim().to_string();
        if title.is_empty() {
            return Self::failure(marketplace, "product title could not be extracted");
        }

        let images = normalize_images(images);

        Self {
            title: Some(title),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            price: price.filter(|p| p.is_finite() && *p >= 0.0),
            currency: currency
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| is_currency_code(c))
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            image_url: images.first().cloned(),
            images,
            marketplace,
            success: true,
            error: None,
        }
    }

    /// Failed record carrying a human-readable reason
    pub fn failure(marketplace: Marketplace, error: impl Into<String>) -> Self {
        Self {
            title: None,
            description: None,
            price: None,
            currency: DEFAULT_CURRENCY.to_string(),
            image_url: None,
            images: Vec::new(),
            marketplace,
            success: false,
            error: Some(error.into()),
        }
    }
}

impl Default for ParsedProduct {
    fn default() -> Self {
        Self::failure(Marketplace::Other, "not parsed")
    }
}

/// Drops blanks and duplicates, keeps discovery order, caps at [`MAX_IMAGES`].
pub fn normalize_images<I>(images: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::with_capacity(MAX_IMAGES);
    for image in images {
        let image = image.trim();
        if image.is_empty() || out.iter().any(|seen| seen == image) {
            continue;
        }
        out.push(image.to_string());
        if out.len() == MAX_IMAGES {
            break;
        }
    }
    out
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}
