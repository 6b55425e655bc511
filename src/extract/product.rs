//! Product-page extraction
//!
//! Each field has its own prioritized selector list and degrades to `None`
//! (or [`Availability::Unknown`]) on a miss; a sparse page still produces a
//! record.

use crate::extract::price::{accept_price_text, parse_price};
use crate::extract::{
    first_match, image_source, non_empty_attr, non_empty_text, resolve_link, select_all,
    trimmed_text,
};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Descriptions are cut to this many characters
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

const NAME_SELECTORS: &[&str] = &["h1"];

const PRICE_SELECTORS: &[&str] = &[
    ".price-box .price",
    ".product-info-price .price",
    "[data-price-type=\"finalPrice\"] .price",
    ".price-wrapper .price",
    ".special-price .price",
    ".normal-price .price",
    "span.price",
    ".price",
];

const OG_IMAGE_SELECTOR: &[&str] = &["meta[property=\"og:image\"]"];

const GALLERY_IMAGE_SELECTORS: &[&str] = &[
    ".gallery-placeholder img",
    ".fotorama__stage img",
    ".product.media img",
    "img.product-image-photo",
    "[class*=\"product\"] img",
];

const SKU_VALUE_SELECTORS: &[&str] = &[
    "[itemprop=\"sku\"]",
    ".product.attribute.sku .value",
    ".sku .value",
    "meta[itemprop=\"sku\"]",
];

const SKU_ROW_LABELS: &[&str] = &["SKU", "Product ID"];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product.attribute.description .value",
    ".product.info.detailed .description .value",
    "#description .value",
    ".description .value",
    "[itemprop=\"description\"]",
];

/// A best-effort UI interaction that exposes content hidden behind a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealAction {
    /// Short name for logs
    pub label: &'static str,

    /// Controls to activate, tried in order; the first present one is used
    pub selectors: &'static [&'static str],
}

/// Opens the product description tab
pub const DESCRIPTION_REVEAL: RevealAction = RevealAction {
    label: "description tab",
    selectors: &[
        "a[href=\"#description\"]",
        "#tab-label-description-title",
        "[data-role=\"collapsible\"] a[href*=\"description\"]",
    ],
};

/// Stock status vocabulary, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Pre-Order")]
    PreOrder,
    #[serde(rename = "Sold Out")]
    SoldOut,
    #[serde(rename = "Coming Soon")]
    ComingSoon,
    #[serde(rename = "Discontinued")]
    Discontinued,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Availability {
    /// Detectable states; the first one found in the page text wins
    pub const DETECTION_ORDER: [Availability; 6] = [
        Self::InStock,
        Self::OutOfStock,
        Self::PreOrder,
        Self::SoldOut,
        Self::ComingSoon,
        Self::Discontinued,
    ];

    /// The literal phrase shown on the page
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::OutOfStock => "Out of Stock",
            Self::PreOrder => "Pre-Order",
            Self::SoldOut => "Sold Out",
            Self::ComingSoon => "Coming Soon",
            Self::Discontinued => "Discontinued",
            Self::Unknown => "Unknown",
        }
    }

    /// Scans page text for the first known phrase
    pub fn detect(page_text: &str) -> Self {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|state| page_text.contains(state.phrase()))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Fields read off a product detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: Option<String>,

    /// Displayed price, kept only when it carries the currency marker
    pub raw_price_text: Option<String>,

    /// Parsed from `raw_price_text`
    pub numeric_price: Option<f64>,

    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub availability: Availability,

    /// At most [`MAX_DESCRIPTION_LENGTH`] characters
    pub description: Option<String>,
}

/// Extracts product fields from a product detail page
///
/// # Example
///
/// ```
/// use catalog_harvest::extract::{extract_product, Availability};
/// use url::Url;
///
/// let html = r#"<h1>1 oz Gold Eagle</h1>
///     <div class="price-box"><span class="price">$2,790.55</span></div>
///     <div class="stock available">In Stock</div>"#;
/// let base = Url::parse("https://sdbullion.com/1-oz-gold-eagle").unwrap();
/// let fields = extract_product(html, &base);
/// assert_eq!(fields.name.as_deref(), Some("1 oz Gold Eagle"));
/// assert_eq!(fields.numeric_price, Some(2790.55));
/// assert_eq!(fields.availability, Availability::InStock);
/// ```
pub fn extract_product(markup: &str, base_url: &Url) -> ProductFields {
    let document = Html::parse_document(markup);
    let root = document.root_element();

    let raw_price_text = extract_price_text(root);
    let numeric_price = raw_price_text
        .as_deref()
        .and_then(parse_price)
        .map(|price| price.amount);

    ProductFields {
        name: first_match(root, NAME_SELECTORS).and_then(non_empty_text),
        raw_price_text,
        numeric_price,
        image_url: extract_image(root, base_url),
        sku: extract_sku(root),
        availability: extract_availability(root),
        description: description_in(root),
    }
}

/// Reads only the description, for the retry after a reveal action
pub fn extract_description(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    description_in(document.root_element())
}

fn extract_price_text(root: ElementRef<'_>) -> Option<String> {
    PRICE_SELECTORS.iter().find_map(|css| {
        first_match(root, &[*css]).and_then(|el| accept_price_text(non_empty_text(el).as_deref()))
    })
}

fn extract_image(root: ElementRef<'_>, base_url: &Url) -> Option<String> {
    first_match(root, OG_IMAGE_SELECTOR)
        .and_then(|meta| non_empty_attr(meta, "content"))
        .and_then(|content| resolve_link(&content, base_url))
        .or_else(|| first_match(root, GALLERY_IMAGE_SELECTORS).and_then(|img| image_source(img, base_url)))
}

fn extract_sku(root: ElementRef<'_>) -> Option<String> {
    SKU_VALUE_SELECTORS
        .iter()
        .find_map(|css| {
            first_match(root, &[*css])
                .and_then(|el| non_empty_text(el).or_else(|| non_empty_attr(el, "content")))
        })
        .or_else(|| sku_from_table(root))
}

/// Finds a table row labeled SKU / Product ID and returns its second cell
fn sku_from_table(root: ElementRef<'_>) -> Option<String> {
    select_all(root, "tr").into_iter().find_map(|row| {
        let text = non_empty_text(row)?;
        if !SKU_ROW_LABELS.iter().any(|label| text.contains(label)) {
            return None;
        }
        select_all(row, "th, td")
            .into_iter()
            .nth(1)
            .and_then(non_empty_text)
    })
}

fn extract_availability(root: ElementRef<'_>) -> Availability {
    let page_text = root
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    Availability::detect(&page_text)
}

fn description_in(root: ElementRef<'_>) -> Option<String> {
    first_match(root, DESCRIPTION_SELECTORS)
        .and_then(trimmed_text)
        .map(|text| truncate_chars(&text, MAX_DESCRIPTION_LENGTH))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
