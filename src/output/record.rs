//! The product record emitted for every scraped product

use crate::extract::{accept_price_text, parse_price, Availability, ListingEntry, ProductFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scraped product, as written to every sink
///
/// `numeric_price` is only ever derived from an accepted `raw_price_text`,
/// so it is `None` whenever the price text is missing or lacks a `$`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Product page URL
    pub url: String,

    pub name: Option<String>,

    /// Price text as displayed
    #[serde(rename = "price")]
    pub raw_price_text: Option<String>,

    #[serde(rename = "priceNumeric")]
    pub numeric_price: Option<f64>,

    pub image_url: Option<String>,

    /// Product page only
    pub sku: Option<String>,

    /// Product page only
    pub availability: Option<Availability>,

    /// Product page only, at most 2000 characters
    pub description: Option<String>,

    pub scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Builds a shallow record from a listing entry
    ///
    /// Listing cards never carry SKU, availability or description; those stay
    /// `None` and are not backfilled from the product page.
    pub fn from_listing(entry: &ListingEntry) -> Self {
        let (raw_price_text, numeric_price) = gated_price(entry.raw_price_text.as_deref());

        Self {
            url: entry.url.clone(),
            name: Some(entry.display_name.clone()),
            raw_price_text,
            numeric_price,
            image_url: entry.image_url.clone(),
            sku: None,
            availability: None,
            description: None,
            scraped_at: Utc::now(),
        }
    }

    /// Builds a full record from the fields of a product detail page
    pub fn from_product_page(url: impl Into<String>, fields: ProductFields) -> Self {
        let (raw_price_text, numeric_price) = gated_price(fields.raw_price_text.as_deref());

        Self {
            url: url.into(),
            name: fields.name,
            raw_price_text,
            numeric_price,
            image_url: fields.image_url,
            sku: fields.sku,
            availability: Some(fields.availability),
            description: fields.description,
            scraped_at: Utc::now(),
        }
    }
}

fn gated_price(text: Option<&str>) -> (Option<String>, Option<f64>) {
    let accepted = accept_price_text(text);
    let numeric = accepted
        .as_deref()
        .and_then(parse_price)
        .map(|price| price.amount);
    (accepted, numeric)
}
