//! Extraction engine for catalog pages
//!
//! This module turns fetched markup into structured data:
//! - Listing entries from search and category pages (strategy cascade)
//! - Product fields from product detail pages
//! - The next pagination URL of a listing page
//! - Numeric prices from display price text
//!
//! Every function here is synchronous and total: a miss yields `None` or an
//! empty list, never an error.

mod listing;
mod pagination;
mod price;
mod product;

pub use listing::{
    extract_listing, listing_diagnostics, ListingDiagnostics, ListingEntry, ListingStrategy,
    RENDERED_CASCADE, STATIC_CASCADE,
};
pub use pagination::next_page;
pub use price::{accept_price_text, has_currency_marker, parse_price, Price, CURRENCY_MARKER};
pub use product::{
    extract_description, extract_product, Availability, ProductFields, RevealAction,
    DESCRIPTION_REVEAL, MAX_DESCRIPTION_LENGTH,
};

use scraper::{ElementRef, Selector};
use url::Url;

/// Returns the first element matching the selectors, tried in priority order
///
/// Unlike a comma-joined selector list (which yields document order), an
/// earlier selector always wins over a later one.
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| scope.select(&selector).next())
}

/// Visits every element matching any of the selectors, in document order
pub(crate) fn select_all<'a>(scope: ElementRef<'a>, selectors: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selectors) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Collects an element's text with whitespace collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collects an element's text, or None if it is blank
pub(crate) fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    let text = element_text(element);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Collects an element's text trimmed at both ends, keeping its line breaks
pub(crate) fn trimmed_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Reads a trimmed, non-empty attribute value
pub(crate) fn non_empty_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Picks an image URL: the live `src` first, the lazy-load `data-src` second
///
/// Inline `data:` placeholders count as a missing `src`.
pub(crate) fn image_source(img: ElementRef<'_>, base_url: &Url) -> Option<String> {
    ["src", "data-src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .find_map(|value| resolve_link(value, base_url))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
