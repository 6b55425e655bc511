//! Page-type classification for catalog URLs
//!
//! Product URLs on the catalog have no stable shape (one segment, three
//! segments, anything in between), so classification works by elimination:
//! search and category shapes are recognized positively, known non-product
//! sections are rejected, and whatever survives is treated as a product.

use crate::url::Site;
use std::fmt;
use url::Url;

/// Path segment that marks the search results endpoint
const SEARCH_SEGMENT: &str = "catalogsearch";

/// Query parameter carrying the search term
const SEARCH_QUERY_PARAM: &str = "q";

/// Top-level catalog sections that list products
const TOP_LEVEL_SECTIONS: &[&str] = &[
    "gold",
    "silver",
    "platinum",
    "palladium",
    "copper",
    "on-sale",
    "new-arrivals",
    "specials",
];

/// Keywords marking a second-level segment as a sub-listing (`/silver/silver-coins`)
const LISTING_KEYWORDS: &[&str] = &[
    "coin", "bar", "round", "bullion", "mint", "eagle", "maple", "all-",
];

/// Marker that identifies inventory listings anywhere in the path
const INVENTORY_MARKER: &str = "inventory";

/// Informational sections that are never crawled
const INFORMATIONAL_SECTIONS: &[&str] = &[
    "about", "shipping", "contact", "faq", "policies", "blog", "customer", "checkout", "cart",
];

/// The label a crawl target carries through the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageLabel {
    /// Search results page
    Search,
    /// Category or promotional listing page
    Category,
    /// Product detail page
    Product,
}

impl PageLabel {
    /// Returns true for pages that list several products
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::Search | Self::Category)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Category => "category",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a URL was refused a page label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Could not be parsed as a URL
    Malformed,
    /// Wrong scheme or a host other than the site apex / `www`
    OffSite,
    /// Final segment looks like a file (`.jpg`, `.pdf`, ...)
    Asset,
    /// Path falls in an informational section (about, cart, ...)
    Informational,
}

/// Result of classifying a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Search,
    Category,
    Product,
    Invalid(Rejection),
}

impl Classification {
    /// Returns the crawl label, or None for rejected URLs
    pub fn label(&self) -> Option<PageLabel> {
        match self {
            Self::Search => Some(PageLabel::Search),
            Self::Category => Some(PageLabel::Category),
            Self::Product => Some(PageLabel::Product),
            Self::Invalid(_) => None,
        }
    }

    pub fn is_product(&self) -> bool {
        matches!(self, Self::Product)
    }

    pub fn is_category(&self) -> bool {
        matches!(self, Self::Category)
    }
}

/// Classifies a URL string for the given site
///
/// Rules, first match wins:
///
/// 1. `Invalid` if the scheme is not http(s) or the host is not the site
/// 2. `Search` if the path has the search segment or the query has `q`
/// 3. `Category` for the root, top-level sections, section sub-listings and
///    inventory paths
/// 4. `Invalid` for assets and informational sections, otherwise `Product`
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::{classify, Classification, Site};
///
/// let site = Site::default();
/// assert_eq!(classify("https://sdbullion.com/silver", &site), Classification::Category);
/// assert_eq!(
///     classify("https://sdbullion.com/2025-american-silver-eagle-coin", &site),
///     Classification::Product
/// );
/// ```
pub fn classify(url: &str, site: &Site) -> Classification {
    match Url::parse(url.trim()) {
        Ok(parsed) => classify_url(&parsed, site),
        Err(_) => Classification::Invalid(Rejection::Malformed),
    }
}

/// Classifies an already-parsed URL
pub fn classify_url(url: &Url, site: &Site) -> Classification {
    if !site.contains(url) {
        return Classification::Invalid(Rejection::OffSite);
    }

    let path = url.path().to_lowercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if is_search(url, &segments) {
        return Classification::Search;
    }

    if is_category(&path, &segments) {
        return Classification::Category;
    }

    if segments.last().map_or(false, |last| last.contains('.')) {
        return Classification::Invalid(Rejection::Asset);
    }

    if segments
        .iter()
        .any(|segment| INFORMATIONAL_SECTIONS.contains(segment))
    {
        return Classification::Invalid(Rejection::Informational);
    }

    Classification::Product
}

fn is_search(url: &Url, segments: &[&str]) -> bool {
    segments.contains(&SEARCH_SEGMENT)
        || url.query_pairs().any(|(key, _)| key == SEARCH_QUERY_PARAM)
}

fn is_category(path: &str, segments: &[&str]) -> bool {
    match segments {
        [] => true,
        [section] if TOP_LEVEL_SECTIONS.contains(section) => true,
        [section, sub]
            if TOP_LEVEL_SECTIONS.contains(section)
                && LISTING_KEYWORDS.iter().any(|kw| sub.contains(kw)) =>
        {
            true
        }
        _ => path.contains(INVENTORY_MARKER),
    }
}
