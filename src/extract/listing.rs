//! Listing-page extraction
//!
//! Search results, category grids and promotional listings on the catalog look
//! alike but are built from different markup. Each [`ListingStrategy`] knows
//! one of those layouts; [`extract_listing`] tries them in order and keeps the
//! first non-empty result.

use crate::extract::{
    element_text, first_match, image_source, non_empty_attr, non_empty_text, resolve_link,
    select_all,
};
use crate::url::{normalize_to_key, Site};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// Product card containers (Magento 2 product-item markup)
const CARD_CONTAINERS: &str = ".product-item, .product-item-info, .item.product.product-item";
const CARD_LINK: &[&str] = &["a.product-item-link", "a.product-item-photo", "a[href]"];
const CARD_NAME: &[&str] = &[
    ".product-item-link",
    ".product-item-name",
    ".product.name a",
    "h2 a",
    "h3 a",
];
const CARD_PRICE: &[&str] = &[
    ".price-box .price",
    ".price-wrapper .price",
    "[data-price-type=\"finalPrice\"] .price",
    ".price",
];
const CARD_IMAGE: &[&str] = &["img.product-image-photo", "img[src]", "img[data-src]"];

/// Generic grid and list containers
const GRID_CONTAINERS: &str = ".products-grid .product-item, .products.list .product-item, [class*=\"product\"] li, [class*=\"product-list\"] > div";
const GRID_NAME: &[&str] = &[
    "h2",
    "h3",
    "h4",
    "[class*=\"name\"]",
    "[class*=\"title\"]",
    "a[class*=\"link\"]",
];
const GRID_PRICE: &[&str] = &["[class*=\"price\"]"];
const GRID_IMAGE: &[&str] = &["img[src]", "img[data-src]"];
const GRID_MIN_NAME_CHARS: usize = 4;

/// Ancestor tags that delimit a priced anchor's product block
const ANCHOR_CONTAINER_TAGS: &[&str] = &["div", "li", "article", "section"];
const ANCHOR_MIN_TEXT_CHARS: usize = 6;
/// Path segments of non-product destinations (search, checkout, account)
const ANCHOR_EXCLUDED_SEGMENTS: &[&str] = &["catalogsearch", "checkout", "customer"];

/// A product as it appears on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Absolute product URL
    pub url: String,

    /// Card title
    pub display_name: String,

    /// Price text as displayed, if any
    pub raw_price_text: Option<String>,

    /// Card image URL, if any
    pub image_url: Option<String>,
}

/// One self-contained way of reading product entries off a listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingStrategy {
    /// Magento product-item cards with their dedicated link/name/price nodes
    ProductCards,

    /// Looser grid/list items, for listings not built from product-item cards
    GridItems,

    /// Any same-site anchor that sits next to a price; only reliable on a
    /// rendered DOM, where the price nodes are filled in
    PricedAnchors,
}

/// Strategies usable on markup straight off the wire
pub const STATIC_CASCADE: &[ListingStrategy] =
    &[ListingStrategy::ProductCards, ListingStrategy::GridItems];

/// Strategies usable on browser-rendered markup
pub const RENDERED_CASCADE: &[ListingStrategy] = &[
    ListingStrategy::ProductCards,
    ListingStrategy::GridItems,
    ListingStrategy::PricedAnchors,
];

impl ListingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProductCards => "product-cards",
            Self::GridItems => "grid-items",
            Self::PricedAnchors => "priced-anchors",
        }
    }

    /// Runs this strategy alone; an empty list means it found nothing
    pub fn extract(&self, document: &Html, base_url: &Url, site: &Site) -> Vec<ListingEntry> {
        match self {
            Self::ProductCards => product_cards(document, base_url),
            Self::GridItems => grid_items(document, base_url, site),
            Self::PricedAnchors => priced_anchors(document, base_url, site),
        }
    }
}

/// Extracts listing entries, trying each strategy until one yields entries
///
/// # Arguments
///
/// * `markup` - The listing page HTML
/// * `base_url` - URL the page was served from, for resolving relative links
/// * `site` - The catalog site, for same-site link checks
/// * `cascade` - Strategies in priority order
///
/// # Example
///
/// ```
/// use catalog_harvest::extract::{extract_listing, STATIC_CASCADE};
/// use catalog_harvest::url::Site;
/// use url::Url;
///
/// let html = r#"<ol><li class="product-item">
///     <a class="product-item-link" href="/2025-silver-eagle">2025 Silver Eagle</a>
///     <span class="price">$38.99</span>
/// </li></ol>"#;
/// let base = Url::parse("https://sdbullion.com/silver").unwrap();
/// let entries = extract_listing(html, &base, &Site::default(), STATIC_CASCADE);
/// assert_eq!(entries[0].url, "https://sdbullion.com/2025-silver-eagle");
/// ```
pub fn extract_listing(
    markup: &str,
    base_url: &Url,
    site: &Site,
    cascade: &[ListingStrategy],
) -> Vec<ListingEntry> {
    let document = Html::parse_document(markup);

    for strategy in cascade {
        let entries = strategy.extract(&document, base_url, site);
        if !entries.is_empty() {
            tracing::debug!(
                "Listing strategy {} found {} entries on {}",
                strategy.name(),
                entries.len(),
                base_url
            );
            return entries;
        }
    }

    Vec::new()
}

/// Characters of page text kept in [`ListingDiagnostics::text_preview`]
const PREVIEW_CHARS: usize = 500;

/// Same-site links sampled in [`ListingDiagnostics::link_samples`]
const LINK_SAMPLES: usize = 5;

/// What a listing page looked like when no strategy matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDiagnostics {
    /// Leading page text, whitespace collapsed
    pub text_preview: String,

    /// Number of same-site links on the page
    pub site_links: usize,

    /// The first few same-site links
    pub link_samples: Vec<String>,
}

/// Summarizes a listing page for logging after an empty extraction
pub fn listing_diagnostics(markup: &str, base_url: &Url, site: &Site) -> ListingDiagnostics {
    let document = Html::parse_document(markup);
    let root = document.root_element();

    let body = first_match(root, &["body"]).unwrap_or(root);
    let text_preview: String = element_text(body).chars().take(PREVIEW_CHARS).collect();

    let links: Vec<String> = select_all(root, "a[href]")
        .into_iter()
        .filter_map(|anchor| site_link(anchor, base_url, site))
        .collect();

    ListingDiagnostics {
        text_preview,
        site_links: links.len(),
        link_samples: links.into_iter().take(LINK_SAMPLES).collect(),
    }
}

/// Per-page dedup on the normalized absolute URL
#[derive(Default)]
struct SeenUrls(HashSet<String>);

impl SeenUrls {
    fn insert(&mut self, url: &str) -> bool {
        let key = normalize_to_key(url).unwrap_or_else(|_| url.to_string());
        self.0.insert(key)
    }
}

fn product_cards(document: &Html, base_url: &Url) -> Vec<ListingEntry> {
    let mut seen = SeenUrls::default();
    let mut entries = Vec::new();

    for card in select_all(document.root_element(), CARD_CONTAINERS) {
        let Some(link) = first_match(card, CARD_LINK) else {
            continue;
        };
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        let name = first_match(card, CARD_NAME)
            .and_then(non_empty_text)
            .or_else(|| non_empty_attr(link, "title"));
        let Some(display_name) = name else {
            continue;
        };

        if !seen.insert(&url) {
            continue;
        }

        entries.push(ListingEntry {
            url,
            display_name,
            raw_price_text: first_match(card, CARD_PRICE).and_then(non_empty_text),
            image_url: first_match(card, CARD_IMAGE).and_then(|img| image_source(img, base_url)),
        });
    }

    entries
}

fn grid_items(document: &Html, base_url: &Url, site: &Site) -> Vec<ListingEntry> {
    let mut seen = SeenUrls::default();
    let mut entries = Vec::new();

    for item in select_all(document.root_element(), GRID_CONTAINERS) {
        let Some(url) = first_site_link(item, base_url, site) else {
            continue;
        };

        let Some(display_name) = first_match(item, GRID_NAME)
            .and_then(non_empty_text)
            .filter(|name| name.chars().count() >= GRID_MIN_NAME_CHARS)
        else {
            continue;
        };

        if !seen.insert(&url) {
            continue;
        }

        entries.push(ListingEntry {
            url,
            display_name,
            raw_price_text: first_match(item, GRID_PRICE).and_then(non_empty_text),
            image_url: first_match(item, GRID_IMAGE).and_then(|img| image_source(img, base_url)),
        });
    }

    entries
}

fn priced_anchors(document: &Html, base_url: &Url, site: &Site) -> Vec<ListingEntry> {
    let mut seen = SeenUrls::default();
    let mut entries = Vec::new();

    for anchor in select_all(document.root_element(), "a[href]") {
        let Some(url) = site_link(anchor, base_url, site) else {
            continue;
        };
        if is_excluded_destination(&url) {
            continue;
        }

        let Some(display_name) = non_empty_text(anchor)
            .or_else(|| non_empty_attr(anchor, "title"))
            .filter(|name| name.chars().count() >= ANCHOR_MIN_TEXT_CHARS)
        else {
            continue;
        };

        let Some(container) = nearest_container(anchor) else {
            continue;
        };
        let Some(price) = first_match(container, GRID_PRICE) else {
            continue;
        };

        if !seen.insert(&url) {
            continue;
        }

        entries.push(ListingEntry {
            url,
            display_name,
            raw_price_text: non_empty_text(price),
            image_url: first_match(container, GRID_IMAGE)
                .and_then(|img| image_source(img, base_url)),
        });
    }

    entries
}

/// Resolves an anchor's href and keeps it only if it stays on the site
fn site_link(anchor: ElementRef<'_>, base_url: &Url, site: &Site) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .and_then(|href| resolve_link(href, base_url))
        .filter(|url| site.contains_str(url))
}

fn first_site_link(scope: ElementRef<'_>, base_url: &Url, site: &Site) -> Option<String> {
    select_all(scope, "a[href]")
        .into_iter()
        .find_map(|anchor| site_link(anchor, base_url, site))
}

fn nearest_container(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ANCHOR_CONTAINER_TAGS.contains(&ancestor.value().name()))
}

fn is_excluded_destination(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().map(|mut segments| {
                segments.any(|segment| ANCHOR_EXCLUDED_SEGMENTS.contains(&segment))
            })
        })
        .unwrap_or(true)
}
