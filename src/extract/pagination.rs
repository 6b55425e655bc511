//! Next-page discovery for listing pages

use crate::extract::{first_match, resolve_link};
use crate::url::normalize_to_key;
use scraper::Html;
use url::Url;

/// "Next" controls in priority order: Magento pager first, generic rel=next last
const NEXT_PAGE_SELECTORS: &[&str] = &[
    ".pages a.action.next",
    ".pages a.next",
    "a.action.next",
    ".pages-item-next a",
    "[class*=\"pagination\"] a[rel=\"next\"]",
    "a[rel=\"next\"]",
    "link[rel=\"next\"]",
];

/// Returns the absolute URL of the next listing page, if any
///
/// A next link that resolves to the page it was found on is treated as
/// absent, so a pager stuck on its last page cannot loop.
///
/// # Example
///
/// ```
/// use catalog_harvest::extract::next_page;
/// use url::Url;
///
/// let html = r#"<div class="pages"><a class="action next" href="?p=2">Next</a></div>"#;
/// let base = Url::parse("https://sdbullion.com/silver").unwrap();
/// assert_eq!(next_page(html, &base).as_deref(), Some("https://sdbullion.com/silver?p=2"));
/// ```
pub fn next_page(markup: &str, base_url: &Url) -> Option<String> {
    let document = Html::parse_document(markup);

    let next = first_match(document.root_element(), NEXT_PAGE_SELECTORS)
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_link(href, base_url))?;

    if points_to_same_page(&next, base_url) {
        tracing::debug!("Ignoring self-referencing next link on {}", base_url);
        return None;
    }

    Some(next)
}

fn points_to_same_page(next: &str, base_url: &Url) -> bool {
    match (normalize_to_key(next), normalize_to_key(base_url.as_str())) {
        (Ok(next_key), Ok(base_key)) => next_key == base_key,
        _ => next == base_url.as_str(),
    }
}
