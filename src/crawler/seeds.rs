//! Seed resolution: search terms and start URLs to labeled crawl targets

use crate::config::{StartUrl, DEFAULT_SEARCH_TERM};
use crate::crawler::CrawlTarget;
use crate::url::{classify, Classification, Site};
use crate::ConfigError;

/// Builds the initial frontier
///
/// Search terms come first (blank ones are skipped), then start URLs. Each
/// candidate is classified to pick its label; rejected URLs and unrecognized
/// start-URL entries are logged and dropped. If nothing usable remains, a
/// search for [`DEFAULT_SEARCH_TERM`] is used; if even that is rejected the
/// run cannot start and [`ConfigError::NoSeeds`] is returned.
///
/// # Example
///
/// ```
/// use catalog_harvest::config::StartUrl;
/// use catalog_harvest::crawler::build_seeds;
/// use catalog_harvest::url::{PageLabel, Site};
///
/// let seeds = build_seeds(&[], &[StartUrl::from("https://sdbullion.com/silver")], &Site::default())
///     .unwrap();
/// assert_eq!(seeds[0].label, PageLabel::Category);
/// ```
pub fn build_seeds(
    search_terms: &[String],
    start_urls: &[StartUrl],
    site: &Site,
) -> Result<Vec<CrawlTarget>, ConfigError> {
    let mut seeds = Vec::new();

    for term in search_terms.iter().map(|term| term.trim()) {
        if term.is_empty() {
            continue;
        }
        let url = site.search_url(term);
        tracing::info!("Added search term: '{}' -> {}", term, url);
        push_classified(&mut seeds, url, site);
    }

    for entry in start_urls {
        match entry.as_url() {
            Some(url) => push_classified(&mut seeds, url.trim().to_string(), site),
            None => tracing::warn!("Skipping invalid start URL entry: {:?}", entry),
        }
    }

    if seeds.is_empty() {
        let url = site.search_url(DEFAULT_SEARCH_TERM);
        tracing::info!(
            "No usable input, defaulting to search: '{}'",
            DEFAULT_SEARCH_TERM
        );
        push_classified(&mut seeds, url.clone(), site);
        if seeds.is_empty() {
            return Err(ConfigError::NoSeeds(url));
        }
    }

    Ok(seeds)
}

fn push_classified(seeds: &mut Vec<CrawlTarget>, url: String, site: &Site) {
    match classify(&url, site) {
        Classification::Invalid(reason) => {
            tracing::warn!("Skipping start URL {} ({:?})", url, reason);
        }
        classification => {
            if let Some(label) = classification.label() {
                seeds.push(CrawlTarget::new(url, label));
            }
        }
    }
}
