//! URL handling module for Catalog-Harvest
//!
//! This module provides URL normalization, site membership checks, search URL
//! construction and page-type classification.

mod classify;
mod domain;
mod normalize;

use url::form_urlencoded;
use url::Url;

// Re-export main functions
pub use classify::{classify, classify_url, Classification, PageLabel, Rejection};
pub use domain::{extract_domain, is_site_host};
pub use normalize::{normalize_to_key, normalize_url, url_key};

/// Apex host of the default catalog
pub const DEFAULT_HOST: &str = "sdbullion.com";

/// Search endpoint of the default catalog; `{query}` receives the encoded term
pub const DEFAULT_SEARCH_TEMPLATE: &str = "https://sdbullion.com/catalogsearch/result/?q={query}";

/// Placeholder replaced by the encoded search term
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// The catalog site being crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    host: String,
    search_url_template: String,
}

impl Site {
    /// Creates a site from its apex host and search URL template
    pub fn new(host: impl Into<String>, search_url_template: impl Into<String>) -> Self {
        Self {
            host: host.into().trim().to_lowercase(),
            search_url_template: search_url_template.into(),
        }
    }

    /// The apex host (without `www.`)
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn search_url_template(&self) -> &str {
        &self.search_url_template
    }

    /// Returns true if the URL is http(s) on the apex host or its `www` subdomain
    pub fn contains(&self, url: &Url) -> bool {
        let scheme_ok = url.scheme() == "http" || url.scheme() == "https";
        scheme_ok
            && extract_domain(url)
                .map(|host| is_site_host(&host, &self.host))
                .unwrap_or(false)
    }

    /// Same as [`Site::contains`] for an unparsed URL string
    pub fn contains_str(&self, url: &str) -> bool {
        Url::parse(url.trim())
            .map(|parsed| self.contains(&parsed))
            .unwrap_or(false)
    }

    /// Builds the search results URL for a free-text term
    ///
    /// The term is form-encoded, so spaces become `+`.
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_harvest::url::Site;
    ///
    /// let site = Site::default();
    /// assert_eq!(
    ///     site.search_url("Silver coin"),
    ///     "https://sdbullion.com/catalogsearch/result/?q=Silver+coin"
    /// );
    /// ```
    pub fn search_url(&self, term: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(term.as_bytes()).collect();
        self.search_url_template.replace(QUERY_PLACEHOLDER, &encoded)
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_SEARCH_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_contains_apex_and_www() {
        let site = Site::default();
        assert!(site.contains_str("https://sdbullion.com/silver"));
        assert!(site.contains_str("http://www.sdbullion.com/silver"));
    }

    #[test]
    fn test_site_rejects_foreign_hosts_and_schemes() {
        let site = Site::default();
        assert!(!site.contains_str("https://example.com/silver"));
        assert!(!site.contains_str("ftp://sdbullion.com/silver"));
        assert!(!site.contains_str("mailto:sales@sdbullion.com"));
        assert!(!site.contains_str("garbage"));
    }

    #[test]
    fn test_host_is_lowercased() {
        let site = Site::new(" SDBullion.com ", DEFAULT_SEARCH_TEMPLATE);
        assert_eq!(site.host(), "sdbullion.com");
    }

    #[test]
    fn test_search_url_encoding() {
        let site = Site::default();
        assert_eq!(
            site.search_url("1 oz gold & silver"),
            "https://sdbullion.com/catalogsearch/result/?q=1+oz+gold+%26+silver"
        );
    }

    #[test]
    fn test_custom_template() {
        let site = Site::new("127.0.0.1", "http://127.0.0.1:9000/catalogsearch/result/?q={query}");
        assert_eq!(
            site.search_url("maple"),
            "http://127.0.0.1:9000/catalogsearch/result/?q=maple"
        );
        assert!(site.contains_str("http://127.0.0.1:9000/silver"));
    }
}
