use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvest::url::extract_domain;
///
/// let url = Url::parse("https://WWW.SDBullion.com/silver").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.sdbullion.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `host` is the site's apex domain or its `www` subdomain
///
/// Other subdomains (`blog.`, `cdn.`, ...) are treated as foreign hosts.
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::is_site_host;
///
/// assert!(is_site_host("sdbullion.com", "sdbullion.com"));
/// assert!(is_site_host("www.sdbullion.com", "sdbullion.com"));
/// assert!(!is_site_host("cdn.sdbullion.com", "sdbullion.com"));
/// ```
pub fn is_site_host(host: &str, apex: &str) -> bool {
    if host.is_empty() || apex.is_empty() {
        return false;
    }
    host == apex || host.strip_prefix("www.") == Some(apex)
}
