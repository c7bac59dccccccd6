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
/// use retailer_news::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the host a site is identified by: lowercase, without a `www.` prefix
///
/// ```
/// use url::Url;
/// use retailer_news::site_host;
///
/// let url = Url::parse("https://www.RetailGazette.co.uk/blog").unwrap();
/// assert_eq!(site_host(&url), Some("retailgazette.co.uk".to_string()));
/// ```
pub fn site_host(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    })
}

/// Checks whether two URLs belong to the same site
///
/// Hosts are compared modulo case and a leading `www.`; explicit ports must match.
pub fn is_same_site(a: &Url, b: &Url) -> bool {
    match (site_host(a), site_host(b)) {
        (Some(host_a), Some(host_b)) => {
            host_a == host_b && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// Derives a stable site identifier from its root URL
///
/// The id is the site host followed by the non-empty path segments, joined by `-`.
/// A non-default port is appended to the host so two local servers never collide.
///
/// ```
/// use url::Url;
/// use retailer_news::url::derive_site_id;
///
/// let url = Url::parse("https://www.retailgazette.co.uk/blog/2025/").unwrap();
/// assert_eq!(derive_site_id(&url).unwrap(), "retailgazette.co.uk-blog-2025");
/// ```
pub fn derive_site_id(url: &Url) -> Option<String> {
    let mut id = site_host(url)?;

    if let Some(port) = url.port() {
        id.push('_');
        id.push_str(&port.to_string());
    }

    if let Some(segments) = url.path_segments() {
        for segment in segments.filter(|s| !s.is_empty()) {
            id.push('-');
            id.push_str(&segment.to_lowercase());
        }
    }

    Some(id)
}
