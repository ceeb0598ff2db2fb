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
/// use catalog_mapper::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key requests are throttled under
///
/// Two URLs share an origin when scheme, host and effective port match.
/// Non-default ports are part of the key, so two local test servers on
/// different ports are throttled independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_mapper::url::origin_key;
///
/// let a = Url::parse("https://Shop.example.com/a").unwrap();
/// let b = Url::parse("https://shop.example.com:443/b").unwrap();
/// assert_eq!(origin_key(&a), origin_key(&b));
/// ```
pub fn origin_key(url: &Url) -> String {
    let host = extract_domain(url).unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_origin_includes_non_default_port() {
        let url = Url::parse("http://127.0.0.1:8080/shop").unwrap();
        assert_eq!(origin_key(&url), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_origin_distinguishes_scheme() {
        let plain = Url::parse("http://example.com/").unwrap();
        let secure = Url::parse("https://example.com/").unwrap();
        assert_ne!(origin_key(&plain), origin_key(&secure));
    }
}
