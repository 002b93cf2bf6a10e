use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns `None` for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use news_cacher::url::extract_domain;
///
/// let url = Url::parse("https://WWW.BBC.CO.UK/news").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.bbc.co.uk".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips the `scheme://` part of a URL string
///
/// The cache key of a page does not depend on whether it was reached over
/// http or https.
pub fn strip_scheme(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        let url = Url::parse("https://www.theguardian.com/uk").unwrap();
        assert_eq!(extract_domain(&url), Some("www.theguardian.com".to_string()));
    }

    #[test]
    fn test_extract_domain_ignores_port() {
        let url = Url::parse("http://127.0.0.1:8080/news").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("https://site.example/news"), "site.example/news");
        assert_eq!(strip_scheme("http://site.example/"), "site.example/");
        assert_eq!(strip_scheme("site.example/news"), "site.example/news");
    }
}
