use crate::UrlError;
use url::Url;

/// Schemes that can never lead to a cacheable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes an absolute URL string
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Reject URLs without a host
/// 4. Reject URLs carrying a fragment marker (`#`)
///
/// Host lowercasing and percent-encoding are left to [`Url::parse`], so two
/// strings that normalize to the same `Url` are the same page.
///
/// # Examples
///
/// ```
/// use news_cacher::url::normalize_url;
///
/// let url = normalize_url("  https://WWW.BBC.CO.UK/news  ").unwrap();
/// assert_eq!(url.as_str(), "https://www.bbc.co.uk/news");
///
/// assert!(normalize_url("https://www.bbc.co.uk/news#top").is_err());
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.contains('#') {
        return Err(UrlError::Fragment(trimmed.to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_http(&url)?;
    Ok(url)
}

fn check_http(url: &Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(())
}

/// Resolves a raw `href` value found on `page_url` to an absolute URL
///
/// Root-relative links (`/path`) resolve against `source_base`, the
/// canonical base of the publisher the page belongs to, so that redirects
/// never shift the base of later links. Other relative links resolve
/// against the page itself; absolute links are parsed as-is.
///
/// Returns `None` for links that can never be crawled:
/// - empty hrefs
/// - hrefs carrying a fragment marker (`#top`, `/page#section`)
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - anything that does not resolve to an http(s) URL with a host
pub fn resolve_href(page_url: &Url, source_base: Option<&Url>, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.contains('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let base = if href.starts_with('/') && !href.starts_with("//") {
        source_base.unwrap_or(page_url)
    } else {
        page_url
    };

    let resolved = base.join(href).ok()?;
    check_http(&resolved).ok()?;
    Some(resolved)
}
