use crate::url::strip_scheme;

/// Suffix of every cache file
pub const CACHE_SUFFIX: &str = ".html";

/// Derives the cache filename of a URL
///
/// The scheme is stripped, every character that is not an ASCII letter or
/// digit is replaced by `_`, the source's `key_prefix` is prepended and
/// `.html` appended. The function is pure, so the cache filename of a page
/// can be predicted before the page has been fetched.
///
/// # Examples
///
/// ```
/// use news_cacher::cache::derive_key;
///
/// assert_eq!(
///     derive_key("https://www.bbc.co.uk/news/uk-123", "bbc_"),
///     "bbc_www_bbc_co_uk_news_uk_123.html"
/// );
/// ```
pub fn derive_key(url: &str, key_prefix: &str) -> String {
    let body = strip_scheme(url);
    let mut key = String::with_capacity(key_prefix.len() + body.len() + CACHE_SUFFIX.len());
    key.push_str(key_prefix);
    key.extend(
        body.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
    );
    key.push_str(CACHE_SUFFIX);
    key
}

/// Returns true if `key` is safe to use as a filename inside the cache directory
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_is_deterministic() {
        let url = "https://www.theguardian.com/world/2024/jan/01/story";
        assert_eq!(derive_key(url, "guardian_"), derive_key(url, "guardian_"));
    }

    #[test]
    fn test_derive_key_ignores_scheme() {
        assert_eq!(
            derive_key("http://site.example/news/x", "s_"),
            derive_key("https://site.example/news/x", "s_")
        );
    }

    #[test]
    fn test_derive_key_replaces_every_symbol() {
        assert_eq!(
            derive_key("https://site.example/a-b?c=d&e", "s_"),
            "s_site_example_a_b_c_d_e.html"
        );
    }

    #[test]
    fn test_derive_key_non_ascii() {
        assert_eq!(derive_key("https://site.example/café", "s_"), "s_site_example_caf_.html");
    }

    #[test]
    fn test_derive_key_distinguishes_pages() {
        assert_ne!(
            derive_key("https://site.example/news/1", "s_"),
            derive_key("https://site.example/news/2", "s_")
        );
        assert_ne!(
            derive_key("https://site.example/news/1", "a_"),
            derive_key("https://site.example/news/1", "b_")
        );
    }

    #[test]
    fn test_derived_keys_are_valid() {
        assert!(is_valid_key(&derive_key("https://site.example/../../etc/passwd", "s_")));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("bbc_www_bbc_co_uk_news.html"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("../secret"));
        assert!(!is_valid_key("a/b.html"));
        assert!(!is_valid_key(".hidden"));
    }
}
