/// Checks if a domain matches a wildcard pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact match: "theguardian.com" matches only "theguardian.com"
/// 2. Wildcard match: "*.bbc.co.uk" matches "bbc.co.uk" itself and any
///    subdomain of it ("www.bbc.co.uk", "feeds.news.bbc.co.uk")
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use news_cacher::url::matches_wildcard;
///
/// assert!(matches_wildcard("theguardian.com", "theguardian.com"));
/// assert!(!matches_wildcard("theguardian.com", "www.theguardian.com"));
///
/// assert!(matches_wildcard("*.bbc.co.uk", "bbc.co.uk"));
/// assert!(matches_wildcard("*.bbc.co.uk", "www.bbc.co.uk"));
/// assert!(!matches_wildcard("*.bbc.co.uk", "bbc.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || (candidate.len() > base.len()
                    && candidate.ends_with(base)
                    && candidate.as_bytes()[candidate.len() - base.len() - 1] == b'.')
        }
        None => candidate == pattern,
    }
}

/// Returns true if any of `patterns` matches `candidate`
pub fn matches_any<S: AsRef<str>>(patterns: &[S], candidate: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| matches_wildcard(pattern.as_ref(), candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("theguardian.com", "theguardian.com"));
        assert!(!matches_wildcard("theguardian.com", "guardian.com"));
        assert!(!matches_wildcard("theguardian.com", "www.theguardian.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_sub_domains() {
        assert!(matches_wildcard("*.bbc.co.uk", "bbc.co.uk"));
        assert!(matches_wildcard("*.bbc.co.uk", "www.bbc.co.uk"));
        assert!(matches_wildcard("*.bbc.co.uk", "feeds.news.bbc.co.uk"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.bbc.co.uk", "notbbc.co.uk"));
        assert!(!matches_wildcard("*.bbc.co.uk", "bbc.co.uk.evil.com"));
        assert!(!matches_wildcard("*.bbc.co.uk", "co.uk"));
        assert!(!matches_wildcard("*.bbc.co.uk", ""));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!matches_wildcard("bbc.co.uk", "BBC.co.uk"));
    }

    #[test]
    fn test_matches_any() {
        let patterns = vec!["theguardian.com".to_string(), "*.theguardian.com".to_string()];
        assert!(matches_any(&patterns, "www.theguardian.com"));
        assert!(!matches_any(&patterns, "bbc.co.uk"));

        let empty: Vec<String> = Vec::new();
        assert!(!matches_any(&empty, "bbc.co.uk"));
    }
}
