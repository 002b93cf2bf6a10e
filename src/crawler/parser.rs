//! HTML parser for extracting links and metadata
//!
//! This module reads fetched HTML and extracts:
//! - Raw `href` values of anchors, in document order
//! - The page title, for log output
//!
//! Resolution of hrefs against the page and publisher is done by the
//! rewrite policy; the parser returns them exactly as written.

use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Raw href values of every `<a href>` in the page, in document order
    pub hrefs: Vec<String>,
}

/// Parses HTML content and extracts hrefs and the title
///
/// html5ever recovers from any malformed input, so parsing never fails:
/// a page that is not really HTML simply yields no links.
///
/// # Example
///
/// ```
/// use news_cacher::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.hrefs, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: title_of(&document),
        hrefs: hrefs_of(&document),
    }
}

/// Extracts the raw href values of all anchors
///
/// Anchors with a `download` attribute are skipped.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    hrefs_of(&Html::parse_document(html))
}

/// Extracts the trimmed text of the first `<title>` element
pub fn extract_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

fn title_of(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn hrefs_of(document: &Html) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
