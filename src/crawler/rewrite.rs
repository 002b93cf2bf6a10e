//! Link rewrite policy
//!
//! Decides, for every href found on a cached page, whether it is rewritten to
//! point at the local copy of its target, left alone, or dropped from
//! consideration because it carries a fragment.

use crate::url::{resolve_href, Sources};
use regex::{Captures, Match, Regex};
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use url::Url;

/// Matches an opening `<a>` tag; quoted attribute values may contain `>`
const ANCHOR_TAG_PATTERN: &str = r#"(?i)<a\s(?:[^>"']|"[^"<]*"|'[^'<]*'|["'])*>"#;

/// Matches one attribute inside a tag
///
/// Group 1 is the name; the value is in group 2 (double-quoted),
/// 3 (single-quoted) or 4 (unquoted).
const ATTRIBUTE_PATTERN: &str =
    r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#;

/// Regions the HTML parser never turns into elements
const OPAQUE_PATTERN: &str = concat!(
    r"(?is)<!--.*?-->",
    r"|<script\b[^>]*>.*?</script\s*>",
    r"|<style\b[^>]*>.*?</style\s*>",
    r"|<noscript\b[^>]*>.*?</noscript\s*>",
    r"|<textarea\b[^>]*>.*?</textarea\s*>",
    r"|<title\b[^>]*>.*?</title\s*>",
);

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern compiles"))
}

fn anchor_tag() -> &'static Regex {
    static ANCHOR_TAG: OnceLock<Regex> = OnceLock::new();
    compiled(&ANCHOR_TAG, ANCHOR_TAG_PATTERN)
}

fn attribute() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    compiled(&ATTRIBUTE, ATTRIBUTE_PATTERN)
}

fn opaque() -> &'static Regex {
    static OPAQUE: OnceLock<Regex> = OnceLock::new();
    compiled(&OPAQUE, OPAQUE_PATTERN)
}

/// What to do with one href
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDecision {
    /// Leave the href untouched and never enqueue its target
    KeepExternal,
    /// Empty or fragment-bearing href: not rewritten, not enqueued
    DropFragment,
    /// Replace the href with this local path
    RewriteTo(String),
}

/// Applies the rewrite policy for a set of sources
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    sources: Arc<Sources>,
}

impl LinkRewriter {
    pub fn new(sources: Arc<Sources>) -> Self {
        Self { sources }
    }

    /// Resolves an href found on `page_url` to an absolute URL
    ///
    /// Root-relative hrefs resolve against the canonical base of the source
    /// the page belongs to.
    pub fn resolve(&self, page_url: &Url, href: &str) -> Option<Url> {
        let page_base = self
            .sources
            .source_for_url(page_url)
            .map(|id| &self.sources.get(id).base);

        resolve_href(page_url, page_base, href)
    }

    /// Decides how an href found on `page_url` is rewritten
    ///
    /// The decision depends only on its inputs and the source table.
    pub fn decide(&self, page_url: &Url, href: &str) -> RewriteDecision {
        let href = href.trim();
        if href.is_empty() || href.contains('#') {
            return RewriteDecision::DropFragment;
        }

        let Some(target) = self.resolve(page_url, href) else {
            return RewriteDecision::KeepExternal;
        };

        match self.sources.source_for_url(&target) {
            Some(id) => RewriteDecision::RewriteTo(self.sources.get(id).local_path(&target)),
            None => RewriteDecision::KeepExternal,
        }
    }

    /// Rewrites the href of every anchor in `html`
    ///
    /// The anchors considered are exactly those link extraction reports:
    /// `download` anchors and markup inside comments, scripts and other
    /// raw-text elements are left alone. Only the attribute values of
    /// rewritten anchors change; all other bytes of the document are
    /// preserved.
    pub fn rewrite_html(&self, page_url: &Url, html: &str) -> String {
        let skipped: Vec<Range<usize>> = opaque().find_iter(html).map(|m| m.range()).collect();

        anchor_tag()
            .replace_all(html, |caps: &Captures| {
                let tag = &caps[0];
                let start = caps.get(0).map_or(0, |m| m.start());
                if skipped.iter().any(|range| range.contains(&start)) {
                    return tag.to_string();
                }

                self.rewrite_anchor(page_url, tag)
                    .unwrap_or_else(|| tag.to_string())
            })
            .into_owned()
    }

    /// Rewrites one opening `<a ...>` tag, or `None` to keep it as is
    fn rewrite_anchor(&self, page_url: &Url, tag: &str) -> Option<String> {
        // Between "<a" and ">"
        let offset = 2;
        let attributes = &tag[offset..tag.len() - 1];

        let mut href: Option<(Match<'_>, Option<char>)> = None;
        let mut seen_href = false;
        for caps in attribute().captures_iter(attributes) {
            let name = &caps[1];
            if name.eq_ignore_ascii_case("download") {
                return None;
            }
            // Duplicate attributes are ignored by the parser
            if seen_href || !name.eq_ignore_ascii_case("href") {
                continue;
            }
            seen_href = true;
            href = caps
                .get(2)
                .map(|m| (m, Some('"')))
                .or_else(|| caps.get(3).map(|m| (m, Some('\''))))
                .or_else(|| caps.get(4).map(|m| (m, None)));
        }

        let (value, quote) = href?;
        let decoded = decode_attribute(value.as_str(), quote);
        let RewriteDecision::RewriteTo(path) = self.decide(page_url, &decoded) else {
            return None;
        };

        let span = match quote {
            Some(_) => value.start() - 1..value.end() + 1,
            None => value.range(),
        };
        Some(format!(
            "{}\"{}\"{}",
            &tag[..offset + span.start],
            path,
            &tag[offset + span.end..]
        ))
    }
}

/// Decodes character references in an href value
///
/// The value is run through the same HTML parser link extraction uses, so
/// both see identical hrefs.
fn decode_attribute(raw: &str, quote: Option<char>) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let quote = quote.unwrap_or('"');
    let fragment = Html::parse_fragment(&format!("<a href={q}{raw}{q}></a>", q = quote, raw = raw));
    let decoded = Selector::parse("a").ok().and_then(|selector| {
        fragment
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .map(str::to_string)
    });

    decoded.map_or(Cow::Borrowed(raw), Cow::Owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};

    fn source_config(name: &str, base: &str, domain: &str, prefix: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            label: None,
            base_url: base.to_string(),
            domains: vec![domain.to_string()],
            follow_prefixes: vec![prefix.to_string()],
            key_prefix: format!("{}_", name),
            serve_path: format!("/{}", name),
            quota: 20,
            seeds: vec![base.to_string()],
        }
    }

    fn rewriter() -> LinkRewriter {
        let config = Config {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "TestCacher".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: None,
            },
            output: OutputConfig {
                cache_dir: "./cache".to_string(),
            },
            remote_log: None,
            sources: vec![
                source_config(
                    "site",
                    "https://site.example/news",
                    "site.example",
                    "https://site.example/news",
                ),
                source_config(
                    "guardian",
                    "https://www.theguardian.com/uk",
                    "*.theguardian.com",
                    "https://www.theguardian.com/",
                ),
            ],
        };

        LinkRewriter::new(Arc::new(Sources::from_config(&config).unwrap()))
    }

    fn page() -> Url {
        Url::parse("https://site.example/news/world/story-1").unwrap()
    }

    #[test]
    fn test_root_relative_rewritten_against_source_base() {
        assert_eq!(
            rewriter().decide(&page(), "/news/x"),
            RewriteDecision::RewriteTo("/site/site_site_example_news_x.html".to_string())
        );
    }

    #[test]
    fn test_relative_rewritten_against_page() {
        assert_eq!(
            rewriter().decide(&page(), "story-2"),
            RewriteDecision::RewriteTo("/site/site_site_example_news_world_story_2.html".to_string())
        );
    }

    #[test]
    fn test_other_publisher_uses_its_serve_path() {
        assert_eq!(
            rewriter().decide(&page(), "https://www.theguardian.com/world/a"),
            RewriteDecision::RewriteTo(
                "/guardian/guardian_www_theguardian_com_world_a.html".to_string()
            )
        );
    }

    #[test]
    fn test_internal_non_article_still_rewritten() {
        assert_eq!(
            rewriter().decide(&page(), "/sport"),
            RewriteDecision::RewriteTo("/site/site_site_example_sport.html".to_string())
        );
    }

    #[test]
    fn test_external_kept() {
        let rewriter = rewriter();
        assert_eq!(
            rewriter.decide(&page(), "https://www.example.org/a"),
            RewriteDecision::KeepExternal
        );
        assert_eq!(
            rewriter.decide(&page(), "mailto:desk@site.example"),
            RewriteDecision::KeepExternal
        );
        assert_eq!(
            rewriter.decide(&page(), "javascript:void(0)"),
            RewriteDecision::KeepExternal
        );
    }

    #[test]
    fn test_fragments_dropped() {
        let rewriter = rewriter();
        assert_eq!(rewriter.decide(&page(), "#top"), RewriteDecision::DropFragment);
        assert_eq!(
            rewriter.decide(&page(), "/news/x#comments"),
            RewriteDecision::DropFragment
        );
        assert_eq!(rewriter.decide(&page(), "  "), RewriteDecision::DropFragment);
    }

    #[test]
    fn test_decide_is_deterministic() {
        let rewriter = rewriter();
        let first = rewriter.decide(&page(), "/news/y");
        for _ in 0..5 {
            assert_eq!(rewriter.decide(&page(), "/news/y"), first);
        }
    }

    #[test]
    fn test_rewrite_html_preserves_other_bytes() {
        let html = concat!(
            "<html><head><link href=\"/news/style.css\"></head>\n",
            "<body class=x><A class=\"lead\" HREF='/news/x'>X</A>\n",
            "<a href=\"#top\">Top</a> <a href=https://www.example.org/>Ext</a>\n",
            "<abbr href=\"/news/no\">n</abbr><a data-href=\"/news/no\" href=\"story-2\">S</a>\n",
            "</body></html>"
        );

        let rewritten = rewriter().rewrite_html(&page(), html);

        assert_eq!(
            rewritten,
            concat!(
                "<html><head><link href=\"/news/style.css\"></head>\n",
                "<body class=x><A class=\"lead\" HREF=\"/site/site_site_example_news_x.html\">X</A>\n",
                "<a href=\"#top\">Top</a> <a href=https://www.example.org/>Ext</a>\n",
                "<abbr href=\"/news/no\">n</abbr><a data-href=\"/news/no\" href=\"/site/site_site_example_news_world_story_2.html\">S</a>\n",
                "</body></html>"
            )
        );
    }

    #[test]
    fn test_rewrite_html_decodes_entities() {
        let html = r#"<a href="/news/search?q=a&amp;p=2">Next</a>"#;
        let rewritten = rewriter().rewrite_html(&page(), html);
        assert_eq!(
            rewritten,
            r#"<a href="/site/site_site_example_news_search_q_a_p_2.html">Next</a>"#
        );
    }

    #[test]
    fn test_rewrite_html_decodes_numeric_references() {
        let rewriter = rewriter();
        for html in [
            r#"<a href="/news/a&#45;b">x</a>"#,
            r#"<a href='/news/a&#x2D;b'>x</a>"#,
            r#"<a href=/news/a&#X2d;b>x</a>"#,
        ] {
            assert_eq!(
                rewriter.rewrite_html(&page(), html),
                r#"<a href="/site/site_site_example_news_a_b.html">x</a>"#,
                "{}",
                html
            );
        }

        // An encoded '#' is still a fragment
        let html = r#"<a href="/news/a&#35;top">x</a>"#;
        assert_eq!(rewriter.rewrite_html(&page(), html), html);
    }

    #[test]
    fn test_rewrite_html_agrees_with_link_extraction() {
        let html = concat!(
            "<a href=\"/news/a&#45;b\">1</a>",
            "<a href=\"/news/q?x=1&amp;y=2\">2</a>",
            "<a href=\"/news/c&#x2e;d\">3</a>",
        );
        let rewriter = rewriter();
        let rewritten = rewriter.rewrite_html(&page(), html);

        for href in crate::crawler::extract_hrefs(html) {
            let target = rewriter.resolve(&page(), &href).unwrap();
            let id = rewriter.sources.source_for_url(&target).unwrap();
            let expected = format!("href=\"{}\"", rewriter.sources.get(id).local_path(&target));
            assert!(rewritten.contains(&expected), "{} missing from {}", expected, rewritten);
        }
    }

    #[test]
    fn test_rewrite_html_skips_download_anchors() {
        let html = r#"<a download href="/news/report.pdf">PDF</a><a href="/news/x" DOWNLOAD="x.html">X</a>"#;
        assert_eq!(rewriter().rewrite_html(&page(), html), html);
    }

    #[test]
    fn test_rewrite_html_skips_scripts_and_comments() {
        let html = concat!(
            "<!-- <a href=\"/news/old\">old</a> -->",
            "<script>var s = '<a href=\"/news/js\">';</script>",
            "<a title=\"a > b\" href=\"/news/x\">X</a>",
        );
        assert_eq!(
            rewriter().rewrite_html(&page(), html),
            concat!(
                "<!-- <a href=\"/news/old\">old</a> -->",
                "<script>var s = '<a href=\"/news/js\">';</script>",
                "<a title=\"a > b\" href=\"/site/site_site_example_news_x.html\">X</a>",
            )
        );
    }

    #[test]
    fn test_rewrite_html_is_idempotent_for_same_input() {
        let rewriter = rewriter();
        let html = r#"<a href="/news/a">A</a><a href="https://www.theguardian.com/uk">G</a>"#;
        assert_eq!(
            rewriter.rewrite_html(&page(), html),
            rewriter.rewrite_html(&page(), html)
        );
    }
}
