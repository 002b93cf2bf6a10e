//! One fetch-and-process unit
//!
//! A unit fetches a single page, rewrites its internal links, writes it to the
//! cache and hands back the absolute URLs it links to. It never touches the
//! crawl state: the drain loop applies the outcome when the unit completes.

use crate::cache::{CacheError, CacheStore};
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::parser::parse_html;
use crate::crawler::rewrite::LinkRewriter;
use crate::url::{Sources, UrlClass};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Everything a unit needs, shared by all units of one queue
pub struct UnitContext {
    pub client: Client,
    pub store: Arc<dyn CacheStore>,
    pub sources: Arc<Sources>,
    pub rewriter: LinkRewriter,
    pub seed_timeout: Duration,
    pub article_timeout: Duration,
}

impl UnitContext {
    fn timeout_for(&self, class: UrlClass) -> Duration {
        if class.is_seed() {
            self.seed_timeout
        } else {
            self.article_timeout
        }
    }
}

/// Result of a successful unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub url: Url,
    pub class: UrlClass,
    /// Cache key the rewritten page was stored under
    pub key: String,
    pub bytes_written: usize,
    pub title: Option<String>,
    /// Absolute link targets, de-duplicated in first-seen order
    pub discovered: Vec<Url>,
}

/// Why a unit failed
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("fetch failed with HTTP {0}")]
    FetchHttp(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("unusable page: {0}")]
    Parse(String),

    #[error("failed to write {key}: {source}")]
    Cache {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("{0} does not belong to any source")]
    NoSource(Url),
}

impl UnitError {
    /// Short name used when tallying failures
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchTimeout(_) => "timeout",
            Self::FetchHttp(_) => "http",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Cache { .. } => "cache",
            Self::NoSource(_) => "no-source",
        }
    }
}

impl From<FetchError> for UnitError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Timeout(timeout) => Self::FetchTimeout(timeout),
            FetchError::Http(status) => Self::FetchHttp(status),
            FetchError::Network(msg) => Self::Network(msg),
            FetchError::NotHtml(content_type) => {
                Self::Parse(format!("content-type {}", content_type))
            }
        }
    }
}

/// Fetches, rewrites and caches one page
///
/// # Errors
///
/// Any failure ends this unit only; nothing is written for a page that
/// failed to fetch.
pub async fn process_url(
    ctx: &UnitContext,
    url: Url,
    class: UrlClass,
) -> Result<UnitOutcome, UnitError> {
    let source_id = class.source().ok_or_else(|| UnitError::NoSource(url.clone()))?;
    let source = ctx.sources.get(source_id);

    let page = fetch_page(&ctx.client, &url, ctx.timeout_for(class)).await?;
    if page.final_url != url {
        tracing::debug!("{} redirected to {}", url, page.final_url);
    }

    let parsed = parse_html(&page.body);

    let mut seen = HashSet::new();
    let discovered = parsed
        .hrefs
        .iter()
        .filter_map(|href| ctx.rewriter.resolve(&url, href))
        .filter(|target| seen.insert(target.to_string()))
        .collect::<Vec<_>>();

    let rewritten = ctx.rewriter.rewrite_html(&url, &page.body);
    let key = source.cache_key(&url);

    ctx.store
        .write(&key, rewritten.as_bytes())
        .map_err(|source| UnitError::Cache {
            key: key.clone(),
            source,
        })?;

    Ok(UnitOutcome {
        url,
        class,
        key,
        bytes_written: rewritten.len(),
        title: parsed.title,
        discovered,
    })
}
