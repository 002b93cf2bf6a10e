//! URL handling module for News-Cacher
//!
//! This module provides URL normalization, href resolution, wildcard domain
//! matching and the classification of URLs into seed pages, article pages
//! and everything else.

mod domain;
mod matcher;
mod normalize;

use crate::cache::derive_key;
use crate::config::{Config, SourceConfig};
use crate::UrlError;
use std::collections::HashMap;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, strip_scheme};
pub use matcher::{matches_any, matches_wildcard};
pub use normalize::{normalize_url, resolve_href};

/// Index of a configured source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

/// What a URL is to the crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlClass {
    /// A configured section page, always re-fetched and never counted against quota
    Seed(SourceId),
    /// A page of a known source, subject to that source's quota
    Article(SourceId),
    /// Anything else; never fetched
    External,
}

impl UrlClass {
    /// The source this URL belongs to, if any
    pub fn source(&self) -> Option<SourceId> {
        match self {
            Self::Seed(id) | Self::Article(id) => Some(*id),
            Self::External => None,
        }
    }

    /// Returns true if the URL should ever be fetched
    pub fn should_crawl(&self) -> bool {
        !matches!(self, Self::External)
    }

    /// Returns true for seed pages
    pub fn is_seed(&self) -> bool {
        matches!(self, Self::Seed(_))
    }
}

/// A source with its URLs parsed and ready for matching
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub label: String,
    pub base: Url,
    pub domains: Vec<String>,
    pub follow_prefixes: Vec<String>,
    pub key_prefix: String,
    pub serve_path: String,
    pub quota: u32,
    pub seeds: Vec<Url>,
}

impl Source {
    fn from_config(id: SourceId, config: &SourceConfig) -> Result<Self, UrlError> {
        let base = normalize_url(&config.base_url)?;

        let follow_prefixes = config
            .follow_prefixes
            .iter()
            .map(|prefix| normalize_url(prefix).map(|url| url.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let seeds = config
            .seeds
            .iter()
            .map(|seed| normalize_url(seed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            name: config.name.clone(),
            label: config.display_name().to_string(),
            base,
            domains: config.domains.iter().map(|d| d.to_lowercase()).collect(),
            follow_prefixes,
            key_prefix: config.key_prefix.clone(),
            serve_path: config.serve_path.clone(),
            quota: config.quota,
            seeds,
        })
    }

    /// Returns true if the host of `url` belongs to this source
    pub fn owns_domain(&self, url: &Url) -> bool {
        extract_domain(url).map_or(false, |domain| matches_any(&self.domains, &domain))
    }

    /// Returns true if `url` looks like an article of this source
    pub fn is_article(&self, url: &Url) -> bool {
        self.owns_domain(url)
            && (self.follow_prefixes.is_empty()
                || self
                    .follow_prefixes
                    .iter()
                    .any(|prefix| url.as_str().starts_with(prefix.as_str())))
    }

    /// Cache key of a page belonging to this source
    pub fn cache_key(&self, url: &Url) -> String {
        derive_key(url.as_str(), &self.key_prefix)
    }

    /// Path a cached page of this source is served under
    pub fn local_path(&self, url: &Url) -> String {
        format!("{}/{}", self.serve_path, self.cache_key(url))
    }
}

/// The configured sources, compiled for fast classification
#[derive(Debug, Clone)]
pub struct Sources {
    sources: Vec<Source>,
    seeds: HashMap<String, SourceId>,
}

impl Sources {
    /// Builds the source table from the configuration
    pub fn from_config(config: &Config) -> Result<Self, UrlError> {
        let sources = config
            .sources
            .iter()
            .enumerate()
            .map(|(idx, source)| Source::from_config(SourceId(idx), source))
            .collect::<Result<Vec<_>, _>>()?;

        let seeds = sources
            .iter()
            .flat_map(|source| {
                source
                    .seeds
                    .iter()
                    .map(move |seed| (seed.to_string(), source.id))
            })
            .collect();

        Ok(Self { sources, seeds })
    }

    /// Returns the source with the given id
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this table.
    pub fn get(&self, id: SourceId) -> &Source {
        &self.sources[id.0]
    }

    /// Looks up a source by name
    pub fn by_name(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Finds the source a URL belongs to
    ///
    /// When several sources whitelist the same host, a source whose article
    /// prefixes match the URL wins over one that only matches the domain.
    pub fn source_for_url(&self, url: &Url) -> Option<SourceId> {
        let mut domain_match = None;

        for source in self.sources.iter().filter(|s| s.owns_domain(url)) {
            if source.is_article(url) {
                return Some(source.id);
            }
            domain_match.get_or_insert(source.id);
        }

        domain_match
    }

    /// Classifies a normalized URL
    ///
    /// Seeds are matched exactly, articles by domain and article prefix.
    /// Pages on a whitelisted domain outside every article prefix are
    /// `External`: their links are still rewritten but they are never fetched.
    pub fn classify_url(&self, url: &Url) -> UrlClass {
        if let Some(id) = self.seeds.get(url.as_str()) {
            return UrlClass::Seed(*id);
        }

        match self.source_for_url(url) {
            Some(id) if self.get(id).is_article(url) => UrlClass::Article(id),
            _ => UrlClass::External,
        }
    }
}
