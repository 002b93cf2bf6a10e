use serde::Deserialize;
use url::Url;

/// Main configuration structure for News-Cacher
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(rename = "remote-log", default)]
    pub remote_log: Option<RemoteLogConfig>,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Looks up a source by its configured name
    pub fn source_by_name(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Total number of seed URLs across all sources
    pub fn seed_count(&self) -> usize {
        self.sources.iter().map(|s| s.seeds.len()).sum()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Timeout for seed (section header) pages, in milliseconds
    #[serde(default = "default_seed_timeout_ms")]
    pub seed_timeout_ms: u64,

    /// Timeout for article pages, in milliseconds
    #[serde(default = "default_article_timeout_ms")]
    pub article_timeout_ms: u64,

    /// Number of dequeues between remote progress messages
    #[serde(default = "default_log_every")]
    pub log_every: u32,

    /// Cached articles younger than this are not fetched again
    #[serde(default)]
    pub article_max_age_hours: Option<u64>,

    /// Reserve quota at dispatch so a source never exceeds its ceiling
    #[serde(default)]
    pub strict_quota: bool,
}

fn default_max_concurrent_fetches() -> u32 {
    5
}

fn default_seed_timeout_ms() -> u64 {
    10_000
}

fn default_article_timeout_ms() -> u64 {
    15_000
}

fn default_log_every() -> u32 {
    10
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            seed_timeout_ms: default_seed_timeout_ms(),
            article_timeout_ms: default_article_timeout_ms(),
            log_every: default_log_every(),
            article_max_age_hours: None,
            strict_quota: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory holding the cached pages
    pub cache_dir: String,
}

/// Remote status endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteLogConfig {
    /// Base URL messages are sent to
    pub endpoint: String,

    /// Query parameter carrying the message
    #[serde(default = "default_log_param")]
    pub param: String,
}

fn default_log_param() -> String {
    "log".to_string()
}

/// A news publisher to mirror
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Short identifier, used on the command line (e.g. "bbc")
    pub name: String,

    /// Human readable name
    #[serde(default)]
    pub label: Option<String>,

    /// Canonical base URL; root-relative links resolve against it
    pub base_url: String,

    /// Domain patterns belonging to this source (e.g. "*.bbc.co.uk")
    pub domains: Vec<String>,

    /// URL prefixes that identify article pages. Empty means any page on
    /// the source's domains.
    #[serde(default)]
    pub follow_prefixes: Vec<String>,

    /// Prefix prepended to every cache filename of this source
    pub key_prefix: String,

    /// Path the cached pages are served under (e.g. "/bbc")
    pub serve_path: String,

    /// Ceiling on cached articles per run
    pub quota: u32,

    /// Section pages fetched on every run
    pub seeds: Vec<String>,
}

impl SourceConfig {
    /// Parses the canonical base URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Display name, falling back to the short name
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}
