use crate::cache::is_valid_key;
use crate::config::types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(remote) = &config.remote_log {
        validate_http_url("remote-log endpoint", &remote.endpoint)?;
        if remote.param.is_empty() {
            return Err(ConfigError::Validation(
                "remote-log param cannot be empty".to_string(),
            ));
        }
    }
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    for (name, value) in [
        ("seed_timeout_ms", config.seed_timeout_ms),
        ("article_timeout_ms", config.article_timeout_ms),
    ] {
        if !(1_000..=60_000).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1000 and 60000, got {}",
                name, value
            )));
        }
    }

    if config.log_every < 1 {
        return Err(ConfigError::Validation(format!(
            "log_every must be >= 1, got {}",
            config.log_every
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.cache_dir.is_empty() {
        return Err(ConfigError::Validation(
            "cache_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the source list
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[source]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();

    for source in sources {
        if source.name.is_empty()
            || !source
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "source name '{}' must be non-empty and contain only [A-Za-z0-9_-]",
                source.name
            )));
        }

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }

        if !is_valid_key(&source.key_prefix) {
            return Err(ConfigError::Validation(format!(
                "key-prefix '{}' of source '{}' must be non-empty, contain only \
                 [A-Za-z0-9_.-] and not start with '.'",
                source.key_prefix, source.name
            )));
        }

        if !prefixes.insert(source.key_prefix.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate key-prefix '{}'",
                source.key_prefix
            )));
        }

        if !source.serve_path.starts_with('/') || source.serve_path.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "serve-path '{}' of source '{}' must start with '/' and not end with '/'",
                source.serve_path, source.name
            )));
        }

        if source.quota < 1 {
            return Err(ConfigError::Validation(format!(
                "quota of source '{}' must be >= 1",
                source.name
            )));
        }

        validate_http_url("base-url", &source.base_url)?;

        if source.domains.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' must list at least one domain",
                source.name
            )));
        }

        for pattern in &source.domains {
            validate_domain_pattern(pattern)?;
        }

        for prefix in &source.follow_prefixes {
            validate_http_url("follow-prefix", prefix)?;
        }

        if source.seeds.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' must have at least one seed URL",
                source.name
            )));
        }

        for seed in &source.seeds {
            validate_http_url("seed URL", seed)?;
        }
    }

    // Clearing one source removes every key starting with its prefix
    for a in sources {
        for b in sources {
            if a.name != b.name && b.key_prefix.starts_with(&a.key_prefix) {
                return Err(ConfigError::Validation(format!(
                    "key-prefix '{}' of source '{}' overlaps key-prefix '{}' of source '{}'",
                    a.key_prefix, a.name, b.key_prefix, b.name
                )));
            }
        }
    }

    Ok(())
}

/// Validates that a string is an absolute http(s) URL without a fragment
fn validate_http_url(what: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    if url.fragment().is_some() {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must not contain a fragment",
            what, value
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    // Check if it's a wildcard pattern
    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
