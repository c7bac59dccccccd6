use crate::config::types::{Config, CrawlerConfig, DedupConfig, SiteEntry, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the crawl settings of a configuration
///
/// Site entries are checked one by one when the registry is built, so a single
/// malformed site does not invalidate the whole file.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_dedup_config(&config.dedup)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_pool_size < 1 || config.worker_pool_size > 64 {
        return Err(ConfigError::Validation(format!(
            "worker_pool_size must be between 1 and 64, got {}",
            config.worker_pool_size
        )));
    }

    if config.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.crawl_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "crawl_timeout_ms must be > 0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.relevance_threshold) {
        return Err(ConfigError::Validation(format!(
            "relevance_threshold must be within [0, 1], got {}",
            config.relevance_threshold
        )));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must be >= backoff_base_ms ({})",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

fn validate_dedup_config(config: &DedupConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.database_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "dedup database_path cannot be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates a single site entry and returns its parsed root URL
///
/// A site needs a non-empty name, an absolute http(s) URL with a host, and at
/// least one non-blank topic.
pub fn validate_site_entry(entry: &SiteEntry) -> Result<Url, ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "Site '{}' must have a name",
            entry.url
        )));
    }

    let url = Url::parse(entry.url.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", entry.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Site URL '{}' must use http or https",
            entry.url
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Site URL '{}' has no host",
            entry.url
        )));
    }

    if entry.topics.iter().all(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "Site '{}' must have at least one topic",
            entry.name
        )));
    }

    if let Some(prefix) = &entry.path_prefix {
        if !prefix.trim().starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Site '{}' path-prefix must start with '/', got '{}'",
                entry.name, prefix
            )));
        }
    }

    validate_sitemap_url(entry)?;

    Ok(url)
}

/// Parses the optional sitemap URL of a site entry
pub fn validate_sitemap_url(entry: &SiteEntry) -> Result<Option<Url>, ConfigError> {
    let Some(raw) = entry.sitemap.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid sitemap URL '{}': {}", raw, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Sitemap URL '{}' must use http or https",
            raw
        )));
    }

    Ok(Some(url))
}
