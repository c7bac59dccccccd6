use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawl behavior knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Per-request timeout (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles per retry (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single retry delay (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    /// Maximum redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Minimum fraction of a site's topics a candidate must match
    #[serde(rename = "relevance-threshold")]
    pub relevance_threshold: f64,

    /// Wall-clock bound on a whole crawl (milliseconds)
    #[serde(rename = "crawl-timeout-ms")]
    pub crawl_timeout_ms: u64,

    /// Maximum number of site pipelines running at once
    #[serde(rename = "worker-pool-size")]
    pub worker_pool_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            max_redirects: 10,
            relevance_threshold: 0.0,
            crawl_timeout_ms: 120_000,
            worker_pool_size: 8,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_millis(self.crawl_timeout_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "RetailerNews".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Seen-set retention configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum remembered keys, oldest evicted first (0 = unbounded)
    #[serde(rename = "max-entries")]
    pub max_entries: usize,

    /// Age after which a key is forgotten, in hours (0 = never)
    #[serde(rename = "max-age-hours")]
    pub max_age_hours: u64,

    /// SQLite file for a seen-set that survives restarts
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: 50_000,
            max_age_hours: 24 * 30,
            database_path: None,
        }
    }
}

/// A news source as written in the config file, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteEntry {
    /// Human readable name of the source
    pub name: String,

    /// Root URL to crawl
    pub url: String,

    /// Topics of interest
    #[serde(default)]
    pub topics: Vec<String>,

    /// Optional sitemap.xml whose entries add to the front-page links
    #[serde(default)]
    pub sitemap: Option<String>,

    /// Only links whose path starts with this prefix are kept
    #[serde(rename = "path-prefix", default)]
    pub path_prefix: Option<String>,
}
