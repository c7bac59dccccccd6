//! Source registry: the set of news sites a crawl covers
//!
//! Raw `[[site]]` entries are validated here, at the boundary, so the crawl
//! engine only ever sees well-formed [`SiteConfig`] values.

use crate::config::{validate_site_entry, validate_sitemap_url, Config, SiteEntry};
use crate::url::derive_site_id;
use crate::ConfigError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use url::Url;

/// A validated news source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    /// Stable identifier derived from the root URL
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Front page fetched on every crawl
    pub root_url: Url,

    /// Topic keywords, trimmed and never empty
    pub topics: BTreeSet<String>,

    /// Sitemap read alongside the front page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap: Option<Url>,

    /// Links outside this path prefix are ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl SiteConfig {
    /// Builds a validated site from its parts
    ///
    /// ```
    /// use retailer_news::SiteConfig;
    ///
    /// let site = SiteConfig::new("Gazette", "https://www.example.com/news/", ["retail"]).unwrap();
    /// assert_eq!(site.id, "example.com-news");
    /// ```
    pub fn new<I, S>(name: &str, url: &str, topics: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_entry(&SiteEntry {
            name: name.to_string(),
            url: url.to_string(),
            topics: topics.into_iter().map(Into::into).collect(),
            ..SiteEntry::default()
        })
    }

    /// Adds a sitemap whose entries are read alongside the front page
    pub fn with_sitemap(mut self, sitemap: &str) -> Result<Self, ConfigError> {
        self.sitemap = validate_sitemap_url(&SiteEntry {
            sitemap: Some(sitemap.to_string()),
            ..SiteEntry::default()
        })?;
        Ok(self)
    }

    /// Restricts extracted links to paths starting with `prefix`
    pub fn with_path_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.trim();
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path-prefix must start with '/', got '{}'",
                prefix
            )));
        }
        self.path_prefix = Some(prefix.to_string());
        Ok(self)
    }

    /// True when `url` falls under the site's path prefix, if it has one
    ///
    /// ```
    /// use retailer_news::SiteConfig;
    /// use url::Url;
    ///
    /// let site = SiteConfig::new("Gazette", "https://example.com/", ["retail"])
    ///     .unwrap()
    ///     .with_path_prefix("/blog/")
    ///     .unwrap();
    /// assert!(site.in_scope(&Url::parse("https://example.com/blog/story").unwrap()));
    /// assert!(!site.in_scope(&Url::parse("https://example.com/shop/deal").unwrap()));
    /// ```
    pub fn in_scope(&self, url: &Url) -> bool {
        self.path_prefix
            .as_deref()
            .map_or(true, |prefix| url.path().starts_with(prefix))
    }

    /// Validates a raw config entry
    pub fn from_entry(entry: &SiteEntry) -> Result<Self, ConfigError> {
        let root_url = validate_site_entry(entry)?;
        let id = derive_site_id(&root_url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Cannot derive site id from '{}'", entry.url))
        })?;

        let topics = entry
            .topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let path_prefix = entry
            .path_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            id,
            name: entry.name.trim().to_string(),
            root_url,
            topics,
            sitemap: validate_sitemap_url(entry)?,
            path_prefix,
        })
    }
}

/// In-memory mapping of site id to site descriptor
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sites: BTreeMap<String, SiteConfig>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from the `[[site]]` entries of a loaded config
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::from_entries(&config.sites)
    }

    /// Builds a registry from raw entries
    ///
    /// Malformed and duplicate entries are logged and skipped. When entries were
    /// supplied but none of them is usable the whole snapshot is rejected.
    pub fn from_entries(entries: &[SiteEntry]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        for entry in entries {
            let site = match SiteConfig::from_entry(entry) {
                Ok(site) => site,
                Err(e) => {
                    tracing::warn!("Skipping site '{}': {}", entry.name, e);
                    continue;
                }
            };

            if let Err(e) = registry.add(site) {
                tracing::warn!("Skipping site '{}': {}", entry.name, e);
            }
        }

        if registry.is_empty() && !entries.is_empty() {
            return Err(ConfigError::Validation(format!(
                "none of the {} configured sites is valid",
                entries.len()
            )));
        }

        Ok(registry)
    }

    /// Registers a new site; the root URL and derived id must both be unused
    pub fn add(&mut self, site: SiteConfig) -> Result<(), ConfigError> {
        if self.sites.contains_key(&site.id)
            || self.sites.values().any(|s| s.root_url == site.root_url)
        {
            return Err(ConfigError::DuplicateSite(site.root_url.to_string()));
        }

        tracing::debug!("Registered site {} ({})", site.id, site.root_url);
        self.sites.insert(site.id.clone(), site);
        Ok(())
    }

    /// Inserts or overwrites a site, returning the previous descriptor
    ///
    /// Callers should reset the site's seen keys when a descriptor changes.
    pub fn replace(&mut self, site: SiteConfig) -> Option<SiteConfig> {
        self.sites.insert(site.id.clone(), site)
    }

    /// Removes a site by id or by root URL
    pub fn remove(&mut self, key: &str) -> Option<SiteConfig> {
        if let Some(site) = self.sites.remove(key) {
            return Some(site);
        }

        let parsed = Url::parse(key.trim()).ok()?;
        let id = self
            .sites
            .values()
            .find(|s| s.root_url == parsed)
            .map(|s| s.id.clone())?;
        self.sites.remove(&id)
    }

    pub fn get(&self, id: &str) -> Option<&SiteConfig> {
        self.sites.get(id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Returns an owned copy of the registered sites, ordered by id
    pub fn snapshot(&self) -> Vec<SiteConfig> {
        self.sites.values().cloned().collect()
    }

    /// Distinct topics across all sites in first-seen order
    pub fn iter_topics(&self) -> impl Iterator<Item = &str> {
        let mut seen: HashSet<&String> = HashSet::new();
        self.sites
            .values()
            .flat_map(|s| s.topics.iter())
            .filter(move |t| seen.insert(*t))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, url: &str, topics: &[&str]) -> SiteEntry {
        SiteEntry {
            name: name.to_string(),
            url: url.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            ..SiteEntry::default()
        }
    }

    #[test]
    fn test_site_config_trims_topics() {
        let site = SiteConfig::new("Gazette", "https://example.com/", [" retail ", "", "stores"])
            .unwrap();
        assert_eq!(
            site.topics.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["retail", "stores"]
        );
    }

    #[test]
    fn test_add_rejects_duplicate_url() {
        let mut registry = SourceRegistry::new();
        registry
            .add(SiteConfig::new("A", "https://example.com/", ["retail"]).unwrap())
            .unwrap();
        let result = registry.add(SiteConfig::new("B", "https://example.com", ["other"]).unwrap());
        assert!(matches!(result, Err(ConfigError::DuplicateSite(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_by_id_and_url() {
        let mut registry = SourceRegistry::new();
        registry
            .add(SiteConfig::new("A", "https://a.com/", ["retail"]).unwrap())
            .unwrap();
        registry
            .add(SiteConfig::new("B", "https://b.com/news", ["retail"]).unwrap())
            .unwrap();

        assert_eq!(registry.remove("a.com").map(|s| s.name), Some("A".to_string()));
        assert_eq!(
            registry.remove("https://b.com/news").map(|s| s.name),
            Some("B".to_string())
        );
        assert!(registry.remove("https://c.com/").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut registry = SourceRegistry::new();
        registry
            .add(SiteConfig::new("A", "https://a.com/", ["retail"]).unwrap())
            .unwrap();
        let previous = registry.replace(SiteConfig::new("A2", "https://a.com/", ["stores"]).unwrap());
        assert_eq!(previous.map(|s| s.name), Some("A".to_string()));
        assert_eq!(registry.get("a.com").map(|s| s.name.as_str()), Some("A2"));
    }

    #[test]
    fn test_from_entries_skips_malformed() {
        let registry = SourceRegistry::from_entries(&[
            entry("Good", "https://good.com/", &["retail"]),
            entry("No topics", "https://notopics.com/", &[]),
            entry("Bad url", "not a url", &["retail"]),
        ])
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("good.com").is_some());
    }

    #[test]
    fn test_from_entries_all_malformed_is_error() {
        let result = SourceRegistry::from_entries(&[entry("Bad", "nope", &["retail"])]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_entries_empty_is_empty_registry() {
        let registry = SourceRegistry::from_entries(&[]).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_iter_topics_distinct() {
        let registry = SourceRegistry::from_entries(&[
            entry("A", "https://a.com/", &["retail", "stores"]),
            entry("B", "https://b.com/", &["stores", "loyalty"]),
        ])
        .unwrap();

        let topics: Vec<&str> = registry.iter_topics().collect();
        assert_eq!(topics, vec!["retail", "stores", "loyalty"]);
    }

    #[test]
    fn test_from_entry_keeps_sitemap_and_prefix() {
        let site = SiteConfig::from_entry(&SiteEntry {
            sitemap: Some("https://a.com/sitemap.xml".to_string()),
            path_prefix: Some(" /news/ ".to_string()),
            ..entry("A", "https://a.com/", &["retail"])
        })
        .unwrap();

        assert_eq!(site.sitemap.as_ref().map(Url::as_str), Some("https://a.com/sitemap.xml"));
        assert_eq!(site.path_prefix.as_deref(), Some("/news/"));
        assert!(site.in_scope(&Url::parse("https://a.com/news/x").unwrap()));
        assert!(!site.in_scope(&Url::parse("https://a.com/about").unwrap()));
    }

    #[test]
    fn test_with_path_prefix_rejects_relative() {
        let site = SiteConfig::new("A", "https://a.com/", ["retail"]).unwrap();
        assert!(site.clone().with_path_prefix("news").is_err());
        assert!(site.in_scope(&Url::parse("https://a.com/anything").unwrap()));
    }
}
