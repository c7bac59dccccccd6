//! Cross-run article deduplication
//!
//! This module decides which extracted articles are new:
//! - Each article gets a [`SeenKey`], normally its canonical URL
//! - Keys already recorded by an earlier run are dropped
//! - Duplicates within one run are dropped, first site in id order wins
//! - Newly emitted keys are committed once per crawl

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemorySeenStore;
pub use sqlite::SqliteSeenStore;
pub use traits::{RetentionPolicy, SeenStore, StoreError, StoreResult};

use crate::article::Article;
use crate::config::DedupConfig;
use crate::report::SiteOutcome;
use crate::url::canonicalize_url;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

/// Identity of an article across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SeenKey(String);

impl SeenKey {
    /// Canonical URL of the article, or a content hash when the URL cannot
    /// be canonicalized
    ///
    /// ```
    /// use retailer_news::dedup::SeenKey;
    ///
    /// let a = SeenKey::from_parts("http://www.x.com/a/?utm_source=feed#top", "T", "S");
    /// let b = SeenKey::from_parts("https://x.com/a", "Other", "Other");
    /// assert_eq!(a, b);
    /// ```
    pub fn from_parts(url: &str, title: &str, snippet: &str) -> Self {
        match canonicalize_url(url) {
            Ok(canonical) => Self(canonical.to_string()),
            Err(_) => Self::content_hash(title, snippet),
        }
    }

    pub fn for_article(article: &Article) -> Self {
        Self::from_parts(
            article.url().as_str(),
            &article.candidate.title,
            &article.candidate.snippet,
        )
    }

    fn content_hash(title: &str, snippet: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.trim().as_bytes());
        hasher.update(b"\n");
        hasher.update(snippet.trim().as_bytes());
        Self(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filters crawl results against the seen set
///
/// One deduplicator is shared by all crawls of a process so its store carries
/// over from run to run.
pub struct Deduplicator {
    store: Mutex<Box<dyn SeenStore>>,
}

impl fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduplicator").finish_non_exhaustive()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::in_memory(RetentionPolicy::unbounded())
    }
}

impl Deduplicator {
    pub fn new(store: Box<dyn SeenStore>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn in_memory(retention: RetentionPolicy) -> Self {
        Self::new(Box::new(MemorySeenStore::with_retention(retention)))
    }

    /// Removes already-seen articles from every successful outcome
    ///
    /// Failed outcomes pass through untouched. Sites are processed in id
    /// order, so when two sites link the same article the lower id keeps it.
    /// The store is updated once, after filtering, so a failure leaves it as
    /// it was.
    pub fn dedupe(
        &self,
        per_site: BTreeMap<String, SiteOutcome>,
    ) -> StoreResult<BTreeMap<String, SiteOutcome>> {
        let mut store = self.store.lock().map_err(|_| StoreError::LockPoisoned)?;
        let now = Utc::now();

        let purged = store.purge_expired(now)?;
        if purged > 0 {
            tracing::debug!("Purged {} expired seen key(s)", purged);
        }

        let mut emitted: HashSet<SeenKey> = HashSet::new();
        let mut to_commit: Vec<(String, String)> = Vec::new();
        let mut result = BTreeMap::new();
        let mut suppressed = 0usize;

        for (site_id, outcome) in per_site {
            let outcome = match outcome {
                SiteOutcome::Articles(articles) => {
                    let mut fresh = Vec::with_capacity(articles.len());
                    for article in articles {
                        let key = SeenKey::for_article(&article);
                        if emitted.contains(&key) || store.contains(key.as_str())? {
                            suppressed += 1;
                            continue;
                        }
                        to_commit.push((key.as_str().to_string(), site_id.clone()));
                        emitted.insert(key);
                        fresh.push(article);
                    }
                    SiteOutcome::Articles(fresh)
                }
                failed @ SiteOutcome::Failed(_) => failed,
            };
            result.insert(site_id, outcome);
        }

        store.commit(&to_commit, now)?;
        tracing::debug!(
            "Dedupe kept {} new article(s), suppressed {}",
            to_commit.len(),
            suppressed
        );

        Ok(result)
    }

    /// Forgets a site's keys so its articles are reported again
    pub fn forget_source(&self, source_id: &str) -> StoreResult<usize> {
        let mut store = self.store.lock().map_err(|_| StoreError::LockPoisoned)?;
        store.forget_source(source_id)
    }

    /// Number of keys currently remembered
    pub fn seen_count(&self) -> StoreResult<usize> {
        let store = self.store.lock().map_err(|_| StoreError::LockPoisoned)?;
        store.len()
    }
}

/// Builds the deduplicator described by the `[dedup]` config section
///
/// A `database-path` selects the SQLite store, otherwise keys live in memory.
pub fn build_deduplicator(config: &DedupConfig) -> StoreResult<Deduplicator> {
    let retention = RetentionPolicy::from(config);

    match config.database_path.as_deref() {
        Some(path) => {
            let store = SqliteSeenStore::new(Path::new(path), retention)?;
            tracing::info!("Using persistent seen store at {}", path);
            Ok(Deduplicator::new(Box::new(store)))
        }
        None => Ok(Deduplicator::in_memory(retention)),
    }
}
