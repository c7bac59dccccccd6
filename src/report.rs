//! Crawl report types
//!
//! A [`CrawlReport`] holds exactly one [`SiteOutcome`] per site of the registry
//! snapshot the crawl was started with: either the new articles found on that
//! site or the error that stopped its pipeline.

use crate::article::Article;
use crate::crawler::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A recorded, non-fatal failure of one site's pipeline
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SiteError {
    /// Fetching the site failed after retries, or the crawl deadline passed
    #[error("fetch failed: {0}")]
    Fetch(FetchError),

    /// The pipeline task was cancelled or panicked
    #[error("pipeline aborted: {0}")]
    Aborted(String),
}

impl From<FetchError> for SiteError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

/// Terminal result of one site's pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteOutcome {
    Articles(Vec<Article>),
    Failed(SiteError),
}

impl SiteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Articles(_))
    }

    pub fn articles(&self) -> Option<&[Article]> {
        match self {
            Self::Articles(articles) => Some(articles),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SiteError> {
        match self {
            Self::Articles(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

/// Per-run aggregate of all sites' outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Keyed by site id, so consumers never depend on completion order
    pub per_site: BTreeMap<String, SiteOutcome>,
}

/// Counters derived from a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub sites_total: usize,
    pub sites_ok: usize,
    pub sites_failed: usize,
    pub new_articles: usize,
}

impl CrawlReport {
    pub fn get(&self, site_id: &str) -> Option<&SiteOutcome> {
        self.per_site.get(site_id)
    }

    pub fn stats(&self) -> CrawlStats {
        let mut stats = CrawlStats {
            sites_total: self.per_site.len(),
            ..CrawlStats::default()
        };

        for outcome in self.per_site.values() {
            match outcome {
                SiteOutcome::Articles(articles) => {
                    stats.sites_ok += 1;
                    stats.new_articles += articles.len();
                }
                SiteOutcome::Failed(_) => stats.sites_failed += 1,
            }
        }

        stats
    }

    /// Wall-clock duration of the crawl
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// All articles across sites, in site-id order
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.per_site
            .values()
            .filter_map(SiteOutcome::articles)
            .flatten()
    }
}
