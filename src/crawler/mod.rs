//! Crawler module: the per-site pipeline and its orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - Article-link extraction from HTML and sitemaps
//! - Topic relevance filtering
//! - Concurrent crawl orchestration with a deadline

mod coordinator;
mod extractor;
mod fetcher;
pub mod relevance;
mod sitemap;

pub use coordinator::Orchestrator;
pub use extractor::{extract, extract_with_base, ExtractionOutcome};
pub use fetcher::{
    build_http_client, fetch_site, fetch_url, FetchError, FetchPolicy, FetchedPage,
};
pub use sitemap::{parse_sitemap, MAX_SITEMAP_ENTRIES};

use crate::config::Config;
use crate::dedup::build_deduplicator;
use crate::registry::SourceRegistry;
use crate::report::CrawlReport;
use crate::NewsError;
use std::sync::Arc;

/// Runs a single crawl over every site in the config
///
/// This is the one-shot entry point. It will:
/// 1. Build the source registry from the `[[site]]` entries
/// 2. Open the seen store described by `[dedup]`
/// 3. Fetch, extract and filter every site concurrently
/// 4. Drop articles reported by earlier runs
///
/// Long-running callers should keep an [`Orchestrator`] instead so the
/// in-memory seen set survives between crawls.
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, NewsError> {
    let registry = SourceRegistry::from_config(config)?;
    let dedup = Arc::new(build_deduplicator(&config.dedup)?);
    let orchestrator = Orchestrator::new(config, dedup)?;
    orchestrator.run_crawl(&registry.snapshot()).await
}
