//! Crawl orchestration
//!
//! One crawl runs every site of a registry snapshot through its own pipeline:
//!
//! ```text
//! Pending -> Fetching -> Extracting -> Filtering -> Done
//!                \            \            \
//!                 +------------+------------+--> Failed
//! ```
//!
//! A site with a sitemap has it fetched during `Fetching`; a sitemap failure
//! only loses the sitemap's links.
//!
//! Pipelines run concurrently on a bounded worker pool. A failing site is
//! recorded in the report and never affects the others. When the crawl
//! deadline passes, every unfinished pipeline is cancelled and recorded as
//! timed out.

use crate::article::Article;
use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::extract_with_base;
use crate::crawler::fetcher::{build_http_client, fetch_site, fetch_url, FetchError, FetchPolicy};
use crate::crawler::relevance;
use crate::crawler::sitemap::parse_sitemap;
use crate::dedup::Deduplicator;
use crate::registry::SiteConfig;
use crate::report::{CrawlReport, SiteError, SiteOutcome};
use crate::state::{InvalidTransition, PipelineStage, StageTracker};
use crate::NewsError;
use chrono::Utc;
use reqwest::Client;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Settings shared by every pipeline of one crawl
struct PipelineContext {
    client: Client,
    policy: FetchPolicy,
    relevance_threshold: f64,
}

/// Runs crawls over registry snapshots
///
/// The orchestrator owns the HTTP client and a shared [`Deduplicator`], so
/// reusing one orchestrator across crawls suppresses articles reported earlier.
pub struct Orchestrator {
    client: Client,
    settings: CrawlerConfig,
    dedup: Arc<Deduplicator>,
}

impl Orchestrator {
    /// Creates an orchestrator with a client built from the config
    pub fn new(config: &Config, dedup: Arc<Deduplicator>) -> Result<Self, NewsError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        Ok(Self::with_client(client, config.crawler.clone(), dedup))
    }

    /// Creates an orchestrator around an existing client
    pub fn with_client(client: Client, settings: CrawlerConfig, dedup: Arc<Deduplicator>) -> Self {
        Self {
            client,
            settings,
            dedup,
        }
    }

    pub fn dedup(&self) -> &Arc<Deduplicator> {
        &self.dedup
    }

    /// Crawls every site in `sites` and returns one outcome per site
    ///
    /// The report always has exactly one entry per distinct site id. Only an
    /// empty snapshot fails the crawl as a whole. When the seen store fails,
    /// the report carries every relevant article and nothing is recorded.
    pub async fn run_crawl(&self, sites: &[SiteConfig]) -> Result<CrawlReport, NewsError> {
        if sites.is_empty() {
            return Err(NewsError::EmptyRegistry);
        }

        let started_at = Utc::now();
        let deadline = Instant::now() + self.settings.crawl_timeout();
        let cancel = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(self.settings.worker_pool_size.max(1)));
        let context = Arc::new(PipelineContext {
            client: self.client.clone(),
            policy: FetchPolicy::from(&self.settings),
            relevance_threshold: self.settings.relevance_threshold,
        });

        tracing::info!(
            "Starting crawl of {} site(s), {} worker(s)",
            sites.len(),
            self.settings.worker_pool_size
        );

        let mut pending: Vec<String> = Vec::with_capacity(sites.len());
        let mut tasks = JoinSet::new();

        for site in sites {
            if pending.contains(&site.id) {
                tracing::warn!("Site {} listed twice in snapshot, crawling once", site.id);
                continue;
            }
            pending.push(site.id.clone());

            let site = site.clone();
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.child_token();

            tasks.spawn(async move {
                let outcome = run_site(&context, &site, semaphore, cancel).await;
                (site.id, outcome)
            });
        }

        let mut per_site: BTreeMap<String, SiteOutcome> = BTreeMap::new();
        let mut deadline_hit = false;

        loop {
            let next = tokio::time::timeout_at(deadline, tasks.join_next()).await;
            match next {
                Ok(Some(Ok((id, outcome)))) => {
                    per_site.insert(id, outcome);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Site pipeline task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Crawl deadline of {:?} reached with {} site(s) unfinished",
                        self.settings.crawl_timeout(),
                        tasks.len()
                    );
                    deadline_hit = true;
                    cancel.cancel();
                    tasks.abort_all();
                    break;
                }
            }
        }

        for id in pending {
            per_site.entry(id).or_insert_with(|| {
                if deadline_hit {
                    SiteOutcome::Failed(SiteError::Fetch(FetchError::Timeout))
                } else {
                    SiteOutcome::Failed(SiteError::Aborted("pipeline task panicked".to_string()))
                }
            });
        }

        let per_site = match self.dedup.dedupe(per_site.clone()) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!("Seen store failed, reporting without dedupe: {}", e);
                per_site
            }
        };

        let report = CrawlReport {
            started_at,
            finished_at: Utc::now(),
            per_site,
        };

        let stats = report.stats();
        tracing::info!(
            "Crawl finished in {}ms: {} ok, {} failed, {} new article(s)",
            report.duration().num_milliseconds(),
            stats.sites_ok,
            stats.sites_failed,
            stats.new_articles
        );

        Ok(report)
    }
}

fn stage_error(e: InvalidTransition) -> SiteError {
    SiteError::Aborted(e.to_string())
}

/// Runs one site's pipeline once a worker slot is free
async fn run_site(
    context: &PipelineContext,
    site: &SiteConfig,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> SiteOutcome {
    let _permit = tokio::select! {
        _ = cancel.cancelled() => {
            return SiteOutcome::Failed(SiteError::Fetch(FetchError::Timeout));
        }
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                return SiteOutcome::Failed(SiteError::Aborted("worker pool closed".to_string()));
            }
        },
    };

    let mut tracker = StageTracker::new(site.id.clone());

    match process_site(context, site, &cancel, &mut tracker).await {
        Ok(articles) => {
            tracing::info!("{}: {} relevant article(s)", site.id, articles.len());
            SiteOutcome::Articles(articles)
        }
        Err(e) => {
            tracing::warn!("{}: failed during {}: {}", site.id, tracker.stage(), e);
            if let Err(e) = tracker.advance(PipelineStage::Failed) {
                tracing::debug!("{}: {}", site.id, e);
            }
            SiteOutcome::Failed(e)
        }
    }
}

async fn process_site(
    context: &PipelineContext,
    site: &SiteConfig,
    cancel: &CancellationToken,
    tracker: &mut StageTracker,
) -> Result<Vec<Article>, SiteError> {
    tracker.advance(PipelineStage::Fetching).map_err(stage_error)?;

    let page = tokio::select! {
        _ = cancel.cancelled() => return Err(FetchError::Timeout.into()),
        result = fetch_site(&context.client, site, &context.policy) => result?,
    };

    let sitemap = match &site.sitemap {
        Some(url) => tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Timeout.into()),
            result = fetch_url(&context.client, url, &context.policy) => match result {
                Ok(page) => Some(page.body),
                Err(e) => {
                    tracing::warn!("{}: sitemap {} skipped: {}", site.id, url, e);
                    None
                }
            },
        },
        None => None,
    };

    tracker.advance(PipelineStage::Extracting).map_err(stage_error)?;

    let extraction_site = site.clone();
    let candidates = tokio::task::spawn_blocking(move || {
        let mut candidates =
            extract_with_base(&page.body, &extraction_site, &page.final_url).into_candidates();

        if let Some(body) = sitemap {
            let mut known: HashSet<String> =
                candidates.iter().map(|c| c.url.to_string()).collect();
            candidates.extend(
                parse_sitemap(&body, &extraction_site)
                    .into_iter()
                    .filter(|c| known.insert(c.url.to_string())),
            );
        }

        candidates
    })
    .await
    .map_err(|e| SiteError::Aborted(format!("extraction task failed: {}", e)))?;

    if cancel.is_cancelled() {
        return Err(FetchError::Timeout.into());
    }

    tracker.advance(PipelineStage::Filtering).map_err(stage_error)?;
    let articles = relevance::filter(candidates, &site.topics, context.relevance_threshold);

    tracker.advance(PipelineStage::Done).map_err(stage_error)?;
    Ok(articles)
}
