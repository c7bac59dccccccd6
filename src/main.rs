//! Retailer News main entry point
//!
//! This is the command-line interface for the retail-news crawler.

use anyhow::Context;
use clap::Parser;
use retailer_news::config::{load_config_with_hash, Config};
use retailer_news::dedup::build_deduplicator;
use retailer_news::output::{write_json, write_markdown_report};
use retailer_news::{CrawlReport, Orchestrator, SourceRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

/// Retailer News: a topic-filtered crawler for retail-news sites
///
/// Fetches the front page of every configured site, keeps the article links
/// that match the site's topics and reports the ones not seen before.
#[derive(Parser, Debug)]
#[command(name = "retailer-news")]
#[command(version)]
#[command(about = "A topic-filtered retail-news crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and list the sites without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the full report as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write a markdown digest to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Repeat the crawl every SECS seconds until interrupted
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let registry = SourceRegistry::from_config(&config)?;

    if cli.dry_run {
        handle_dry_run(&config, &registry);
        return Ok(());
    }

    handle_crawl(&cli, &config, &registry).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("retailer_news=info,warn"),
            1 => EnvFilter::new("retailer_news=debug,info"),
            2 => EnvFilter::new("retailer_news=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, registry: &SourceRegistry) {
    println!("=== Retailer News Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Worker pool size: {}", config.crawler.worker_pool_size);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Crawl timeout: {}ms", config.crawler.crawl_timeout_ms);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Relevance threshold: {:.2}",
        config.crawler.relevance_threshold
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSeen Store:");
    match &config.dedup.database_path {
        Some(path) => println!("  SQLite: {}", path),
        None => println!("  In memory"),
    }

    println!("\nSites ({} of {} valid):", registry.len(), config.sites.len());
    for site in registry.snapshot() {
        println!("  - {} [{}] {}", site.name, site.id, site.root_url);
        if let Some(sitemap) = &site.sitemap {
            println!("    sitemap: {}", sitemap);
        }
        if let Some(prefix) = &site.path_prefix {
            println!("    path prefix: {}", prefix);
        }
        println!(
            "    topics: {}",
            site.topics.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Runs one crawl, or repeats it when an interval is given
async fn handle_crawl(cli: &Cli, config: &Config, registry: &SourceRegistry) -> anyhow::Result<()> {
    let dedup = Arc::new(build_deduplicator(&config.dedup)?);
    let orchestrator = Orchestrator::new(config, dedup)?;
    let sites = registry.snapshot();

    let Some(secs) = cli.interval else {
        let report = orchestrator.run_crawl(&sites).await?;
        return write_outputs(cli, &report);
    };

    let mut ticker = crawl_ticker(secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = &mut shutdown => break,
            result = orchestrator.run_crawl(&sites) => match result {
                Ok(report) => {
                    if let Err(e) = write_outputs(cli, &report) {
                        tracing::error!("Failed to write report: {:#}", e);
                    }
                }
                Err(e) => tracing::error!("Crawl failed: {}", e),
            },
        }
    }

    tracing::info!("Interrupted, stopping");
    Ok(())
}

/// Ticks every `secs` seconds; a crawl overrunning the interval pushes the
/// next tick back rather than firing the missed ones at once
fn crawl_ticker(secs: u64) -> Interval {
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn write_outputs(cli: &Cli, report: &CrawlReport) -> anyhow::Result<()> {
    if let Some(path) = &cli.json {
        write_json(report, path).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if let Some(path) = &cli.summary {
        write_markdown_report(report, path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Digest written to {}", path.display());
    }

    if cli.json.is_none() && cli.summary.is_none() {
        for article in report.articles() {
            println!("{}\t{}", article.url(), article.title());
        }
    }

    Ok(())
}
