//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock news sites and test the full
//! fetch, extract, filter and dedupe cycle end-to-end.

use retailer_news::config::{Config, CrawlerConfig, DedupConfig, SiteEntry};
use retailer_news::crawler::FetchError;
use retailer_news::dedup::{SeenStore, StoreError, StoreResult};
use retailer_news::{
    run_crawl, Deduplicator, NewsError, Orchestrator, SiteConfig, SiteError, SiteOutcome,
    SourceRegistry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FRONT_PAGE: &str = r#"<html><head><title>Retail Daily</title></head><body>
<nav><a href="/about">About</a><a href="/contact">Contact</a></nav>
<main>
  <article class="story">
    <h2><a href="/news/loyalty-app">Grocer launches loyalty app</a></h2>
    <time datetime="2025-05-01T10:00:00Z">1 May</time>
    <p>Shoppers collect rewards at checkout.</p>
  </article>
  <article class="story">
    <h2><a href="/news/self-checkout">Self checkout lanes expand</a></h2>
    <p>More stores add kiosks.</p>
  </article>
  <article class="story">
    <h2><a href="/news/weather">Weekend weather outlook</a></h2>
    <p>Sunny spells.</p>
  </article>
</main>
</body></html>"#;

/// Creates a test configuration with fast retries and the given sites
fn create_test_config(sites: Vec<SiteEntry>) -> Config {
    Config {
        crawler: CrawlerConfig {
            fetch_timeout_ms: 2_000,
            max_retries: 2,
            backoff_base_ms: 1,
            backoff_max_ms: 5,
            crawl_timeout_ms: 10_000,
            worker_pool_size: 4,
            ..CrawlerConfig::default()
        },
        sites,
        ..Config::default()
    }
}

fn site_entry(name: &str, url: &str, topics: &[&str]) -> SiteEntry {
    SiteEntry {
        name: name.to_string(),
        url: url.to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        ..SiteEntry::default()
    }
}

fn site(name: &str, url: &str) -> SiteConfig {
    SiteConfig::new(name, url, ["loyalty", "checkout"]).expect("valid site")
}

fn orchestrator(config: &Config) -> Orchestrator {
    Orchestrator::new(config, Arc::new(Deduplicator::default())).expect("orchestrator")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

#[tokio::test]
async fn test_end_to_end_partial_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let down_url = closed_port_url();
    let config = create_test_config(vec![
        site_entry("Down", &down_url, &["retail"]),
        site_entry("Retail Daily", &format!("{}/", server.uri()), &["loyalty", "checkout"]),
    ]);

    let report = run_crawl(&config).await.expect("crawl should succeed");
    assert_eq!(report.per_site.len(), 2);

    let down_id = SiteConfig::new("Down", &down_url, ["retail"]).unwrap().id;
    let daily_id = SourceRegistry::from_config(&config)
        .unwrap()
        .snapshot()
        .into_iter()
        .map(|s| s.id)
        .find(|id| *id != down_id)
        .unwrap();

    assert_eq!(
        report.get(&down_id),
        Some(&SiteOutcome::Failed(SiteError::Fetch(FetchError::ConnectionRefused)))
    );

    let articles = report
        .get(&daily_id)
        .and_then(SiteOutcome::articles)
        .expect("articles for the live site");
    assert_eq!(articles.len(), 2);

    // Both topics matched ranks first
    assert!(articles[0].url().path().ends_with("/news/loyalty-app"));
    assert_eq!(articles[0].relevance_score, 1.0);
    assert!(articles[0].candidate.published_at.is_some());
    assert_eq!(articles[0].candidate.snippet, "Shoppers collect rewards at checkout.");

    assert!(articles[1].url().path().ends_with("/news/self-checkout"));
    assert_eq!(articles[1].relevance_score, 0.5);

    let stats = report.stats();
    assert_eq!(stats.sites_ok, 1);
    assert_eq!(stats.sites_failed, 1);
    assert_eq!(stats.new_articles, 2);
}

#[tokio::test]
async fn test_transient_failure_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(vec![]);
    let target = site("Flaky", &format!("{}/flaky", server.uri()));

    let report = orchestrator(&config)
        .run_crawl(&[target.clone()])
        .await
        .unwrap();

    assert_eq!(
        report.get(&target.id),
        Some(&SiteOutcome::Failed(SiteError::Fetch(FetchError::HttpStatus(503))))
    );
    assert_eq!(
        requests_to(&server, "/flaky").await,
        config.crawler.max_retries as usize + 1
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(vec![]);
    let target = site("Gone", &format!("{}/gone", server.uri()));

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();

    assert_eq!(
        report.get(&target.id),
        Some(&SiteOutcome::Failed(SiteError::Fetch(FetchError::HttpStatus(404))))
    );
    assert_eq!(requests_to(&server, "/gone").await, 1);
}

#[tokio::test]
async fn test_recovers_after_transient_error() {
    let server = MockServer::start().await;

    // First request fails, later ones hit the page mock
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let config = create_test_config(vec![]);
    let target = site("Recovering", &format!("{}/", server.uri()));

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();

    let articles = report
        .get(&target.id)
        .and_then(SiteOutcome::articles)
        .expect("site should recover");
    assert_eq!(articles.len(), 2);
    assert_eq!(requests_to(&server, "/").await, 2);
}

#[tokio::test]
async fn test_redirect_loop_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![]);
    config.crawler.max_redirects = 3;
    let target = site("Loop", &format!("{}/loop", server.uri()));

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();

    assert_eq!(
        report.get(&target.id),
        Some(&SiteOutcome::Failed(SiteError::Fetch(FetchError::TooManyRedirects)))
    );
}

#[tokio::test]
async fn test_follows_redirect_to_final_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/news/"))
        .mount(&server)
        .await;
    mount_page(&server, "/news/", FRONT_PAGE).await;

    let config = create_test_config(vec![]);
    let target = site("Moved", &format!("{}/old", server.uri()));

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();
    let articles = report.get(&target.id).and_then(SiteOutcome::articles).unwrap();
    assert_eq!(articles.len(), 2);
}

#[tokio::test]
async fn test_report_has_one_entry_per_site() {
    let server = MockServer::start().await;
    let routes = ["/a", "/b", "/c", "/d", "/e", "/f"];
    for route in &routes[..4] {
        mount_page(&server, route, FRONT_PAGE).await;
    }
    // "/e" and "/f" are unmounted and answer 404

    let config = create_test_config(vec![]);
    let sites: Vec<SiteConfig> = routes
        .iter()
        .map(|r| site(r, &format!("{}{}", server.uri(), r)))
        .collect();

    let report = orchestrator(&config).run_crawl(&sites).await.unwrap();

    assert_eq!(report.per_site.len(), sites.len());
    for s in &sites {
        assert!(report.get(&s.id).is_some(), "missing outcome for {}", s.id);
    }

    let stats = report.stats();
    assert_eq!(stats.sites_ok, 4);
    assert_eq!(stats.sites_failed, 2);
    // Every site links the same articles, so only the first site keeps them
    assert_eq!(stats.new_articles, 2);
}

#[tokio::test]
async fn test_slow_site_is_cut_off_at_deadline() {
    let server = MockServer::start().await;
    for route in ["/one", "/two", "/three", "/four"] {
        mount_page(&server, route, FRONT_PAGE).await;
    }
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FRONT_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![]);
    config.crawler.crawl_timeout_ms = 1_500;
    config.crawler.fetch_timeout_ms = 60_000;

    let sites: Vec<SiteConfig> = ["/one", "/two", "/three", "/four", "/slow"]
        .iter()
        .map(|r| site(r, &format!("{}{}", server.uri(), r)))
        .collect();
    let slow_id = sites[4].id.clone();

    let started = Instant::now();
    let report = orchestrator(&config).run_crawl(&sites).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(4), "crawl took {:?}", elapsed);
    assert_eq!(report.per_site.len(), 5);
    assert_eq!(
        report.get(&slow_id),
        Some(&SiteOutcome::Failed(SiteError::Fetch(FetchError::Timeout)))
    );
    for s in &sites[..4] {
        assert!(report.get(&s.id).map(SiteOutcome::is_success).unwrap_or(false));
    }
}

#[tokio::test]
async fn test_second_crawl_suppresses_seen_articles() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let config = create_test_config(vec![]);
    let target = site("Daily", &format!("{}/", server.uri()));
    let orchestrator = orchestrator(&config);

    let first = orchestrator.run_crawl(&[target.clone()]).await.unwrap();
    assert_eq!(first.stats().new_articles, 2);
    assert_eq!(orchestrator.dedup().seen_count().unwrap(), 2);

    let second = orchestrator.run_crawl(&[target.clone()]).await.unwrap();
    assert_eq!(
        second.get(&target.id),
        Some(&SiteOutcome::Articles(vec![]))
    );
    assert_eq!(orchestrator.dedup().seen_count().unwrap(), 2);
}

#[tokio::test]
async fn test_persistent_seen_store_survives_restart() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(vec![site_entry(
        "Daily",
        &format!("{}/", server.uri()),
        &["loyalty", "checkout"],
    )]);
    config.dedup = DedupConfig {
        database_path: Some(dir.path().join("seen.db").to_string_lossy().into_owned()),
        ..DedupConfig::default()
    };

    let first = run_crawl(&config).await.unwrap();
    assert_eq!(first.stats().new_articles, 2);

    let second = run_crawl(&config).await.unwrap();
    assert_eq!(second.stats().new_articles, 0);
    assert_eq!(second.stats().sites_ok, 1);
}

#[tokio::test]
async fn test_empty_registry_is_an_error() {
    let config = create_test_config(vec![]);

    let result = run_crawl(&config).await;
    assert!(matches!(result, Err(NewsError::EmptyRegistry)));
}

#[tokio::test]
async fn test_relevance_threshold_applies() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let mut config = create_test_config(vec![]);
    config.crawler.relevance_threshold = 0.75;
    let target = site("Daily", &format!("{}/", server.uri()));

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();
    let articles = report.get(&target.id).and_then(SiteOutcome::articles).unwrap();

    assert_eq!(articles.len(), 1);
    assert!(articles[0].url().path().ends_with("/news/loyalty-app"));
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(400);
    let routes = ["/p1", "/p2", "/p3", "/p4", "/p5"];
    for route in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FRONT_PAGE)
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(vec![]);
    config.crawler.worker_pool_size = 2;
    let sites: Vec<SiteConfig> = routes
        .iter()
        .map(|r| site(r, &format!("{}{}", server.uri(), r)))
        .collect();

    let started = Instant::now();
    let report = orchestrator(&config).run_crawl(&sites).await.unwrap();
    let elapsed = started.elapsed();

    // Five sites on two workers need three rounds of the delay
    assert!(elapsed >= delay * 3, "crawl took only {:?}", elapsed);
    assert_eq!(report.stats().sites_ok, routes.len());
}

/// Seen store whose commit always fails
struct FullDiskStore;

impl SeenStore for FullDiskStore {
    fn contains(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }

    fn commit(
        &mut self,
        _entries: &[(String, String)],
        _now: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn purge_expired(&mut self, _now: chrono::DateTime<chrono::Utc>) -> StoreResult<usize> {
        Ok(0)
    }

    fn forget_source(&mut self, _source_id: &str) -> StoreResult<usize> {
        Ok(0)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(0)
    }

    fn clear(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_seen_store_failure_keeps_site_results() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let config = create_test_config(vec![]);
    let live = site("Daily", &format!("{}/", server.uri()));
    let down = site("Down", &closed_port_url());
    let dedup = Arc::new(Deduplicator::new(Box::new(FullDiskStore)));
    let orchestrator = Orchestrator::new(&config, dedup).unwrap();

    let report = orchestrator
        .run_crawl(&[live.clone(), down.clone()])
        .await
        .expect("store failure must not fail the crawl");

    assert_eq!(report.per_site.len(), 2);
    assert_eq!(
        report.get(&live.id).and_then(SiteOutcome::articles).map(<[_]>::len),
        Some(2)
    );
    assert!(matches!(report.get(&down.id), Some(SiteOutcome::Failed(_))));
}

const SITEMAP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/news/loyalty-app</loc></url>
  <url><loc>{base}/news/2025/loyalty-points-double</loc><lastmod>2025-05-02</lastmod></url>
  <url><loc>{base}/shop/checkout-deals</loc></url>
  <url><loc>{base}/news/store-opening-hours</loc></url>
</urlset>"#;

#[tokio::test]
async fn test_sitemap_adds_links_within_prefix() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SITEMAP_XML.replace("{base}", &server.uri()))
                .insert_header("content-type", "application/xml"),
        )
        .mount(&server)
        .await;

    let config = create_test_config(vec![]);
    let target = site("Daily", &format!("{}/", server.uri()))
        .with_sitemap(&format!("{}/sitemap.xml", server.uri()))
        .unwrap()
        .with_path_prefix("/news/")
        .unwrap();

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();
    let articles = report.get(&target.id).and_then(SiteOutcome::articles).unwrap();
    let paths: Vec<&str> = articles.iter().map(|a| a.url().path()).collect();

    assert_eq!(
        paths,
        vec![
            "/news/loyalty-app",
            "/news/self-checkout",
            "/news/2025/loyalty-points-double",
        ]
    );
    assert_eq!(articles[2].title(), "Loyalty points double");
    assert!(articles[2].candidate.published_at.is_some());
    assert_eq!(requests_to(&server, "/sitemap.xml").await, 1);
}

#[tokio::test]
async fn test_missing_sitemap_keeps_front_page_links() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let config = create_test_config(vec![]);
    let target = site("Daily", &format!("{}/", server.uri()))
        .with_sitemap(&format!("{}/sitemap.xml", server.uri()))
        .unwrap();

    let report = orchestrator(&config).run_crawl(&[target.clone()]).await.unwrap();
    let articles = report.get(&target.id).and_then(SiteOutcome::articles).unwrap();
    assert_eq!(articles.len(), 2);
}

#[tokio::test]
async fn test_path_prefix_from_config_entry() {
    let server = MockServer::start().await;
    mount_page(&server, "/", FRONT_PAGE).await;

    let config = create_test_config(vec![SiteEntry {
        path_prefix: Some("/elsewhere/".to_string()),
        ..site_entry("Daily", &format!("{}/", server.uri()), &["loyalty", "checkout"])
    }]);

    let report = run_crawl(&config).await.unwrap();
    assert_eq!(report.stats().sites_ok, 1);
    assert_eq!(report.stats().new_articles, 0);
}
