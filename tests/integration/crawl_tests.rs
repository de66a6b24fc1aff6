//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock blog servers and test
//! the full crawl cycle end-to-end.

use blog_harvester::config::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, OutputConfig, SiteConfig,
};
use blog_harvester::crawler::{Coordinator, StopReason};
use blog_harvester::storage::{CrawlCache, JsonCorpusStore, PostStore};
use blog_harvester::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const BODY: &str = "A reasonably long paragraph of post content, comfortably longer than \
                    the minimum content length so the extractor keeps it.";

/// Creates a test configuration for a mock blog at `base_url`
fn create_test_config(base_url: &str, dir: &TempDir, with_cache: bool) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            seeds: vec![],
            listing_templates: vec![],
            listing_page_size: 20,
            reseed_window: 2,
            max_listing_pages: 10,
        },
        crawler: CrawlerConfig {
            workers: 2,
            batch_multiplier: 2,
            target_posts: 1000,
            max_empty_rounds: 3,
        },
        fetcher: FetcherConfig {
            retries: Some(2),
            timeout_secs: 5,
            delay_min_ms: Some(0),
            delay_max_ms: Some(0),
            backoff_min_ms: Some(0),
            backoff_max_ms: Some(0),
            ..FetcherConfig::default()
        },
        extractor: ExtractorConfig::default(),
        output: OutputConfig {
            corpus_path: dir.path().join("blog_data.json").display().to_string(),
            cache_path: with_cache
                .then(|| dir.path().join("crawl_cache.json").display().to_string()),
        },
    }
}

fn post_html(slug: &str, title: &str) -> String {
    format!(
        r#"<div class="post">
             <h3 class="post-title"><a href="/posts/{slug}">{title}</a></h3>
             <span class="date">2024-03-15</span>
             <div class="post-body"><p>{body}</p></div>
           </div>"#,
        slug = slug,
        title = title,
        body = BODY
    )
}

fn page_html(posts: &[(&str, &str)], older: Option<&str>) -> String {
    let posts: String = posts
        .iter()
        .map(|(slug, title)| post_html(slug, title))
        .collect();
    let pager = older
        .map(|href| format!(r#"<a class="blog-pager-older-link" href="{}">Older Posts</a>"#, href))
        .unwrap_or_default();

    format!("<html><body>{}{}</body></html>", posts, pager)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html")
}

/// Mounts a two-page blog: the home page links to /page/2 as older posts
async fn mount_two_page_blog(server: &MockServer, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page_html(
            &[("alpha", "Alpha"), ("beta", "Beta")],
            Some("/page/2"),
        )))
        .expect(expected_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(html(page_html(&[("gamma", "Gamma"), ("delta", "Delta")], None)))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_follows_pagination() {
    let server = MockServer::start().await;
    mount_two_page_blog(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir, false);
    let corpus_path = config.output.corpus_path.clone();

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.accepted, 4);
    assert_eq!(summary.failed, 0);

    // The snapshot on disk holds every accepted post
    let store = JsonCorpusStore::open(Path::new(&corpus_path)).unwrap();
    assert_eq!(store.len(), 4);

    let newest = store.list_posts(1, 10);
    assert_eq!(newest.posts[0].title, "Delta");
    assert_eq!(
        newest.posts[0].url,
        format!("{}/posts/delta", server.uri())
    );
    assert_eq!(
        newest.posts[0].publish_date,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
    );
}

#[tokio::test]
async fn test_all_failing_seeds_terminate_after_empty_rounds() {
    // No mocks mounted: every request gets a 404
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &dir, true);
    config.site.seeds = vec![
        format!("{}/seed-one", server.uri()),
        format!("{}/seed-two", server.uri()),
    ];
    config.crawler.workers = 1;
    config.crawler.batch_multiplier = 1;
    let cache_path = config.output.cache_path.clone().unwrap();

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert!(summary.rounds <= 3);
    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.stop_reason, StopReason::EmptyRounds);

    let cache = CrawlCache::load(Path::new(&cache_path)).unwrap().unwrap();
    assert_eq!(cache.failed.len(), 3);
    assert_eq!(cache.visited.len(), 3);
}

#[tokio::test]
async fn test_restart_with_cache_does_not_refetch() {
    let server = MockServer::start().await;
    // Each page is fetched exactly once across both runs
    mount_two_page_blog(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();

    let first = Coordinator::new(create_test_config(&server.uri(), &dir, true), false)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.accepted, 4);

    let mut coordinator =
        Coordinator::new(create_test_config(&server.uri(), &dir, true), false).unwrap();
    let second = coordinator.run().await.unwrap();

    assert_eq!(second.rounds, 0);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(coordinator.store().len(), 4);
}

#[tokio::test]
async fn test_fresh_restart_refetches_without_duplicating() {
    let server = MockServer::start().await;
    mount_two_page_blog(&server, 2).await;

    let dir = tempfile::tempdir().unwrap();

    let first = Coordinator::new(create_test_config(&server.uri(), &dir, true), false)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.accepted, 4);

    let mut coordinator =
        Coordinator::new(create_test_config(&server.uri(), &dir, true), true).unwrap();
    let second = coordinator.run().await.unwrap();

    assert_eq!(second.fetched, 2);
    assert_eq!(second.accepted, 0);
    assert_eq!(coordinator.store().len(), 4);
}

#[tokio::test]
async fn test_duplicate_posts_across_listing_pages_accepted_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page_html(&[], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "1"))
        .respond_with(html(page_html(&[("shared", "Shared"), ("one", "One")], None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "2"))
        .respond_with(html(page_html(&[("shared", "Shared"), ("two", "Two")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &dir, false);
    config.site.listing_templates = vec![format!("{}/list?page={{page}}", server.uri())];
    config.site.max_listing_pages = 2;

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 3);
    let store = coordinator.store();
    assert_eq!(store.len(), 3);
    assert_eq!(store.search_posts("shared", 1, 10).total, 1);
}

#[tokio::test]
async fn test_reseeds_from_listing_template_when_frontier_dries_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page_html(&[], None)))
        .mount(&server)
        .await;
    for page in 1..=3 {
        let slug = format!("post-{}", page);
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(query_param("page", page.to_string()))
            .respond_with(html(page_html(&[(slug.as_str(), "Listed")], None)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &dir, false);
    config.site.listing_templates = vec![format!("{}/list?page={{page}}", server.uri())];
    config.site.reseed_window = 1;
    config.site.max_listing_pages = 3;

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
}

#[tokio::test]
async fn test_stops_when_target_reached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page_html(
            &[("alpha", "Alpha"), ("beta", "Beta")],
            Some("/page/2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(html(page_html(&[("gamma", "Gamma")], None)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &dir, false);
    config.crawler.target_posts = 2;

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::TargetReached);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.rounds, 1);
}

#[tokio::test]
async fn test_shutdown_before_first_round() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(page_html(&[("alpha", "Alpha")], None)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir, false);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    coordinator.shutdown_handle().store(true, Ordering::SeqCst);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Interrupted);
    assert_eq!(summary.fetched, 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried_then_recorded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir, false);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.accepted, 0);
}

#[tokio::test]
async fn test_final_snapshot_failure_still_reports_counts() {
    // No mocks mounted: the seed gets a 404
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir, false);
    let corpus_path = PathBuf::from(&config.output.corpus_path);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    // A directory where the snapshot should go makes every write fail
    std::fs::create_dir(&corpus_path).unwrap();

    match coordinator.run().await {
        Err(HarvestError::FinalFlush { summary, .. }) => {
            assert_eq!(summary.fetched, 1);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.accepted, 0);
            assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
        }
        other => panic!("expected FinalFlush, got {:?}", other),
    }
}

/// Serves a page after clearing the directory blocking the corpus snapshot
struct UnblockCorpus {
    corpus_path: PathBuf,
    body: String,
}

impl Respond for UnblockCorpus {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let _ = std::fs::remove_dir(&self.corpus_path);
        html(self.body.clone())
    }
}

/// Serves a page after recording how many posts the snapshot on disk holds
struct RecordSnapshot {
    corpus_path: PathBuf,
    seen: Arc<Mutex<Option<usize>>>,
    body: String,
}

impl Respond for RecordSnapshot {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let stored = JsonCorpusStore::open(&self.corpus_path)
            .map(|store| store.len())
            .ok();
        *self.seen.lock().unwrap() = stored;
        html(self.body.clone())
    }
}

#[tokio::test]
async fn test_failed_round_snapshot_is_retried_next_round() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir, false);
    let corpus_path = PathBuf::from(&config.output.corpus_path);
    let seen = Arc::new(Mutex::new(None));

    // Round 1 accepts two posts, but the snapshot is blocked
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page_html(
            &[("alpha", "Alpha"), ("beta", "Beta")],
            Some("/page/2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Round 2 unblocks the snapshot and accepts nothing
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(UnblockCorpus {
            corpus_path: corpus_path.clone(),
            body: page_html(&[], Some("/page/3")),
        })
        .expect(1)
        .mount(&server)
        .await;

    // Round 3 sees what the round 2 boundary wrote
    Mock::given(method("GET"))
        .and(path("/page/3"))
        .respond_with(RecordSnapshot {
            corpus_path: corpus_path.clone(),
            seen: Arc::clone(&seen),
            body: page_html(&[("gamma", "Gamma")], None),
        })
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(config, false).unwrap();
    std::fs::create_dir(&corpus_path).unwrap();
    let summary = coordinator.run().await.unwrap();

    // The crawl kept going after the failed write and lost nothing
    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(*seen.lock().unwrap(), Some(2));

    let store = JsonCorpusStore::open(&corpus_path).unwrap();
    assert_eq!(store.len(), 3);
}
