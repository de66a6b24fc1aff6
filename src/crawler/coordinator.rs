//! Crawl coordinator - round-based crawl orchestration
//!
//! This module contains the main crawl loop, including:
//! - Seeding the frontier from the cache, the corpus and the configured seeds
//! - Draining the frontier in rounds and dispatching fetch+extract tasks
//! - Merging task results back into the frontier and the post store
//! - Re-seeding from listing templates when the frontier runs dry
//! - Deciding termination and flushing the snapshot and cache

use crate::config::{validate, Config, SiteConfig};
use crate::crawler::extractor::{Extraction, Extractor};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::state::{CrawlTarget, TargetRole};
use crate::storage::{CrawlCache, JsonCorpusStore, PostDraft, PostStore, StorageResult};
use crate::url::{extract_host, is_same_origin, normalize_url};
use crate::HarvestError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of posts was accepted
    TargetReached,
    /// No URL left to fetch and no listing page left to generate
    FrontierExhausted,
    /// Too many consecutive rounds accepted zero posts
    EmptyRounds,
    /// A shutdown was requested
    Interrupted,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rounds, {} fetched, {} accepted, {} failed ({})",
            self.rounds, self.fetched, self.accepted, self.failed, self.stop_reason
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::TargetReached => "target reached",
            Self::FrontierExhausted => "frontier exhausted",
            Self::EmptyRounds => "consecutive empty rounds",
            Self::Interrupted => "interrupted",
        };
        f.write_str(reason)
    }
}

/// Counters reported at the end of every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub rounds: u32,
    /// URLs dispatched and completed, successful or not
    pub fetched: usize,
    /// Posts accepted by the store in this run
    pub accepted: usize,
    /// URLs recorded as failed in this run
    pub failed: usize,
    pub stop_reason: StopReason,
}

/// What a worker task produced for one URL
enum TaskOutcome {
    Extracted(Extraction),
    Failed(FetchError),
}

/// Results gathered over one round
#[derive(Default)]
struct RoundOutcome {
    posts: Vec<PostDraft>,
    fetched: usize,
    failed: usize,
    discovered: usize,
}

/// Renders a listing template for a 1-based page number
///
/// `{page}` is the page number, `{offset}` the zero-based item offset and
/// `{size}` the page size.
pub fn render_listing_template(template: &str, page: u32, page_size: u32) -> String {
    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    template
        .replace("{page}", &page.to_string())
        .replace("{offset}", &offset.to_string())
        .replace("{size}", &page_size.to_string())
}

/// Hands out successive windows of generated listing pages
#[derive(Debug, Clone)]
struct ListingCursor {
    templates: Vec<String>,
    page_size: u32,
    window: u32,
    max_pages: u32,
    next_page: u32,
}

impl ListingCursor {
    fn new(site: &SiteConfig) -> Self {
        Self {
            templates: site.listing_templates.clone(),
            page_size: site.listing_page_size.max(1),
            window: site.reseed_window.max(1),
            max_pages: site.max_listing_pages,
            next_page: 1,
        }
    }

    /// Returns true when no further listing page can be generated
    fn exhausted(&self) -> bool {
        self.templates.is_empty() || self.next_page > self.max_pages
    }

    /// Generates the next window of pages for every template
    fn next_window(&mut self) -> Vec<CrawlTarget> {
        if self.exhausted() {
            return Vec::new();
        }

        let first = self.next_page;
        let last = first
            .saturating_add(self.window - 1)
            .min(self.max_pages);
        self.next_page = last.saturating_add(1);

        let mut targets = Vec::new();
        for page in first..=last {
            for template in &self.templates {
                let rendered = render_listing_template(template, page, self.page_size);
                match normalize_url(&rendered) {
                    Ok(url) => targets.push(CrawlTarget::new(url, TargetRole::Pagination)),
                    Err(e) => tracing::warn!("Skipping listing page {}: {}", rendered, e),
                }
            }
        }

        tracing::debug!("Generated listing pages {}..={}", first, last);
        targets
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    base_url: Url,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    frontier: Arc<Mutex<Frontier>>,
    store: Arc<JsonCorpusStore>,
    cache_path: Option<PathBuf>,
    fresh: bool,
    shutdown: Arc<AtomicBool>,
    listings: ListingCursor,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration, opens the corpus (a corrupt corpus is an
    /// error) and builds the HTTP client. With `fresh` the crawl cache is ignored; the corpus is still
    /// loaded so URL-level deduplication holds.
    pub fn new(config: Config, fresh: bool) -> Result<Self, HarvestError> {
        validate(&config)?;

        let base_url = normalize_url(&config.site.base_url)?;
        let store = JsonCorpusStore::open(Path::new(&config.output.corpus_path))?;
        let fetcher = Fetcher::new(config.fetcher.resolve())?;
        let extractor = Extractor::new(config.extractor.clone());
        let cache_path = config.output.cache_path.as_ref().map(PathBuf::from);
        let listings = ListingCursor::new(&config.site);

        Ok(Self {
            config: Arc::new(config),
            base_url,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            frontier: Arc::new(Mutex::new(Frontier::new())),
            store: Arc::new(store),
            cache_path,
            fresh,
            shutdown: Arc::new(AtomicBool::new(false)),
            listings,
        })
    }

    /// Flag that requests a graceful stop when set
    ///
    /// The current round is allowed to finish; no new round starts.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The post store the crawl writes into
    pub fn store(&self) -> Arc<JsonCorpusStore> {
        Arc::clone(&self.store)
    }

    fn frontier(&self) -> MutexGuard<'_, Frontier> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the crawl until a stop condition is met
    ///
    /// Per-URL failures never abort the run. A snapshot failure at a round
    /// boundary is logged and retried at the next boundary; a failure of the
    /// final snapshot is returned as [`HarvestError::FinalFlush`], which still
    /// carries the run summary.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use blog_harvester::config::load_config;
    /// use blog_harvester::crawler::Coordinator;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("harvester.toml"))?;
    /// let summary = Coordinator::new(config, false)?.run().await?;
    /// println!("{} posts accepted", summary.accepted);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(&mut self) -> Result<CrawlSummary, HarvestError> {
        let start_time = Instant::now();
        let seeded = self.seed();
        tracing::info!(
            "Seeded {} URLs for {}; corpus has {} posts",
            seeded,
            extract_host(&self.base_url).unwrap_or_default(),
            self.store.len()
        );

        let batch_size = self.config.crawler.batch_size();
        let target = self.config.crawler.target_posts;
        let max_empty_rounds = self.config.crawler.max_empty_rounds;

        let mut rounds = 0u32;
        let mut fetched = 0usize;
        let mut accepted = 0usize;
        let mut failed = 0usize;
        let mut empty_rounds = 0u32;
        let mut snapshot_pending = false;

        let stop_reason = loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, stopping before the next round");
                break StopReason::Interrupted;
            }

            if accepted >= target {
                break StopReason::TargetReached;
            }

            let batch = self.frontier().drain_batch(batch_size);
            if batch.is_empty() {
                if self.reseed() {
                    continue;
                }
                tracing::info!("Frontier is empty, crawl complete");
                break StopReason::FrontierExhausted;
            }

            rounds += 1;
            tracing::debug!("Round {}: dispatching {} URLs", rounds, batch.len());

            let outcome = self.run_round(batch).await;
            fetched += outcome.fetched;
            failed += outcome.failed;

            let round_accepted = self.store.insert_batch(outcome.posts);
            accepted += round_accepted;

            if round_accepted > 0 || snapshot_pending {
                match self.store.snapshot() {
                    Ok(()) => snapshot_pending = false,
                    Err(e) => {
                        tracing::error!("Snapshot failed, will retry next round: {}", e);
                        snapshot_pending = true;
                    }
                }
            }
            self.save_cache();

            if round_accepted == 0 {
                empty_rounds += 1;
            } else {
                empty_rounds = 0;
            }

            tracing::info!(
                "Round {}: {} fetched, {} failed, {} new links, {} accepted ({} total, {} in frontier)",
                rounds,
                outcome.fetched,
                outcome.failed,
                outcome.discovered,
                round_accepted,
                self.store.len(),
                self.frontier().discovered_len()
            );

            if empty_rounds >= max_empty_rounds {
                tracing::info!("{} consecutive empty rounds, stopping", empty_rounds);
                break StopReason::EmptyRounds;
            }
        };

        let summary = CrawlSummary {
            rounds,
            fetched,
            accepted,
            failed,
            stop_reason,
        };

        tracing::info!("Crawl finished: {} in {:?}", summary, start_time.elapsed());

        if let Err(source) = self.flush() {
            tracing::error!("Final snapshot failed: {}", source);
            return Err(HarvestError::FinalFlush { summary, source });
        }

        Ok(summary)
    }

    /// Loads prior state and enqueues the seed set; returns the number enqueued
    fn seed(&mut self) -> usize {
        let cached = if self.fresh {
            None
        } else {
            self.load_cache()
        };

        let mut seeds = vec![CrawlTarget::seed(self.base_url.clone())];
        for seed in &self.config.site.seeds {
            match normalize_url(seed) {
                Ok(url) => seeds.push(CrawlTarget::seed(url)),
                Err(e) => tracing::warn!("Skipping seed {}: {}", seed, e),
            }
        }
        seeds.extend(self.listings.next_window());

        let corpus_urls = self.store.urls();
        let mut frontier = self.frontier();

        if let Some(cache) = cached {
            tracing::info!(
                "Loaded crawl cache: {} visited, {} failed",
                cache.visited.len(),
                cache.failed.len()
            );
            frontier.preload_visited(cache.visited);
            frontier.preload_failed(cache.failed);
        }

        // Posts already stored are never fetched again, regardless of the cache
        frontier.preload_visited(corpus_urls);
        frontier.enqueue(seeds)
    }

    fn load_cache(&self) -> Option<CrawlCache> {
        let path = self.cache_path.as_ref()?;
        match CrawlCache::load(path) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("Ignoring unreadable crawl cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Enqueues generated listing pages until one adds a new URL
    fn reseed(&mut self) -> bool {
        while !self.listings.exhausted() {
            let window = self.listings.next_window();
            let added = self.frontier().enqueue(window);
            if added > 0 {
                tracing::info!("Re-seeded frontier with {} listing pages", added);
                return true;
            }
        }
        false
    }

    /// Dispatches one fetch+extract task per URL and merges results as they arrive
    async fn run_round(&self, batch: Vec<CrawlTarget>) -> RoundOutcome {
        let semaphore = Arc::new(Semaphore::new(self.config.crawler.workers.max(1)));
        let mut tasks = JoinSet::new();

        for target in batch {
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = process_target(&fetcher, &extractor, &target).await;
                (target, outcome)
            });
        }

        let mut round = RoundOutcome::default();

        while let Some(joined) = tasks.join_next().await {
            let (target, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Worker task aborted: {}", e);
                    continue;
                }
            };

            round.fetched += 1;
            match outcome {
                TaskOutcome::Extracted(extraction) => {
                    let links: Vec<CrawlTarget> = extraction
                        .links
                        .into_targets()
                        .into_iter()
                        .filter(|t| is_same_origin(&t.url, &self.base_url))
                        .collect();

                    tracing::debug!(
                        "{} ({}): {} posts, {} links",
                        target.url,
                        target.role,
                        extraction.posts.len(),
                        links.len()
                    );

                    let mut frontier = self.frontier();
                    frontier.mark_visited(target.key());
                    round.discovered += frontier.enqueue(links);
                    drop(frontier);

                    round.posts.extend(extraction.posts);
                }
                TaskOutcome::Failed(e) => {
                    if e.is_permanent() {
                        tracing::warn!("Skipping {}: {}", target.url, e);
                    } else {
                        tracing::warn!("Giving up on {} for this run: {}", target.url, e);
                    }
                    self.frontier().mark_failed(target.key());
                    round.failed += 1;
                }
            }
        }

        // URLs whose task died without reporting back
        let mut frontier = self.frontier();
        for url in frontier.in_flight_urls() {
            tracing::warn!("No result for {}, marking failed", url);
            frontier.mark_failed(&url);
            round.fetched += 1;
            round.failed += 1;
        }

        round
    }

    fn save_cache(&self) {
        let Some(path) = &self.cache_path else {
            return;
        };

        let (visited, failed) = {
            let frontier = self.frontier();
            (frontier.visited_urls(), frontier.failed_urls())
        };

        if let Err(e) = CrawlCache::new(visited, failed).save(path) {
            tracing::warn!("Failed to save crawl cache {}: {}", path.display(), e);
        }
    }

    /// Final snapshot and cache write
    fn flush(&self) -> StorageResult<()> {
        self.store.snapshot()?;
        self.save_cache();
        Ok(())
    }
}

async fn process_target(fetcher: &Fetcher, extractor: &Extractor, target: &CrawlTarget) -> TaskOutcome {
    match fetcher.fetch(&target.url).await {
        Ok(document) => {
            TaskOutcome::Extracted(extractor.extract(&document.body, &document.final_url))
        }
        Err(e) => TaskOutcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, ExtractorConfig, FetcherConfig, OutputConfig};
    use tempfile::TempDir;

    fn site(templates: Vec<&str>) -> SiteConfig {
        SiteConfig {
            base_url: "https://blog.example.com/".to_string(),
            seeds: vec![],
            listing_templates: templates.into_iter().map(String::from).collect(),
            listing_page_size: 20,
            reseed_window: 2,
            max_listing_pages: 5,
        }
    }

    fn create_test_config(dir: &TempDir) -> Config {
        Config {
            site: site(vec![]),
            crawler: CrawlerConfig::default(),
            fetcher: FetcherConfig {
                delay_min_ms: Some(0),
                delay_max_ms: Some(0),
                backoff_min_ms: Some(0),
                backoff_max_ms: Some(0),
                ..FetcherConfig::default()
            },
            extractor: ExtractorConfig::default(),
            output: OutputConfig {
                corpus_path: dir.path().join("blog_data.json").display().to_string(),
                cache_path: Some(dir.path().join("crawl_cache.json").display().to_string()),
            },
        }
    }

    #[test]
    fn test_render_listing_template() {
        let template = "https://blog.example.com/search?max-results={size}&start={offset}";
        assert_eq!(
            render_listing_template(template, 1, 20),
            "https://blog.example.com/search?max-results=20&start=0"
        );
        assert_eq!(
            render_listing_template(template, 3, 20),
            "https://blog.example.com/search?max-results=20&start=40"
        );
        assert_eq!(
            render_listing_template("https://blog.example.com/page/{page}", 7, 20),
            "https://blog.example.com/page/7"
        );
    }

    #[test]
    fn test_listing_cursor_windows_and_cap() {
        let mut cursor = ListingCursor::new(&site(vec!["https://blog.example.com/page/{page}"]));

        let first: Vec<String> = cursor.next_window().iter().map(|t| t.key().to_string()).collect();
        assert_eq!(
            first,
            vec![
                "https://blog.example.com/page/1",
                "https://blog.example.com/page/2"
            ]
        );

        assert_eq!(cursor.next_window().len(), 2);
        // Page 5 is the cap
        assert_eq!(cursor.next_window().len(), 1);
        assert!(cursor.exhausted());
        assert!(cursor.next_window().is_empty());
    }

    #[test]
    fn test_listing_cursor_without_templates() {
        let mut cursor = ListingCursor::new(&site(vec![]));
        assert!(cursor.exhausted());
        assert!(cursor.next_window().is_empty());
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::TargetReached.to_string(), "target reached");
        assert_eq!(StopReason::Interrupted.to_string(), "interrupted");
    }

    #[test]
    fn test_coordinator_creation() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(create_test_config(&dir), false).unwrap();
        assert!(coordinator.store().is_empty());
    }

    #[test]
    fn test_coordinator_rejects_corrupt_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir);
        std::fs::write(&config.output.corpus_path, "not json").unwrap();

        assert!(matches!(
            Coordinator::new(config, false),
            Err(HarvestError::Storage(_))
        ));
    }

    #[test]
    fn test_coordinator_rejects_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(&dir);
        config.crawler.batch_multiplier = 0;

        assert!(matches!(
            Coordinator::new(config.clone(), false),
            Err(HarvestError::Config(_))
        ));

        config.crawler.batch_multiplier = 1;
        config.crawler.workers = 0;
        assert!(matches!(
            Coordinator::new(config, false),
            Err(HarvestError::Config(_))
        ));
    }

    #[test]
    fn test_crawl_summary_display() {
        let summary = CrawlSummary {
            rounds: 2,
            fetched: 5,
            accepted: 3,
            failed: 1,
            stop_reason: StopReason::EmptyRounds,
        };
        assert_eq!(
            summary.to_string(),
            "2 rounds, 5 fetched, 3 accepted, 1 failed (consecutive empty rounds)"
        );
    }

    #[test]
    fn test_seed_skips_cached_and_stored_urls() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(&dir);
        config.site.seeds = vec!["https://blog.example.com/extra".to_string()];

        CrawlCache::new(vec!["https://blog.example.com/".to_string()], vec![])
            .save(Path::new(config.output.cache_path.as_ref().unwrap()))
            .unwrap();

        let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
        assert_eq!(coordinator.seed(), 1);

        // A fresh run ignores the cache
        let mut fresh = Coordinator::new(config, true).unwrap();
        assert_eq!(fresh.seed(), 2);
    }

    #[tokio::test]
    async fn test_interrupted_before_first_round() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir);
        let corpus_path = PathBuf::from(&config.output.corpus_path);

        let mut coordinator = Coordinator::new(config, false).unwrap();
        coordinator.shutdown_handle().store(true, Ordering::SeqCst);

        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(summary.rounds, 0);
        assert_eq!(summary.fetched, 0);
        // The final flush still writes a valid snapshot
        assert!(corpus_path.exists());
    }

    #[tokio::test]
    async fn test_final_flush_failure_keeps_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir);
        let corpus_path = PathBuf::from(&config.output.corpus_path);

        let mut coordinator = Coordinator::new(config, false).unwrap();
        coordinator.shutdown_handle().store(true, Ordering::SeqCst);
        // A directory in place of the corpus file makes the rename fail
        std::fs::create_dir(&corpus_path).unwrap();

        match coordinator.run().await {
            Err(HarvestError::FinalFlush { summary, .. }) => {
                assert_eq!(summary.stop_reason, StopReason::Interrupted);
                assert_eq!(summary.rounds, 0);
            }
            other => panic!("expected FinalFlush, got {:?}", other),
        }
    }
}
