//! Configuration types for Blog Harvester
//!
//! Every section deserializes from kebab-case TOML keys and has defaults, so a
//! config file only needs `[site] base-url`.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Blog Harvester
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The blog being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Entry page of the blog; also defines the crawl origin
    pub base_url: String,

    /// Additional seed URLs (same origin as the base URL)
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Listing endpoint templates with `{page}`, `{offset}` and `{size}` placeholders
    #[serde(default)]
    pub listing_templates: Vec<String>,

    /// Posts per listing page, used to compute `{offset}`
    #[serde(default = "default_listing_page_size")]
    pub listing_page_size: u32,

    /// Listing pages generated per template on each (re-)seed
    #[serde(default = "default_reseed_window")]
    pub reseed_window: u32,

    /// Hard cap on generated listing pages per template
    #[serde(default = "default_max_listing_pages")]
    pub max_listing_pages: u32,
}

/// Crawl coordination configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Size of the worker pool (peak concurrent requests)
    pub workers: usize,

    /// URLs drained per round = workers * batch_multiplier
    pub batch_multiplier: usize,

    /// Stop once this many posts have been accepted in the run
    pub target_posts: usize,

    /// Stop after this many consecutive rounds accepting zero posts
    pub max_empty_rounds: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            batch_multiplier: 2,
            target_posts: 1000,
            max_empty_rounds: 3,
        }
    }
}

impl CrawlerConfig {
    pub fn batch_size(&self) -> usize {
        self.workers.saturating_mul(self.batch_multiplier)
    }
}

/// Named sets of politeness defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchProfile {
    /// Slowest: 1-3 s between requests, 2-5 s backoff
    Gentle,
    #[default]
    Standard,
    /// Fastest: short delays, fewer attempts
    Aggressive,
}

impl FetchProfile {
    /// Returns (attempts, politeness delay, retry backoff) for this profile
    pub fn defaults(&self) -> (u32, DelayRange, DelayRange) {
        match self {
            Self::Gentle => (3, DelayRange::new(1000, 3000), DelayRange::new(2000, 5000)),
            Self::Standard => (3, DelayRange::new(500, 2000), DelayRange::new(1000, 3000)),
            Self::Aggressive => (2, DelayRange::new(100, 500), DelayRange::new(500, 1000)),
        }
    }
}

/// HTTP fetch configuration
///
/// Explicit keys override the values supplied by `profile`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    pub profile: FetchProfile,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Total attempts per URL before it is recorded as failed
    pub retries: Option<u32>,

    pub delay_min_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
    pub backoff_min_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,

    /// Pool of User-Agent strings rotated per request
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            profile: FetchProfile::default(),
            timeout_secs: 15,
            retries: None,
            delay_min_ms: None,
            delay_max_ms: None,
            backoff_min_ms: None,
            backoff_max_ms: None,
            user_agents: default_user_agents(),
        }
    }
}

impl FetcherConfig {
    /// Merges the profile defaults with explicit overrides
    pub fn resolve(&self) -> FetchSettings {
        let (attempts, delay, backoff) = self.profile.defaults();

        FetchSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            attempts: self.retries.unwrap_or(attempts),
            delay: DelayRange::new(
                self.delay_min_ms.unwrap_or(delay.min_ms),
                self.delay_max_ms.unwrap_or(delay.max_ms),
            ),
            backoff: DelayRange::new(
                self.backoff_min_ms.unwrap_or(backoff.min_ms),
                self.backoff_max_ms.unwrap_or(backoff.max_ms),
            ),
            user_agents: self.user_agents.clone(),
        }
    }
}

/// Fully resolved fetcher settings
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub attempts: u32,
    pub delay: DelayRange,
    pub backoff: DelayRange,
    pub user_agents: Vec<String>,
}

/// A uniform random delay range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    /// Draws a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

/// Post extraction thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractorConfig {
    /// Content shorter than this (in characters) is treated as noise
    pub min_content_length: usize,

    /// Target summary length in characters
    pub summary_length: usize,

    /// Titles longer than this are cut and suffixed with "..."
    pub max_title_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_content_length: 50,
            summary_length: 200,
            max_title_length: 500,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path to the JSON corpus snapshot
    pub corpus_path: String,

    /// Path to the crawl cache; no cache is kept when absent
    pub cache_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            corpus_path: "blog_data.json".to_string(),
            cache_path: None,
        }
    }
}

fn default_listing_page_size() -> u32 {
    20
}

fn default_reseed_window() -> u32 {
    5
}

fn default_max_listing_pages() -> u32 {
    500
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ]
    .iter()
    .map(|ua| ua.to_string())
    .collect()
}
