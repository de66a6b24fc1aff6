//! Blog Harvester main entry point
//!
//! This is the command-line interface for the Blog Harvester crawler.

use anyhow::Context;
use blog_harvester::config::{load_config_with_hash, Config};
use blog_harvester::crawler::{render_listing_template, Coordinator};
use blog_harvester::output::{load_statistics, print_statistics, write_progress_report};
use blog_harvester::storage::JsonCorpusStore;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Blog Harvester: a polite blog crawler
///
/// Blog Harvester walks a blog's listing, pagination and archive pages,
/// extracts posts, deduplicates them by URL and keeps them in a single
/// JSON corpus that survives restarts.
#[derive(Parser, Debug)]
#[command(name = "blog-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A polite blog crawler", long_about = None)]
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

    /// Ignore the crawl cache; stored posts are still never duplicated
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "report"])]
    dry_run: bool,

    /// Show corpus statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "report"])]
    stats: bool,

    /// Write a JSON progress report to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.report {
        handle_report(&config, path)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("blog_harvester=info,warn"),
            1 => EnvFilter::new("blog_harvester=debug,info"),
            2 => EnvFilter::new("blog_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration and seed set
fn handle_dry_run(config: &Config) {
    let fetch = config.fetcher.resolve();

    println!("=== Blog Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    for seed in &config.site.seeds {
        println!("  Seed: {}", seed);
    }

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Batch size: {}", config.crawler.batch_size());
    println!("  Target posts: {}", config.crawler.target_posts);
    println!("  Max empty rounds: {}", config.crawler.max_empty_rounds);

    println!("\nFetcher ({:?} profile):", config.fetcher.profile);
    println!("  Timeout: {:?}", fetch.timeout);
    println!("  Attempts: {}", fetch.attempts);
    println!(
        "  Politeness delay: {}-{}ms",
        fetch.delay.min_ms, fetch.delay.max_ms
    );
    println!("  Backoff: {}-{}ms", fetch.backoff.min_ms, fetch.backoff.max_ms);
    println!("  User agents: {}", fetch.user_agents.len());

    println!("\nOutput:");
    println!("  Corpus: {}", config.output.corpus_path);
    match &config.output.cache_path {
        Some(path) => println!("  Cache: {}", path),
        None => println!("  Cache: disabled"),
    }

    println!(
        "\nListing Templates ({}):",
        config.site.listing_templates.len()
    );
    for template in &config.site.listing_templates {
        let first_pages = (1..=config.site.reseed_window.min(config.site.max_listing_pages))
            .map(|page| render_listing_template(template, page, config.site.listing_page_size));
        for url in first_pages {
            println!("  * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        1 + config.site.seeds.len()
    );
}

fn open_store(config: &Config) -> anyhow::Result<JsonCorpusStore> {
    let path = Path::new(&config.output.corpus_path);
    JsonCorpusStore::open(path)
        .with_context(|| format!("Failed to open corpus {}", path.display()))
}

/// Handles the --stats mode: shows statistics from the corpus
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Corpus: {}\n", config.output.corpus_path);

    let store = open_store(config)?;
    let stats = load_statistics(&store);
    print_statistics(&stats, config.crawler.target_posts, 12);

    Ok(())
}

/// Handles the --report mode: writes the JSON progress report
fn handle_report(config: &Config, path: &Path) -> anyhow::Result<()> {
    let store = open_store(config)?;
    write_progress_report(&store, config.crawler.target_posts, path)
        .with_context(|| format!("Failed to write progress report {}", path.display()))?;

    println!("✓ Progress report written to: {}", path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring crawl cache)");
    } else {
        tracing::info!("Starting crawl (known URLs are skipped)");
    }

    let mut coordinator = Coordinator::new(config, fresh).context("Failed to start crawl")?;

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current round");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let summary = coordinator.run().await.context("Crawl failed")?;

    println!("Crawl finished: {}", summary);

    Ok(())
}
