//! Statistics over the harvested corpus
//!
//! This module provides functionality for extracting and displaying
//! corpus statistics through the PostStore query interface.

use crate::storage::{MonthCount, PostStore};
use chrono::NaiveDate;

/// Corpus statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStatistics {
    /// Total number of stored posts
    pub total_posts: usize,

    /// Posts with a parsed publish date
    pub dated_posts: usize,

    pub undated_posts: usize,

    /// Earliest and latest publish dates, if any post is dated
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,

    /// Mean content length in characters
    pub average_content_chars: usize,

    /// Posts per publish month, newest first
    pub months: Vec<MonthCount>,
}

impl CorpusStatistics {
    /// Share of `target` reached, in percent (may exceed 100)
    pub fn completion_percent(&self, target: usize) -> f64 {
        if target == 0 {
            return 100.0;
        }
        self.total_posts as f64 / target as f64 * 100.0
    }
}

/// Loads statistics from a post store
pub fn load_statistics(store: &dyn PostStore) -> CorpusStatistics {
    let posts = store.all_posts();

    let dates: Vec<NaiveDate> = posts.iter().filter_map(|p| p.publish_date).collect();
    let total_chars: usize = posts.iter().map(|p| p.content.chars().count()).sum();
    let average_content_chars = if posts.is_empty() {
        0
    } else {
        total_chars / posts.len()
    };

    CorpusStatistics {
        total_posts: posts.len(),
        dated_posts: dates.len(),
        undated_posts: posts.len() - dates.len(),
        earliest: dates.iter().min().copied(),
        latest: dates.iter().max().copied(),
        average_content_chars,
        months: store.month_groups(),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// At most `max_months` month rows are shown.
pub fn print_statistics(stats: &CorpusStatistics, target: usize, max_months: usize) {
    println!("=== Corpus Statistics ===\n");

    println!("Overview:");
    println!("  Total posts: {}", stats.total_posts);
    println!(
        "  Target progress: {}/{} ({:.1}%)",
        stats.total_posts,
        target,
        stats.completion_percent(target)
    );
    if stats.total_posts < target {
        println!("  Remaining: {}", target - stats.total_posts);
    }
    println!("  Dated posts: {}", stats.dated_posts);
    println!("  Undated posts: {}", stats.undated_posts);
    println!("  Average content length: {} chars", stats.average_content_chars);
    println!();

    if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
        println!("Date span: {} to {}", earliest, latest);
        println!();
    }

    if !stats.months.is_empty() {
        println!("Posts by Month:");
        for month in stats.months.iter().take(max_months) {
            println!("  {}-{:02}: {}", month.year, month.month, month.count);
        }
        if stats.months.len() > max_months {
            println!("  ... {} more months", stats.months.len() - max_months);
        }
    }
}
