//! Storage module for persisting harvested posts
//!
//! This module handles:
//! - The JSON corpus snapshot and its in-memory mirror
//! - URL-keyed deduplication at insert time
//! - The advisory crawl cache of visited/failed URLs
//! - Atomic (temp file + rename) writes for both files

mod cache;
mod json;
mod traits;

pub use cache::CrawlCache;
pub use json::JsonCorpusStore;
pub use traits::{PostStore, StorageError, StorageResult};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A stored blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Sequential id assigned at insert, never reused
    pub id: u64,
    pub title: String,
    pub content: String,
    pub summary: String,
    /// Canonical URL; unique across the corpus
    pub url: String,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    /// Listing or archive page the post was extracted from
    #[serde(default)]
    pub source_page: String,
    /// Older corpora call this `created_at` and may omit the UTC offset
    #[serde(alias = "created_at", deserialize_with = "deserialize_timestamp")]
    pub crawled_at: DateTime<Utc>,
}

/// Reads an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp '{}'", raw))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// A post as produced by the extractor, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub url: String,
    pub publish_date: Option<NaiveDate>,
    pub source_page: String,
}

impl PostDraft {
    /// Turns the draft into a stored post
    pub fn into_post(self, id: u64, crawled_at: DateTime<Utc>) -> Post {
        Post {
            id,
            title: self.title,
            content: self.content,
            summary: self.summary,
            url: self.url,
            publish_date: self.publish_date,
            source_page: self.source_page,
            crawled_at,
        }
    }
}

/// One page of a paginated post listing
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: usize,
    pub pages: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<usize>,
    pub next_num: Option<usize>,
}

impl PostPage {
    /// Slices an already-sorted list into a 1-indexed page
    ///
    /// A page outside `1..=pages` yields an empty slice, not an error.
    pub fn paginate(sorted: &[&Post], page: usize, per_page: usize) -> Self {
        let total = sorted.len();
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };

        let posts = if page == 0 || per_page == 0 {
            Vec::new()
        } else {
            sorted
                .iter()
                .skip((page - 1).saturating_mul(per_page))
                .take(per_page)
                .map(|post| (*post).clone())
                .collect()
        };

        let has_prev = page > 1;
        let has_next = page < pages;

        Self {
            posts,
            page,
            pages,
            per_page,
            total,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }

    /// All valid page numbers, for rendering page links
    pub fn iter_pages(&self) -> RangeInclusive<usize> {
        1..=self.pages
    }
}

/// Number of posts published in one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

/// Writes bytes to `path` atomically
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target, so a failed write never clobbers a valid file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;

    Ok(())
}
