//! Storage traits and error types
//!
//! This module defines the interface the crawler and downstream consumers
//! (presentation, analytics, export) use to reach the post corpus.

use crate::storage::{MonthCount, Post, PostDraft, PostPage};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for post corpus implementations
///
/// All methods take `&self`; implementations guard their state with a single
/// exclusion boundary so the trait object can be shared across tasks.
pub trait PostStore: Send + Sync {
    // ===== Crawl-side operations =====

    /// Returns true if a post with this canonical URL is stored
    fn exists(&self, url: &str) -> bool;

    /// Inserts drafts whose URL is not yet stored
    ///
    /// Assigns sequential ids and crawl timestamps to the accepted drafts and
    /// returns how many were accepted. Duplicates inside the batch count once.
    fn insert_batch(&self, drafts: Vec<PostDraft>) -> usize;

    /// Durably writes the full corpus, replacing the previous snapshot atomically
    fn snapshot(&self) -> StorageResult<()>;

    /// Number of stored posts
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical URLs of every stored post
    fn urls(&self) -> Vec<String>;

    // ===== Downstream query interface =====

    /// Lists posts newest-first, 1-indexed pages
    fn list_posts(&self, page: usize, page_size: usize) -> PostPage;

    /// Case-insensitive substring search over title, content and summary
    fn search_posts(&self, query: &str, page: usize, page_size: usize) -> PostPage;

    /// Gets a post by its id
    fn get_post(&self, id: u64) -> Option<Post>;

    /// Alias of [`PostStore::exists`] for downstream consumers
    fn post_exists(&self, url: &str) -> bool {
        self.exists(url)
    }

    /// Lists posts whose publish date lies in the inclusive range, newest date first
    ///
    /// Undated posts are never included. Either bound may be open.
    fn posts_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        page: usize,
        page_size: usize,
    ) -> PostPage;

    /// Post counts per publish year and month, newest month first
    fn month_groups(&self) -> Vec<MonthCount>;

    /// A copy of every stored post in insertion order
    fn all_posts(&self) -> Vec<Post>;
}
