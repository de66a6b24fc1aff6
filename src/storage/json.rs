//! JSON corpus implementation
//!
//! This module provides the JSON-snapshot implementation of the PostStore
//! trait. The whole corpus is mirrored in memory; snapshots rewrite the file.

use crate::storage::traits::{PostStore, StorageError, StorageResult};
use crate::storage::{write_atomic, MonthCount, Post, PostDraft, PostPage};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// On-disk layout of the snapshot file
#[derive(Deserialize)]
struct CorpusFile {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Serialize)]
struct CorpusFileRef<'a> {
    posts: &'a [Post],
}

/// In-memory corpus: posts in insertion order plus a URL index
#[derive(Default)]
struct Corpus {
    posts: Vec<Post>,
    by_url: HashMap<String, usize>,
    next_id: u64,
}

impl Corpus {
    fn from_posts(loaded: Vec<Post>) -> Self {
        let mut corpus = Corpus {
            next_id: 1,
            ..Default::default()
        };

        for post in loaded {
            if corpus.by_url.contains_key(&post.url) {
                tracing::warn!("Dropping duplicate post in snapshot: {}", post.url);
                continue;
            }
            corpus.next_id = corpus.next_id.max(post.id + 1);
            corpus.by_url.insert(post.url.clone(), corpus.posts.len());
            corpus.posts.push(post);
        }

        corpus
    }
}

/// JSON snapshot post store
///
/// Inserts and reads go through one mutex; `snapshot` serializes a consistent
/// copy under that mutex and writes it outside of it, serialized against other
/// snapshots by a second lock.
pub struct JsonCorpusStore {
    path: PathBuf,
    corpus: Mutex<Corpus>,
    write_lock: Mutex<()>,
}

impl JsonCorpusStore {
    /// Opens the corpus at `path`
    ///
    /// A missing file yields an empty corpus. A file that exists but cannot
    /// be parsed is an error; it is never silently replaced.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let corpus = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let file: CorpusFile =
                serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?;
            Corpus::from_posts(file.posts)
        } else {
            Corpus::from_posts(Vec::new())
        };

        tracing::debug!(
            "Opened corpus {} with {} posts",
            path.display(),
            corpus.posts.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            corpus: Mutex::new(corpus),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Corpus> {
        self.corpus.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PostStore for JsonCorpusStore {
    fn exists(&self, url: &str) -> bool {
        self.lock().by_url.contains_key(url)
    }

    fn insert_batch(&self, drafts: Vec<PostDraft>) -> usize {
        if drafts.is_empty() {
            return 0;
        }

        let crawled_at = Utc::now();
        let mut corpus = self.lock();
        let mut accepted = 0;

        for draft in drafts {
            if corpus.by_url.contains_key(&draft.url) {
                continue;
            }
            let id = corpus.next_id;
            corpus.next_id += 1;

            let idx = corpus.posts.len();
            corpus.by_url.insert(draft.url.clone(), idx);
            corpus.posts.push(draft.into_post(id, crawled_at));
            accepted += 1;
        }

        accepted
    }

    fn snapshot(&self) -> StorageResult<()> {
        let _writer = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (bytes, count) = {
            let corpus = self.lock();
            let bytes = serde_json::to_vec_pretty(&CorpusFileRef {
                posts: &corpus.posts,
            })?;
            (bytes, corpus.posts.len())
        };

        write_atomic(&self.path, &bytes)?;
        tracing::debug!("Snapshot of {} posts written to {}", count, self.path.display());
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().posts.len()
    }

    fn urls(&self) -> Vec<String> {
        self.lock().posts.iter().map(|p| p.url.clone()).collect()
    }

    fn list_posts(&self, page: usize, page_size: usize) -> PostPage {
        let corpus = self.lock();
        let mut sorted: Vec<&Post> = corpus.posts.iter().collect();
        sorted.sort_by(|a, b| b.id.cmp(&a.id));
        PostPage::paginate(&sorted, page, page_size)
    }

    fn search_posts(&self, query: &str, page: usize, page_size: usize) -> PostPage {
        let needle = query.to_lowercase();
        let corpus = self.lock();

        let mut matches: Vec<&Post> = corpus
            .posts
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
                    || p.summary.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));

        PostPage::paginate(&matches, page, page_size)
    }

    fn get_post(&self, id: u64) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }

    fn posts_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        page: usize,
        page_size: usize,
    ) -> PostPage {
        let corpus = self.lock();

        let mut matches: Vec<&Post> = corpus
            .posts
            .iter()
            .filter(|p| match p.publish_date {
                Some(date) => {
                    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
                }
                None => false,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| b.id.cmp(&a.id))
        });

        PostPage::paginate(&matches, page, page_size)
    }

    fn month_groups(&self) -> Vec<MonthCount> {
        let corpus = self.lock();

        let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for date in corpus.posts.iter().filter_map(|p| p.publish_date) {
            *counts.entry((date.year(), date.month())).or_default() += 1;
        }

        counts
            .into_iter()
            .rev()
            .map(|((year, month), count)| MonthCount { year, month, count })
            .collect()
    }

    fn all_posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }
}
