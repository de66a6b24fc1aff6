//! Advisory crawl cache
//!
//! Records which URLs have been visited or failed so a restarted crawl does
//! not fetch them again. Losing the cache only costs re-fetching; the corpus
//! still deduplicates by URL.

use crate::storage::{write_atomic, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Visited/failed URL sets persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlCache {
    #[serde(default)]
    pub visited: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl CrawlCache {
    pub fn new(visited: Vec<String>, failed: Vec<String>) -> Self {
        Self {
            visited,
            failed,
            last_update: None,
        }
    }

    /// Loads the cache, returning `None` when the file does not exist
    pub fn load(path: &Path) -> StorageResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)?;
        let cache = serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(cache))
    }

    /// Writes the cache atomically, stamping `last_update`
    pub fn save(&mut self, path: &Path) -> StorageResult<()> {
        self.last_update = Some(Utc::now());
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)
    }
}
