//! JSON progress report

use crate::output::stats::load_statistics;
use crate::storage::{write_atomic, PostStore, StorageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Posts published in one month, keyed `YYYY-MM`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthEntry {
    pub month: String,
    pub posts: usize,
}

/// Progress of the corpus against the configured target
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub generated_at: DateTime<Utc>,
    pub total_posts: usize,
    pub target_posts: usize,
    /// Rounded to one decimal
    pub completion_percent: f64,
    pub monthly: Vec<MonthEntry>,
}

/// Builds a progress report from the store
pub fn build_progress_report(store: &dyn PostStore, target: usize) -> ProgressReport {
    let stats = load_statistics(store);
    let completion = (stats.completion_percent(target) * 10.0).round() / 10.0;

    ProgressReport {
        generated_at: Utc::now(),
        total_posts: stats.total_posts,
        target_posts: target,
        completion_percent: completion,
        monthly: stats
            .months
            .iter()
            .map(|m| MonthEntry {
                month: format!("{}-{:02}", m.year, m.month),
                posts: m.count,
            })
            .collect(),
    }
}

/// Writes the progress report to `path` atomically
pub fn write_progress_report(
    store: &dyn PostStore,
    target: usize,
    path: &Path,
) -> StorageResult<ProgressReport> {
    let report = build_progress_report(store, target);
    let bytes = serde_json::to_vec_pretty(&report)?;
    write_atomic(path, &bytes)?;

    tracing::info!(
        "Progress report written to {} ({} posts, {:.1}%)",
        path.display(),
        report.total_posts,
        report.completion_percent
    );
    Ok(report)
}
