//! Output module for corpus statistics and reports
//!
//! This module handles:
//! - Computing corpus statistics through the PostStore query interface
//! - Printing them for the `--stats` command
//! - Writing the JSON progress report

mod report;
pub mod stats;

pub use report::{build_progress_report, write_progress_report, MonthEntry, ProgressReport};
pub use stats::{load_statistics, print_statistics, CorpusStatistics};
