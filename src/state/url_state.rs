//! URL state definitions for tracking crawl progress
//!
//! A URL moves through the frontier exactly once:
//! `Discovered -> InFlight -> Visited | Failed`.

use std::fmt;

/// Represents where a URL is in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Known, waiting in the frontier
    Discovered,

    /// Handed to a worker, outcome not yet recorded
    InFlight,

    /// Fetch attempted and completed
    Visited,

    /// Fetch attempted and unsuccessful after retries (also counts as visited)
    Failed,
}

impl UrlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::InFlight => "in_flight",
            Self::Visited => "visited",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
