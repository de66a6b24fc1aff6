//! Crawl targets: a canonical URL tagged with the reason it was queued

use std::fmt;
use url::Url;

/// Why a URL was put into the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    /// The configured base URL or an extra seed
    Seed,
    /// A generated listing endpoint page or a "next/older posts" link
    Pagination,
    /// A date- or label-indexed listing
    Archive,
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Seed => "seed",
            Self::Pagination => "pagination",
            Self::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// A canonical URL queued for fetching
///
/// Identity is the canonical URL string; the role is informational.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub url: Url,
    pub role: TargetRole,
}

impl CrawlTarget {
    pub fn new(url: Url, role: TargetRole) -> Self {
        Self { url, role }
    }

    pub fn seed(url: Url) -> Self {
        Self::new(url, TargetRole::Seed)
    }

    /// The identity key used by the frontier and the store
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}

impl PartialEq for CrawlTarget {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for CrawlTarget {}
