//! Crawler module for blog post harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry, backoff and rotating User-Agents
//! - Post and link extraction from listing pages
//! - The URL frontier
//! - Round-based crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

pub use coordinator::{render_listing_template, Coordinator, CrawlSummary, StopReason};
pub use extractor::{DiscoveredLinks, Extraction, Extractor};
pub use fetcher::{build_http_client, FetchError, FetchedDocument, Fetcher};
pub use frontier::Frontier;
