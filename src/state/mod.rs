//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: where a URL is in the frontier lifecycle
//! - `CrawlTarget` / `TargetRole`: a canonical URL and why it was queued

mod target;
mod url_state;

pub use target::{CrawlTarget, TargetRole};
pub use url_state::UrlState;
