//! URL handling module for Blog Harvester
//!
//! This module provides URL canonicalisation, host extraction and the
//! same-origin check used to keep the crawl on a single blog.

mod domain;
mod normalize;

pub use domain::{extract_host, is_same_origin};
pub use normalize::normalize_url;

use ::url::Url;

/// Resolves an `href` against a base URL and canonicalises the result
///
/// Returns None if the link should be excluded:
/// - empty and fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - anything that does not resolve to an HTTP(S) URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}
