//! Text helpers shared by the extractor and the store
//!
//! - date extraction from free-form date strings
//! - summary generation with sentence-aware truncation

mod dates;
mod summary;

pub use dates::extract_date;
pub use summary::{generate_summary, normalize_whitespace, CONTINUATION_MARKER};

/// Truncates text to `max_chars` characters, appending "..." if it was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], CONTINUATION_MARKER),
        None => text.to_string(),
    }
}
