//! Summary generation
//!
//! Summaries are cut at the last sentence boundary that fits the budget,
//! falling back to a hard cut plus a continuation marker.

use regex::Regex;
use std::sync::LazyLock;

/// Appended when no sentence boundary fits inside the summary budget
pub const CONTINUATION_MARKER: &str = "...";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Sentence terminators that end a sentence wherever they appear (CJK)
const CJK_TERMINATORS: &[char] = &['。', '！', '？'];

/// Sentence terminators that only end a sentence before whitespace or end of text
const ASCII_TERMINATORS: &[char] = &['.', '!', '?'];

/// Collapses all runs of whitespace into single spaces and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generates a summary of at most `max_length` characters
///
/// Content that already fits is returned unchanged apart from tag stripping
/// and whitespace normalization. Longer content is cut at the last sentence
/// boundary inside the budget; only when no boundary exists is it
/// hard-truncated and suffixed with [`CONTINUATION_MARKER`].
///
/// Lengths are counted in characters, not bytes.
pub fn generate_summary(content: &str, max_length: usize) -> String {
    let clean = normalize_whitespace(&HTML_TAG.replace_all(content, " "));
    let chars: Vec<char> = clean.chars().collect();

    if chars.len() <= max_length {
        return clean;
    }

    match last_sentence_end(&chars, max_length) {
        Some(end) => chars[..end].iter().collect::<String>().trim_end().to_string(),
        None => {
            let cut: String = chars[..max_length].iter().collect();
            format!("{}{}", cut.trim_end(), CONTINUATION_MARKER)
        }
    }
}

/// Returns the exclusive end index of the last sentence that fits in `budget`
fn last_sentence_end(chars: &[char], budget: usize) -> Option<usize> {
    (0..budget.min(chars.len())).rev().find_map(|i| {
        let c = chars[i];
        let ends_sentence = if CJK_TERMINATORS.contains(&c) {
            true
        } else if ASCII_TERMINATORS.contains(&c) {
            chars.get(i + 1).map_or(true, |next| next.is_whitespace())
        } else {
            false
        };

        // A terminator as the very first character is not a sentence
        (ends_sentence && i > 0).then_some(i + 1)
    })
}
