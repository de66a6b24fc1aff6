//! Publish date extraction from free-form date text
//!
//! Patterns are tried in order and the first one that yields a valid calendar
//! date wins. Unparsable text yields `None`; a bad date never blocks a post.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Order of the three captured fields in a pattern
#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    Ymd,
    Dmy,
    Mdy,
    /// Day, English month name, year
    DayMonthName,
    /// English month name, day, year
    MonthNameDay,
}

static DATE_PATTERNS: LazyLock<Vec<(Regex, FieldOrder)>> = LazyLock::new(|| {
    vec![
        // ISO: 2024-03-15
        (Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap(), FieldOrder::Ymd),
        // 2024/03/15
        (Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").unwrap(), FieldOrder::Ymd),
        // 2024.03.15
        (Regex::new(r"(\d{4})\.(\d{1,2})\.(\d{1,2})").unwrap(), FieldOrder::Ymd),
        // 2024年3月15日
        (Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日").unwrap(), FieldOrder::Ymd),
        // European dotted: 15.03.2024
        (Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap(), FieldOrder::Dmy),
        // US slashed: 03/15/2024
        (Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap(), FieldOrder::Mdy),
        // US dashed: 03-15-2024
        (Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4})").unwrap(), FieldOrder::Mdy),
        // 15 March 2024, 15 Mar. 2024
        (
            Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?\s+(\d{4})").unwrap(),
            FieldOrder::DayMonthName,
        ),
        // March 15, 2024
        (
            Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})").unwrap(),
            FieldOrder::MonthNameDay,
        ),
    ]
});

/// Extracts a publish date from date text
///
/// # Examples
///
/// ```
/// use blog_harvester::text::extract_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(extract_date("2024-03-15"), NaiveDate::from_ymd_opt(2024, 3, 15));
/// assert_eq!(extract_date("15 March 2024"), NaiveDate::from_ymd_opt(2024, 3, 15));
/// assert_eq!(extract_date("not a date"), None);
/// ```
pub fn extract_date(date_text: &str) -> Option<NaiveDate> {
    let date_text = date_text.trim();
    if date_text.is_empty() {
        return None;
    }

    for (pattern, order) in DATE_PATTERNS.iter() {
        // A match with an impossible calendar value falls through to the next pattern
        let found = pattern
            .captures_iter(date_text)
            .find_map(|caps| date_from_captures(&caps[1], &caps[2], &caps[3], *order));

        if found.is_some() {
            return found;
        }
    }

    None
}

fn date_from_captures(a: &str, b: &str, c: &str, order: FieldOrder) -> Option<NaiveDate> {
    let (year, month, day) = match order {
        FieldOrder::Ymd => (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?),
        FieldOrder::Dmy => (c.parse().ok()?, b.parse().ok()?, a.parse().ok()?),
        FieldOrder::Mdy => (c.parse().ok()?, a.parse().ok()?, b.parse().ok()?),
        FieldOrder::DayMonthName => (c.parse().ok()?, month_from_name(b)?, a.parse().ok()?),
        FieldOrder::MonthNameDay => (c.parse().ok()?, month_from_name(a)?, b.parse().ok()?),
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Maps a full or three-letter English month name to its number
fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}
