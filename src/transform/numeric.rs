//! Text and number cleanup for scraped cell values

use once_cell::sync::Lazy;
use regex::Regex;

/// Korean unit suffixes, longest first so `억원` is removed before `원`
const UNIT_SUFFIXES: &[&str] = &["억원", "만원", "배", "원", "%"];

/// Markers attached to expandable rows on the financial pages
const ITEM_MARKERS: &[char] = &['▼', '▲', '△', '▽', '+'];

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TRAILING_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

/// Parses a scraped numeric cell
///
/// Thousands separators, whitespace and unit suffixes are stripped first.
/// Absent markers (`N/A`, `-`, empty) and anything that still is not a plain
/// decimal afterwards yield `None`.
///
/// # Example
///
/// ```
/// use naver_finance_crawler::transform::parse_number;
///
/// assert_eq!(parse_number("5,678원"), Some(5678.0));
/// assert_eq!(parse_number("-12.5%"), Some(-12.5));
/// assert_eq!(parse_number("N/A"), None);
/// ```
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("N/A") {
        return None;
    }

    for unit in UNIT_SUFFIXES {
        if let Some(stripped) = cleaned.strip_suffix(unit) {
            cleaned = stripped.to_string();
            break;
        }
    }

    if !NUMBER.is_match(&cleaned) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Collapses runs of whitespace into single spaces and trims
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Normalizes a financial row label for metric lookup
///
/// Removes the `펼치기` toggle text, expand/collapse markers, a trailing
/// parenthesized unit and all whitespace.
pub fn clean_item_label(raw: &str) -> String {
    let without_toggle = raw.replace("펼치기", "");
    let without_markers: String = without_toggle
        .chars()
        .filter(|c| !ITEM_MARKERS.contains(c))
        .collect();
    let collapsed = collapse_whitespace(&without_markers);
    let without_unit = TRAILING_PAREN.replace(&collapsed, "");

    without_unit
        .trim_start_matches('-')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Splits a `PER l EPS` style pair on the Latin `l` separator
///
/// A text without separator is a single part.
pub fn split_pair(raw: &str) -> Vec<String> {
    raw.split('l').map(|part| part.trim().to_string()).collect()
}
