//! Heuristic output quality.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cost::round_to;

/// Characters for full length credit.
const FULL_LENGTH: f64 = 220.0;

static CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[1-3]\s)?[A-Z][a-z]+\s\d{1,3}:\d{1,3}(?:-\d{1,3})?\b")
        .expect("citation pattern compiles")
});

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}").expect("paragraph pattern compiles"));

/// Score text in `[0, 1]`: up to 0.6 for length, 0.2 for two or more
/// paragraphs and 0.2 for a recognisable citation. Rounded to 3 decimals.
pub fn quality_score(text: &str) -> f64 {
    let normalized = text.trim();
    if normalized.is_empty() {
        return 0.0;
    }

    let length = (normalized.chars().count() as f64 / FULL_LENGTH).min(1.0);
    let paragraphs = if PARAGRAPH_BREAK.split(normalized).count() >= 2 {
        0.2
    } else {
        0.0
    };
    let citation = if CITATION.is_match(normalized) { 0.2 } else { 0.0 };

    round_to(length * 0.6 + paragraphs + citation, 3).clamp(0.0, 1.0)
}
