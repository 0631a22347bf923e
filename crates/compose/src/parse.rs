//! Strict validation of generated day output.
//!
//! The model is asked for a JSON object. Anything that is not one, or that
//! lacks a title, reference or body, is rejected with a reason instead of
//! being patched up.

use lectern_corpus::text::{truncate_chars, word_count};
use serde_json::{Map, Value};

pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_SCRIPTURE_TEXT_CHARS: usize = 2000;
pub const MAX_PRAYER_CHARS: usize = 2000;
pub const MAX_PROMPT_CHARS: usize = 500;
pub const MAX_SOURCES: usize = 20;

/// Validated fields of a generated day.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDay {
    pub title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub reflection: String,
    pub prayer: String,
    pub next_step: String,
    pub journal_prompt: String,
    pub total_words: usize,
    pub sources_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(ParsedDay),
    Rejected(String),
}

/// Remove a surrounding ``` or ```json fence.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn optional_text(object: &Map<String, Value>, field: &str, max: usize) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s.trim(), max))
        .unwrap_or_default()
}

fn required_text(object: &Map<String, Value>, field: &str, max: Option<usize>) -> Result<String, String> {
    let value = object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing or empty field '{}'", field))?;
    Ok(match max {
        Some(max) => truncate_chars(value, max),
        None => value.to_string(),
    })
}

fn parse_object(object: &Map<String, Value>) -> Result<ParsedDay, String> {
    let title = required_text(object, "title", Some(MAX_TITLE_CHARS))?;
    let scripture_reference = required_text(object, "scriptureReference", Some(MAX_TITLE_CHARS))?;
    let reflection = required_text(object, "reflection", None)?;

    let total_words = match object.get("totalWords").and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n >= 0.0 => n.round() as usize,
        _ => word_count(&reflection),
    };

    let sources_used = object
        .get("sourcesUsed")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .take(MAX_SOURCES)
                .collect()
        })
        .unwrap_or_default();

    Ok(ParsedDay {
        title,
        scripture_reference,
        scripture_text: optional_text(object, "scriptureText", MAX_SCRIPTURE_TEXT_CHARS),
        reflection,
        prayer: optional_text(object, "prayer", MAX_PRAYER_CHARS),
        next_step: optional_text(object, "nextStep", MAX_PROMPT_CHARS),
        journal_prompt: optional_text(object, "journalPrompt", MAX_PROMPT_CHARS),
        total_words,
        sources_used,
    })
}

/// Validate raw model output as a composed day.
pub fn parse_composed_day(raw: &str) -> ParseOutcome {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return ParseOutcome::Rejected("empty output".to_string());
    }

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => return ParseOutcome::Rejected(format!("not valid JSON: {}", e)),
    };

    let Some(object) = value.as_object() else {
        return ParseOutcome::Rejected("expected a JSON object".to_string());
    };

    match parse_object(object) {
        Ok(day) => ParseOutcome::Parsed(day),
        Err(reason) => ParseOutcome::Rejected(reason),
    }
}
