//! Additive keyword scoring over a [`CorpusIndex`].

use std::collections::{HashMap, HashSet};

use crate::index::CorpusIndex;
use crate::text::extract_keywords;
use crate::types::{CoverageReport, ReferenceChunk, RetrievalRequest, RetrievalResult};

const TOPIC_WEIGHT: f64 = 2.0;
const SCRIPTURE_WEIGHT: f64 = 3.0;
const THEME_WEIGHT: f64 = 4.0;

/// Lower-cased alphanumeric tokens (two characters or more) of each anchor.
pub fn scripture_keywords(anchors: &[String]) -> Vec<String> {
    anchors
        .iter()
        .flat_map(|anchor| {
            anchor
                .to_lowercase()
                .chars()
                .map(|c| {
                    if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                        c
                    } else {
                        ' '
                    }
                })
                .collect::<String>()
                .split_whitespace()
                .filter(|w| w.len() >= 2)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Stable fraction in `[0, 0.083)` derived from the last character of the id.
pub fn tiebreak(id: &str) -> f64 {
    let code = id.chars().last().map(|c| c as u32).unwrap_or(0);
    f64::from(code % 83) / 1000.0
}

/// Score one chunk.
///
/// `score = 2 * topic hits + 3 * citation hits + 4 * theme hits + priority + tiebreak`
pub fn score_chunk(
    chunk: &ReferenceChunk,
    normalized: &str,
    topic_keywords: &[String],
    scripture_keywords: &[String],
    theme_keywords: &[String],
) -> f64 {
    let hits = |keywords: &[String]| {
        keywords
            .iter()
            .filter(|kw| normalized.contains(kw.to_lowercase().as_str()))
            .count() as f64
    };

    TOPIC_WEIGHT * hits(topic_keywords)
        + SCRIPTURE_WEIGHT * hits(scripture_keywords)
        + THEME_WEIGHT * hits(theme_keywords)
        + f64::from(chunk.priority)
        + tiebreak(&chunk.id)
}

/// Rank the index against `request`.
///
/// Excluded ids are never returned, at most `limit` chunks come back and no
/// source file contributes more than `max(3, ceil(limit / 5))` of them. An
/// empty index gives an empty result with every theme missed.
pub fn retrieve(index: &CorpusIndex, request: &RetrievalRequest) -> RetrievalResult {
    if index.is_empty() {
        return RetrievalResult {
            chunks: Vec::new(),
            total_score: 0.0,
            coverage_report: CoverageReport {
                themes_hit: Vec::new(),
                themes_missed: request.themes.clone(),
                scripture_hit: false,
            },
        };
    }

    let excluded: HashSet<&str> = request.exclude_chunk_ids.iter().map(String::as_str).collect();
    let topic_keywords = extract_keywords(&request.topic);
    let anchor_keywords = scripture_keywords(&request.scripture_anchors);
    let theme_keywords: Vec<String> = request
        .themes
        .iter()
        .filter(|t| t.chars().count() >= 3)
        .cloned()
        .collect();

    let mut scored: Vec<(&ReferenceChunk, &str, f64)> = index
        .entries()
        .filter(|(chunk, _)| !excluded.contains(chunk.id.as_str()))
        .map(|(chunk, normalized)| {
            let score = score_chunk(
                chunk,
                normalized,
                &topic_keywords,
                &anchor_keywords,
                &theme_keywords,
            );
            (chunk, normalized, score)
        })
        .filter(|(_, _, score)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let max_per_source = 3.max(request.limit.div_ceil(5));
    let mut per_source: HashMap<&str, usize> = HashMap::new();
    let mut selected: Vec<(&ReferenceChunk, &str, f64)> = Vec::new();
    for entry in scored {
        if selected.len() >= request.limit {
            break;
        }
        let count = per_source.entry(entry.0.source.as_str()).or_insert(0);
        if *count >= max_per_source {
            continue;
        }
        *count += 1;
        selected.push(entry);
    }

    let combined = selected
        .iter()
        .map(|(_, normalized, _)| *normalized)
        .collect::<Vec<_>>()
        .join(" ");
    let (themes_hit, themes_missed): (Vec<String>, Vec<String>) = theme_keywords
        .into_iter()
        .partition(|theme| combined.contains(theme.to_lowercase().as_str()));
    let scripture_hit = anchor_keywords
        .iter()
        .any(|kw| combined.contains(kw.as_str()));

    tracing::debug!(
        "Retrieved {} chunks (themes hit {}, missed {})",
        selected.len(),
        themes_hit.len(),
        themes_missed.len()
    );

    RetrievalResult {
        total_score: selected.iter().map(|(_, _, score)| score).sum(),
        chunks: selected.into_iter().map(|(chunk, _, _)| chunk.clone()).collect(),
        coverage_report: CoverageReport {
            themes_hit,
            themes_missed,
            scripture_hit,
        },
    }
}
