//! Word budgets, provenance reports and endnotes.

use lectern_corpus::ReferenceChunk;

use crate::types::{CompositionReport, Endnote};

pub const MIN_WORD_TARGET: usize = 1200;
pub const MAX_WORD_TARGET: usize = 6000;

/// Reading pace used for length estimates.
pub const READING_WPM: usize = 150;

const MIN_OUTPUT_TOKENS: u32 = 2000;
const MAX_OUTPUT_TOKENS: u32 = 12000;

const MIN_REFERENCE_PERCENT: u32 = 60;
const MAX_REFERENCE_PERCENT: u32 = 85;
const MAX_REPORT_SOURCES: usize = 20;
const MAX_ENDNOTE_SOURCES: usize = 5;

pub const GENERATED_COMPOSITION_NOTE: &str =
    "Curated content from verified theological sources, composed with interpretive framing.";
pub const ASSEMBLED_COMPOSITION_NOTE: &str =
    "Assembled directly from reference library excerpts without generative framing.";

pub fn clamp_word_target(words: usize) -> usize {
    words.clamp(MIN_WORD_TARGET, MAX_WORD_TARGET)
}

/// Output token budget: 1.5 tokens per target word, bounded.
pub fn max_output_tokens(word_target: usize) -> u32 {
    let tokens = (word_target as f64 * 1.5).round() as u32;
    tokens.clamp(MIN_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS)
}

pub fn reading_minutes(words: usize) -> usize {
    (words as f64 / READING_WPM as f64).round() as usize
}

/// Distinct chunk titles in retrieval order.
fn distinct_titles(chunks: &[ReferenceChunk]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for chunk in chunks {
        if !titles.contains(&chunk.title) {
            titles.push(chunk.title.clone());
        }
    }
    titles
}

/// Estimate how much of a day came from reference material.
///
/// With no chunks everything is generated. Otherwise the reference share is
/// `ref_words / (total_words + ref_words)`, held between 60 and 85 percent.
pub fn composition_report(chunks: &[ReferenceChunk], total_words: usize) -> CompositionReport {
    let reference_percentage = if chunks.is_empty() {
        0
    } else {
        let reference_words: usize = chunks.iter().map(|c| c.word_count).sum();
        let denominator = (total_words + reference_words).max(1) as f64;
        let share = (reference_words as f64 / denominator * 100.0).round() as u32;
        share.clamp(MIN_REFERENCE_PERCENT, MAX_REFERENCE_PERCENT)
    };

    let mut sources = distinct_titles(chunks);
    sources.truncate(MAX_REPORT_SOURCES);

    CompositionReport {
        reference_percentage,
        generated_percentage: 100 - reference_percentage,
        sources,
    }
}

/// Scripture note, an optional sources note, then the composition note.
///
/// Source names are the first five chunk titles plus the first three
/// declared sources, deduplicated and capped at five.
pub fn endnotes(
    scripture_reference: &str,
    chunks: &[ReferenceChunk],
    sources_used: &[String],
    composition_note: &str,
) -> Vec<Endnote> {
    let mut notes = vec![Endnote {
        id: 1,
        source: "Scripture".to_string(),
        note: scripture_reference.to_string(),
    }];

    let mut names: Vec<&str> = Vec::new();
    let candidates = chunks
        .iter()
        .take(5)
        .map(|c| c.title.as_str())
        .chain(sources_used.iter().take(3).map(String::as_str));
    for name in candidates {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.truncate(MAX_ENDNOTE_SOURCES);

    if !names.is_empty() {
        notes.push(Endnote {
            id: 2,
            source: "Sources".to_string(),
            note: format!(
                "This reading draws from {}. Composed for your reflection.",
                names.join(", ")
            ),
        });
    }

    notes.push(Endnote {
        id: notes.len() as u32 + 1,
        source: "Composition".to_string(),
        note: composition_note.to_string(),
    });
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_corpus::SourceType;

    fn chunk(title: &str, words: usize) -> ReferenceChunk {
        ReferenceChunk {
            id: format!("ref:{}:0", title),
            source: format!("{}.md", title),
            source_type: SourceType::Commentary,
            title: title.to_string(),
            content: "text".to_string(),
            keywords: Vec::new(),
            scripture_refs: Vec::new(),
            priority: 1,
            word_count: words,
        }
    }

    #[test]
    fn test_word_budget_bounds() {
        assert_eq!(clamp_word_target(300), 1200);
        assert_eq!(clamp_word_target(2500), 2500);
        assert_eq!(clamp_word_target(9000), 6000);

        assert_eq!(max_output_tokens(1200), 2000);
        assert_eq!(max_output_tokens(2000), 3000);
        assert_eq!(max_output_tokens(6000), 9000);
        assert_eq!(max_output_tokens(10_000), 12000);
    }

    #[test]
    fn test_report_without_chunks_is_fully_generated() {
        let report = composition_report(&[], 1500);
        assert_eq!(report.reference_percentage, 0);
        assert_eq!(report.generated_percentage, 100);
        assert!(report.sources.is_empty());
    }

    #[test]
    fn test_report_share_is_clamped() {
        // 100 / (1000 + 100) rounds to 9, raised to the floor
        let low = composition_report(&[chunk("Henry", 100)], 1000);
        assert_eq!(low.reference_percentage, 60);
        assert_eq!(low.generated_percentage, 40);

        // 3000 / 3300 rounds to 91, capped
        let high = composition_report(&[chunk("Henry", 3000)], 300);
        assert_eq!(high.reference_percentage, 85);

        // 700 / 1000 is inside the band
        let mid = composition_report(&[chunk("Henry", 400), chunk("Henry", 300)], 300);
        assert_eq!(mid.reference_percentage, 70);
        assert_eq!(mid.sources, vec!["Henry"]);
    }

    #[test]
    fn test_endnotes_dedupe_and_cap_sources() {
        let chunks: Vec<_> = ["A", "B", "A", "C"].iter().map(|t| chunk(t, 10)).collect();
        let declared = vec!["C".to_string(), "D".to_string(), "E".to_string(), "F".to_string()];
        let notes = endnotes("Psalm 23:1", &chunks, &declared, GENERATED_COMPOSITION_NOTE);

        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].note, "Psalm 23:1");
        assert_eq!(
            notes[1].note,
            "This reading draws from A, B, C, D, E. Composed for your reflection."
        );
        assert_eq!(notes[2].id, 3);
        assert_eq!(notes[2].source, "Composition");
    }

    #[test]
    fn test_endnotes_without_sources() {
        let notes = endnotes("John 1:1", &[], &[], ASSEMBLED_COMPOSITION_NOTE);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].id, 2);
        assert_eq!(notes[1].note, ASSEMBLED_COMPOSITION_NOTE);
    }
}
