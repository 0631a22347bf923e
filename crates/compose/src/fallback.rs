//! Deterministic day assembly.
//!
//! Builds a complete day straight from the anchor and the retrieved chunks
//! with no provider involved. It cannot fail, which is what lets composition
//! promise non-empty output.

use lectern_corpus::text::{truncate_chars, word_count};
use lectern_corpus::{ReferenceChunk, SourceType};

use crate::report::{composition_report, endnotes, reading_minutes, ASSEMBLED_COMPOSITION_NOTE};
use crate::types::{ComposedDay, DayAnchor};

/// Characters kept from each chunk.
pub const MAX_FALLBACK_CHUNK_CHARS: usize = 1200;

/// Characters of scripture text quoted in the opening line.
pub const MAX_OPENING_CHARS: usize = 600;

/// Body used when neither chunks nor teaching text exist.
pub const EMPTY_BODY: &str =
    "Read the passage slowly, twice, and sit with the verse that holds your attention.";

/// Assembly order: primary text, commentary, theology, lexical notes, then
/// anything else. `None` matches every remaining type.
const GROUPS: [(Option<SourceType>, usize); 5] = [
    (Some(SourceType::Bible), 3),
    (Some(SourceType::Commentary), 8),
    (Some(SourceType::Theology), 5),
    (Some(SourceType::Lexicon), 3),
    (None, 3),
];

fn is_grouped(source_type: SourceType) -> bool {
    GROUPS.iter().any(|(group, _)| *group == Some(source_type))
}

/// Chunk bodies in assembly order, each clipped.
fn grouped_sections(chunks: &[ReferenceChunk]) -> Vec<String> {
    let mut sections = Vec::new();
    for (group, cap) in GROUPS {
        let members = chunks
            .iter()
            .filter(|c| match group {
                Some(source_type) => c.source_type == source_type,
                None => !is_grouped(c.source_type),
            })
            .take(cap);
        for chunk in members {
            let content = truncate_chars(chunk.content.trim(), MAX_FALLBACK_CHUNK_CHARS);
            if !content.is_empty() {
                sections.push(content);
            }
        }
    }
    sections
}

/// The reflection body: opening line, then grouped chunks or the teaching.
pub fn assemble_reflection(anchor: &DayAnchor, chunks: &[ReferenceChunk]) -> String {
    let mut sections = Vec::new();

    let reference = anchor.scripture_reference.trim();
    if !reference.is_empty() {
        sections.push(format!(
            "{} reads: \"{}\"",
            reference,
            truncate_chars(anchor.scripture_text.trim(), MAX_OPENING_CHARS)
        ));
    }

    if chunks.is_empty() {
        let teaching = anchor.teaching_text.trim();
        if !teaching.is_empty() {
            sections.push(teaching.to_string());
        }
    } else {
        sections.extend(grouped_sections(chunks));
    }

    if sections.is_empty() {
        return EMPTY_BODY.to_string();
    }
    sections.join("\n\n")
}

/// A complete day built from the anchor and `chunks` alone.
pub fn deterministic_day(day_number: u32, anchor: &DayAnchor, chunks: &[ReferenceChunk]) -> ComposedDay {
    let reflection = assemble_reflection(anchor, chunks);
    let total_words = word_count(&reflection);

    ComposedDay {
        day: day_number,
        title: anchor.day_title.clone(),
        scripture_reference: anchor.scripture_reference.clone(),
        scripture_text: anchor.scripture_text.clone(),
        reflection,
        prayer: anchor.prayer_text.clone(),
        next_step: anchor.takeaway_text.clone(),
        journal_prompt: anchor.reflection_prompt.clone(),
        endnotes: endnotes(&anchor.scripture_reference, chunks, &[], ASSEMBLED_COMPOSITION_NOTE),
        total_words,
        target_length_minutes: reading_minutes(total_words),
        composition_report: composition_report(chunks, total_words),
    }
}
