//! Heading- and paragraph-aware chunking of reference documents.

use crate::text::{
    extract_keywords, extract_scripture_refs, is_heading_line, truncate_chars, word_count,
};
use crate::types::{ReferenceChunk, SourceType};

/// Longest title kept on a chunk.
pub const MAX_TITLE_CHARS: usize = 120;

/// Word-count band for chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub min_words: usize,
    pub target_words: usize,
    pub max_words: usize,
}

impl ChunkingOptions {
    /// Band used for the live runtime corpus.
    pub fn runtime() -> Self {
        Self {
            min_words: 40,
            target_words: 400,
            max_words: 800,
        }
    }

    /// Band used for the deployable artifact.
    pub fn artifact() -> Self {
        Self {
            min_words: 40,
            target_words: 300,
            max_words: 600,
        }
    }
}

struct PendingChunk {
    lines: Vec<String>,
    title: String,
    words: usize,
}

impl PendingChunk {
    fn reset(&mut self) {
        self.lines.clear();
        self.words = 0;
    }
}

/// Split `text` into chunks.
///
/// A chunk is flushed when a heading arrives and the pending chunk already
/// has `min_words`, when a blank line is reached at or past `target_words`,
/// or as soon as the running count hits `max_words`. Pending text below
/// `min_words` is discarded at flush time.
///
/// # Arguments
/// * `text` - Document text
/// * `source` - Source label used in ids (relative path)
/// * `fallback_title` - Title used until the first heading (usually the file stem)
/// * `source_type` - Classification of the document
/// * `options` - Word-count band
pub fn chunk_text(
    text: &str,
    source: &str,
    fallback_title: &str,
    source_type: SourceType,
    options: &ChunkingOptions,
) -> Vec<ReferenceChunk> {
    let mut chunks: Vec<ReferenceChunk> = Vec::new();
    let mut pending = PendingChunk {
        lines: Vec::new(),
        title: truncate_chars(fallback_title, MAX_TITLE_CHARS),
        words: 0,
    };

    for line in text.split('\n') {
        let trimmed = line.trim();

        if is_heading_line(trimmed) && pending.words >= options.min_words {
            flush(&mut chunks, &pending, source, source_type, options);
            pending.reset();
            pending.title = truncate_chars(trimmed.trim_start_matches('#').trim_start(), MAX_TITLE_CHARS);
        }

        pending.lines.push(line.to_string());
        pending.words += word_count(trimmed);

        if pending.words >= options.target_words && trimmed.is_empty() {
            flush(&mut chunks, &pending, source, source_type, options);
            pending.reset();
        }

        if pending.words >= options.max_words {
            flush(&mut chunks, &pending, source, source_type, options);
            pending.reset();
        }
    }

    flush(&mut chunks, &pending, source, source_type, options);
    chunks
}

fn flush(
    chunks: &mut Vec<ReferenceChunk>,
    pending: &PendingChunk,
    source: &str,
    source_type: SourceType,
    options: &ChunkingOptions,
) {
    if pending.words < options.min_words {
        return;
    }
    let joined = pending.lines.join("\n");
    let content = joined.trim();
    if content.is_empty() {
        return;
    }

    // A single long line can overshoot the band; cut back to max_words.
    let (content, words) = if pending.words > options.max_words {
        let clipped = content
            .split_whitespace()
            .take(options.max_words)
            .collect::<Vec<_>>()
            .join(" ");
        (clipped, options.max_words)
    } else {
        (content.to_string(), pending.words)
    };
    let content = truncate_chars(&content, options.max_words * 8);

    chunks.push(ReferenceChunk {
        id: format!("ref:{}:{}", source, chunks.len()),
        source: source.to_string(),
        source_type,
        title: pending.title.clone(),
        keywords: extract_keywords(&content),
        scripture_refs: extract_scripture_refs(&content),
        content,
        priority: source_type.priority(),
        word_count: words,
    });
}
