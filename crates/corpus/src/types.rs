//! Corpus type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of reference material a chunk was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Commentary,
    /// Primary text
    Bible,
    Lexicon,
    Dictionary,
    Theology,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Commentary,
        SourceType::Bible,
        SourceType::Lexicon,
        SourceType::Dictionary,
        SourceType::Theology,
    ];

    /// Ranking weight added to every retrieval score.
    pub fn priority(self) -> u32 {
        match self {
            SourceType::Commentary => 5,
            SourceType::Bible => 4,
            SourceType::Lexicon | SourceType::Dictionary => 3,
            SourceType::Theology => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Commentary => "commentary",
            SourceType::Bible => "bible",
            SourceType::Lexicon => "lexicon",
            SourceType::Dictionary => "dictionary",
            SourceType::Theology => "theology",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded excerpt of a reference document.
///
/// Serialized field names match the static index artifact format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceChunk {
    /// `ref:<relative source>:<ordinal>`
    pub id: String,

    /// Source path relative to the corpus base directory
    pub source: String,

    pub source_type: SourceType,

    pub title: String,

    pub content: String,

    /// Lower-cased, stop-word-free, deduplicated tokens
    pub keywords: Vec<String>,

    /// Citation references found in the content
    pub scripture_refs: Vec<String>,

    pub priority: u32,

    pub word_count: usize,
}

/// Query against the corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    /// Thematic tags; each matching theme is worth the most
    pub themes: Vec<String>,

    /// Citation anchors such as "Psalm 23:1"
    pub scripture_anchors: Vec<String>,

    /// Free text topic
    pub topic: String,

    /// Chunk ids that must not be returned
    #[serde(default)]
    pub exclude_chunk_ids: Vec<String>,

    pub limit: usize,
}

impl RetrievalRequest {
    pub fn new(topic: impl Into<String>, limit: usize) -> Self {
        Self {
            topic: topic.into(),
            limit,
            ..Self::default()
        }
    }

    pub fn with_themes(mut self, themes: Vec<String>) -> Self {
        self.themes = themes;
        self
    }

    pub fn with_anchors(mut self, anchors: Vec<String>) -> Self {
        self.scripture_anchors = anchors;
        self
    }

    pub fn with_excluded(mut self, ids: Vec<String>) -> Self {
        self.exclude_chunk_ids = ids;
        self
    }
}

/// Which requested themes the selected chunks cover.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub themes_hit: Vec<String>,
    pub themes_missed: Vec<String>,
    pub scripture_hit: bool,
}

/// Ranked chunks plus coverage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub chunks: Vec<ReferenceChunk>,
    pub total_score: f64,
    pub coverage_report: CoverageReport,
}

/// Diagnostic counts over an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub total_chunks: usize,
    pub by_source_type: BTreeMap<SourceType, usize>,
    pub total_words: usize,
}

impl CorpusStats {
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a ReferenceChunk>) -> Self {
        let mut by_source_type: BTreeMap<SourceType, usize> =
            SourceType::ALL.iter().map(|t| (*t, 0)).collect();
        let mut total_chunks = 0;
        let mut total_words = 0;
        for chunk in chunks {
            *by_source_type.entry(chunk.source_type).or_insert(0) += 1;
            total_chunks += 1;
            total_words += chunk.word_count;
        }
        Self {
            total_chunks,
            by_source_type,
            total_words,
        }
    }
}
