//! Composition inputs and outputs.

use lectern_corpus::ReferenceChunk;
use lectern_ledger::{QuotaState, UsageSummary};
use lectern_llm::{KeySource, ProviderId, RouteContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default word target for a composed day.
pub const DEFAULT_WORD_TARGET: usize = 1500;

/// Curated material anchoring a day: the non-generated skeleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DayAnchor {
    pub day_title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub teaching_text: String,
    pub reflection_prompt: String,
    pub prayer_text: String,
    pub takeaway_text: String,
}

/// Who is paying for platform-funded generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub premium: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, premium: bool) -> Self {
        Self {
            id: id.into(),
            premium,
        }
    }
}

/// One day to compose.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub day_number: u32,
    pub anchor: DayAnchor,
    pub user_response: String,

    /// Intent themes extracted upstream
    pub themes: Vec<String>,

    /// Clamped to 1200..=6000
    pub target_word_count: usize,

    /// Pre-retrieved chunks; retrieval runs only when this is empty
    pub reference_chunks: Vec<ReferenceChunk>,

    pub exclude_chunk_ids: Vec<String>,

    pub route: RouteContext,

    /// Enables ledger gating and metering
    pub principal: Option<Principal>,
}

impl ComposeRequest {
    pub fn new(day_number: u32, anchor: DayAnchor, user_response: impl Into<String>) -> Self {
        Self {
            day_number,
            anchor,
            user_response: user_response.into(),
            themes: Vec::new(),
            target_word_count: DEFAULT_WORD_TARGET,
            reference_chunks: Vec::new(),
            exclude_chunk_ids: Vec::new(),
            route: RouteContext::new("compose_day"),
            principal: None,
        }
    }

    pub fn with_themes(mut self, themes: Vec<String>) -> Self {
        self.themes = themes;
        self
    }

    pub fn with_word_target(mut self, words: usize) -> Self {
        self.target_word_count = words;
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<ReferenceChunk>) -> Self {
        self.reference_chunks = chunks;
        self
    }

    pub fn with_excluded(mut self, ids: Vec<String>) -> Self {
        self.exclude_chunk_ids = ids;
        self
    }

    pub fn with_route(mut self, route: RouteContext) -> Self {
        self.route = route;
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endnote {
    pub id: u32,
    pub source: String,
    pub note: String,
}

/// Provenance split of a composed day. Percentages sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionReport {
    pub reference_percentage: u32,
    pub generated_percentage: u32,
    pub sources: Vec<String>,
}

/// Final content for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedDay {
    pub day: u32,
    pub title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub reflection: String,
    pub prayer: String,
    pub next_step: String,
    pub journal_prompt: String,
    pub endnotes: Vec<Endnote>,
    pub total_words: usize,
    pub target_length_minutes: usize,
    pub composition_report: CompositionReport,
}

/// Orchestrator states, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    RetrievingChunks,
    Prompting,
    Generating,
    ParseOk,
    ParseFailed,
    GenerationFailed,
    DeterministicFallback,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RetrievingChunks => "retrieving_chunks",
            Self::Prompting => "prompting",
            Self::Generating => "generating",
            Self::ParseOk => "parse_ok",
            Self::ParseFailed => "parse_failed",
            Self::GenerationFailed => "generation_failed",
            Self::DeterministicFallback => "deterministic_fallback",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// How the body was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationOutcome {
    #[serde(rename_all = "camelCase")]
    Generated {
        provider: ProviderId,
        key_source: KeySource,
        cost_usd: f64,
        quality_score: f64,
    },
    Deterministic { reason: String },
}

impl GenerationOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Everything a composition run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeResult {
    pub day: ComposedDay,
    pub used_chunk_ids: Vec<String>,
    pub stages: Vec<Stage>,
    pub outcome: GenerationOutcome,

    /// Present when the run was metered against a principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_state: Option<QuotaState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
}
