//! Composition orchestrator.
//!
//! Runs one day through an explicit sequence of stages:
//!
//! `Idle -> RetrievingChunks -> Prompting -> Generating ->
//! {ParseOk | ParseFailed | GenerationFailed} -> DeterministicFallback -> Done`
//!
//! Every stage returns a result and the orchestrator picks the next stage
//! from it. Nothing past retrieval is allowed to escape as an error: a
//! failed prompt, provider or parse routes to deterministic assembly, so
//! [`Composer::compose`] always yields a day with a non-empty body.

use std::sync::Arc;

use chrono::Utc;
use lectern_core::{AppConfig, AppError, AppResult};
use lectern_corpus::text::truncate_chars;
use lectern_corpus::{CorpusCache, ReferenceChunk, RetrievalRequest};
use lectern_ledger::{quota_requires_byo, QuotaState, UsageLedger, UsageRecord, UsageSummary};
use lectern_llm::{
    ChatMessage, GenerationRequest, KeySource, ProviderExecutionResult, ProviderRouter, RouteContext,
};
use lectern_prompt::{
    build_prompt, builtin_prompt, resolve_prompt, BuiltPrompt, PromptDefinition, COMPOSE_DAY,
};
use serde::Serialize;

use crate::fallback::deterministic_day;
use crate::parse::{parse_composed_day, ParseOutcome, ParsedDay};
use crate::report::{
    clamp_word_target, composition_report, endnotes, max_output_tokens, reading_minutes,
    GENERATED_COMPOSITION_NOTE,
};
use crate::types::{
    ComposeRequest, ComposeResult, ComposedDay, DayAnchor, GenerationOutcome, Principal, Stage,
};

/// Chunks retrieved when the request brings none.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 20;

/// Share of the word target given to the reflection body.
const REFLECTION_SHARE: f64 = 0.85;

/// One chunk as the prompt template sees it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptChunk<'a> {
    ordinal: usize,
    source_type: &'a str,
    title: &'a str,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptContext<'a> {
    word_target: usize,
    reflection_words: usize,
    day_number: u32,
    user_response: &'a str,
    anchor: &'a DayAnchor,
    chunks: Vec<PromptChunk<'a>>,
}

/// Ledger state read before generation.
struct Gate {
    principal: Principal,
    state: QuotaState,
    requires_byo: bool,
}

/// Composes days from corpus material and routed generation.
pub struct Composer {
    corpus: Arc<CorpusCache>,
    router: Arc<ProviderRouter>,
    ledger: Option<Arc<UsageLedger>>,
    prompt: PromptDefinition,
    prompt_override: bool,
    max_chunk_chars: usize,
    retrieval_limit: usize,
}

impl Composer {
    /// Composer using the built-in `compose.day` prompt.
    pub fn new(corpus: Arc<CorpusCache>, router: Arc<ProviderRouter>) -> AppResult<Self> {
        Ok(Self {
            corpus,
            router,
            ledger: None,
            prompt: builtin_prompt(COMPOSE_DAY)?,
            prompt_override: false,
            max_chunk_chars: 1200,
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
        })
    }

    /// Composer honouring the workspace prompt override and engine flags.
    pub fn from_config(
        config: &AppConfig,
        corpus: Arc<CorpusCache>,
        router: Arc<ProviderRouter>,
    ) -> AppResult<Self> {
        let (prompt, prompt_override) = resolve_prompt(&config.workspace, COMPOSE_DAY)?;
        if prompt_override {
            tracing::info!("Using workspace prompt override for {}", COMPOSE_DAY);
        }
        Ok(Self::new(corpus, router)?
            .with_prompt(prompt, prompt_override)
            .with_max_chunk_chars(config.flags.max_chunk_chars_in_context))
    }

    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition, workspace_override: bool) -> Self {
        self.prompt = prompt;
        self.prompt_override = workspace_override;
        self
    }

    /// Characters of each chunk placed in the prompt.
    pub fn with_max_chunk_chars(mut self, chars: usize) -> Self {
        self.max_chunk_chars = chars;
        self
    }

    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit;
        self
    }

    /// Compose one day. Never fails.
    pub async fn compose(&self, request: ComposeRequest) -> ComposeResult {
        let mut stages = vec![Stage::Idle];
        let word_target = clamp_word_target(request.target_word_count);

        tracing::info!(
            "Composing day {} ({}, target {} words)",
            request.day_number,
            request.anchor.scripture_reference,
            word_target
        );

        stages.push(Stage::RetrievingChunks);
        let chunks = self.gather_chunks(&request);
        let used_chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        tracing::debug!("Composing from {} reference chunks", chunks.len());

        let gate = self.check_quota(request.principal.as_ref()).await;

        stages.push(Stage::Prompting);
        let generation = match self.render(&request, &chunks, word_target) {
            Ok(built) => {
                stages.push(Stage::Generating);
                self.generate(built, &request.route, gate.as_ref(), word_target).await
            }
            Err(e) => Err(e),
        };

        let mut usage = None;
        let (day, outcome) = match generation {
            Ok(result) => {
                usage = self.record_usage(gate.as_ref(), &result).await;
                match parse_composed_day(&result.output) {
                    ParseOutcome::Parsed(parsed) => {
                        stages.push(Stage::ParseOk);
                        let day = generated_day(request.day_number, parsed, &chunks, word_target);
                        let outcome = GenerationOutcome::Generated {
                            provider: result.provider,
                            key_source: result.using,
                            cost_usd: result.estimated_cost_usd,
                            quality_score: result.quality_score,
                        };
                        (day, outcome)
                    }
                    ParseOutcome::Rejected(reason) => {
                        let err = AppError::OutputParseFailed(reason);
                        tracing::warn!("{} output rejected: {}", result.provider, err);
                        stages.push(Stage::ParseFailed);
                        self.fallback(&request, &chunks, err, &mut stages)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Generation failed for day {}: {}", request.day_number, e);
                stages.push(Stage::GenerationFailed);
                self.fallback(&request, &chunks, e, &mut stages)
            }
        };

        stages.push(Stage::Done);
        tracing::info!(
            "Day {} composed: {} words, {}% reference",
            day.day,
            day.total_words,
            day.composition_report.reference_percentage
        );

        ComposeResult {
            day,
            used_chunk_ids,
            stages,
            outcome,
            quota_state: usage
                .as_ref()
                .map(UsageSummary::effective_state)
                .or_else(|| gate.as_ref().map(|g| g.state)),
            usage,
        }
    }

    fn gather_chunks(&self, request: &ComposeRequest) -> Vec<ReferenceChunk> {
        if !request.reference_chunks.is_empty() {
            return request.reference_chunks.clone();
        }

        let topic = format!("{} {}", request.user_response, request.anchor.teaching_text);
        let retrieval = RetrievalRequest::new(topic.trim(), self.retrieval_limit)
            .with_themes(request.themes.clone())
            .with_anchors(vec![request.anchor.scripture_reference.clone()])
            .with_excluded(request.exclude_chunk_ids.clone());

        self.corpus.get().retrieve(&retrieval).chunks
    }

    async fn check_quota(&self, principal: Option<&Principal>) -> Option<Gate> {
        let (ledger, principal) = match (&self.ledger, principal) {
            (Some(ledger), Some(principal)) => (ledger, principal),
            _ => return None,
        };

        let summary = ledger.summary(&principal.id, principal.premium, Utc::now()).await;
        let requires_byo = quota_requires_byo(&summary);
        if requires_byo {
            let err = AppError::QuotaExhausted {
                principal: principal.id.clone(),
            };
            tracing::warn!("{}", err);
        }

        Some(Gate {
            principal: principal.clone(),
            state: summary.effective_state(),
            requires_byo,
        })
    }

    fn render(
        &self,
        request: &ComposeRequest,
        chunks: &[ReferenceChunk],
        word_target: usize,
    ) -> AppResult<BuiltPrompt> {
        let context = PromptContext {
            word_target,
            reflection_words: (word_target as f64 * REFLECTION_SHARE).round() as usize,
            day_number: request.day_number,
            user_response: request.user_response.trim(),
            anchor: &request.anchor,
            chunks: chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| PromptChunk {
                    ordinal: i + 1,
                    source_type: chunk.source_type.as_str(),
                    title: &chunk.title,
                    content: truncate_chars(&chunk.content, self.max_chunk_chars),
                })
                .collect(),
        };

        build_prompt(&self.prompt, &context, self.prompt_override)
    }

    async fn generate(
        &self,
        built: BuiltPrompt,
        route: &RouteContext,
        gate: Option<&Gate>,
        word_target: usize,
    ) -> AppResult<ProviderExecutionResult> {
        let mut context = route
            .clone()
            .with_max_output_tokens(max_output_tokens(word_target));
        if gate.is_some_and(|g| g.requires_byo) {
            context = context.with_platform_keys_enabled(false);
        }
        let generation =
            GenerationRequest::new(built.system, vec![ChatMessage::user(built.user)], context);
        self.router.generate(&generation).await
    }

    async fn record_usage(
        &self,
        gate: Option<&Gate>,
        result: &ProviderExecutionResult,
    ) -> Option<UsageSummary> {
        let ledger = self.ledger.as_ref()?;
        let gate = gate?;

        let record = UsageRecord::new(&gate.principal.id, result.provider, result.estimated_cost_usd)
            .with_tokens(result.input_tokens, result.output_tokens)
            .with_premium(gate.principal.premium)
            .charged(result.using == KeySource::PlatformKey);

        Some(ledger.record(record).await)
    }

    fn fallback(
        &self,
        request: &ComposeRequest,
        chunks: &[ReferenceChunk],
        reason: AppError,
        stages: &mut Vec<Stage>,
    ) -> (ComposedDay, GenerationOutcome) {
        stages.push(Stage::DeterministicFallback);
        tracing::info!("Assembling day {} from reference material", request.day_number);

        let day = deterministic_day(request.day_number, &request.anchor, chunks);
        let outcome = GenerationOutcome::Deterministic {
            reason: reason.to_string(),
        };
        (day, outcome)
    }
}

fn generated_day(
    day_number: u32,
    parsed: ParsedDay,
    chunks: &[ReferenceChunk],
    word_target: usize,
) -> ComposedDay {
    ComposedDay {
        day: day_number,
        endnotes: endnotes(
            &parsed.scripture_reference,
            chunks,
            &parsed.sources_used,
            GENERATED_COMPOSITION_NOTE,
        ),
        composition_report: composition_report(chunks, parsed.total_words),
        target_length_minutes: reading_minutes(word_target),
        total_words: parsed.total_words,
        title: parsed.title,
        scripture_reference: parsed.scripture_reference,
        scripture_text: parsed.scripture_text,
        reflection: parsed.reflection,
        prayer: parsed.prayer,
        next_step: parsed.next_step,
        journal_prompt: parsed.journal_prompt,
    }
}
