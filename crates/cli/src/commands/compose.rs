//! Compose command handler.
//!
//! Composes one grounded day from the reference library. The command only
//! fails on bad arguments or configuration; provider trouble shows up as a
//! deterministic outcome in the output instead.

use clap::Args;
use lectern_compose::{ComposeRequest, Composer, DayAnchor, GenerationOutcome, Principal};
use lectern_core::{config::AppConfig, AppResult};
use lectern_llm::{create_router, HealthTracker, ProviderMode, RouteContext};
use std::sync::Arc;

use super::{corpus_cache, parse_keys, print_json, usage_ledger};

/// Compose one grounded day
#[derive(Args, Debug)]
pub struct ComposeCommand {
    /// Scripture reference anchoring the day, e.g. "Psalm 23:1"
    #[arg(long)]
    pub reference: String,

    /// Scripture text for the reference
    #[arg(long)]
    pub text: String,

    /// Working title for the day
    #[arg(long)]
    pub title: String,

    /// The reader's own reflection
    #[arg(long)]
    pub response: String,

    /// Curated teaching used when the library has nothing to offer
    #[arg(long, default_value = "")]
    pub teaching: String,

    #[arg(long, default_value = "")]
    pub prayer: String,

    #[arg(long, default_value = "")]
    pub takeaway: String,

    #[arg(long, default_value = "")]
    pub journal_prompt: String,

    /// Day number within the plan
    #[arg(long, default_value = "1")]
    pub day: u32,

    /// Intent theme (repeatable)
    #[arg(long = "theme")]
    pub themes: Vec<String>,

    /// auto, or a provider id to force
    #[arg(long, default_value = "auto")]
    pub provider: String,

    /// Caller-supplied key as provider=key (repeatable)
    #[arg(long = "key", value_name = "PROVIDER=KEY")]
    pub keys: Vec<String>,

    /// Principal to meter against the usage ledger
    #[arg(long)]
    pub principal: Option<String>,

    /// Principal holds a subscription
    #[arg(long)]
    pub premium: bool,

    /// Target word count (1200-6000)
    #[arg(long, default_value = "1500")]
    pub words: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ComposeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing compose command for {}", self.reference);

        let route = RouteContext::new("compose_day")
            .with_mode(ProviderMode::parse(&self.provider))
            .with_user_keys(parse_keys(&self.keys)?)
            .with_platform_keys_enabled(config.flags.platform_keys_enabled)
            .with_high_cost_on_platform(config.flags.allow_high_cost_on_platform);

        let router = create_router(config, Arc::new(HealthTracker::new()))?;
        let mut composer = Composer::from_config(
            config,
            Arc::new(corpus_cache(config)),
            Arc::new(router),
        )?;

        let mut request = ComposeRequest::new(self.day, self.anchor(), self.response.clone())
            .with_themes(self.themes.clone())
            .with_word_target(self.words)
            .with_route(route);

        if let Some(principal) = &self.principal {
            composer = composer.with_ledger(Arc::new(usage_ledger(config)?));
            request = request.with_principal(Principal::new(principal.clone(), self.premium));
        }

        let result = composer.compose(request).await;

        if self.json {
            return print_json(&result);
        }

        let day = &result.day;
        println!("Day {}: {}", day.day, day.title);
        println!("{}", day.scripture_reference);
        if !day.scripture_text.is_empty() {
            println!("  {}", day.scripture_text);
        }
        println!();
        println!("{}", day.reflection);
        for (label, body) in [
            ("Prayer", &day.prayer),
            ("Next step", &day.next_step),
            ("Journal", &day.journal_prompt),
        ] {
            if !body.is_empty() {
                println!();
                println!("{}: {}", label, body);
            }
        }

        println!();
        for note in &day.endnotes {
            println!("[{}] {}: {}", note.id, note.source, note.note);
        }

        let report = &day.composition_report;
        println!();
        println!(
            "{} words (~{} min), {}% reference / {}% generated",
            day.total_words, day.target_length_minutes, report.reference_percentage, report.generated_percentage
        );
        match &result.outcome {
            GenerationOutcome::Generated {
                provider,
                key_source,
                cost_usd,
                quality_score,
            } => println!(
                "Generated by {} ({:?}), quality {:.2}, ${:.6}",
                provider, key_source, quality_score, cost_usd
            ),
            GenerationOutcome::Deterministic { reason } => {
                println!("Assembled from the reference library: {}", reason)
            }
        }
        if let Some(state) = result.quota_state {
            println!("Quota state: {}", state);
        }
        Ok(())
    }

    fn anchor(&self) -> DayAnchor {
        DayAnchor {
            day_title: self.title.clone(),
            scripture_reference: self.reference.clone(),
            scripture_text: self.text.clone(),
            teaching_text: self.teaching.clone(),
            reflection_prompt: self.journal_prompt.clone(),
            prayer_text: self.prayer.clone(),
            takeaway_text: self.takeaway.clone(),
        }
    }
}
