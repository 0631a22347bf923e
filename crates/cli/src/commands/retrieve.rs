//! Retrieve command handler.

use clap::Args;
use lectern_core::{config::AppConfig, AppResult};
use lectern_corpus::RetrievalRequest;

use super::{corpus_cache, print_json};

/// Rank reference chunks for a topic
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Free-text topic
    #[arg(long)]
    pub topic: String,

    /// Thematic tag (repeatable)
    #[arg(long = "theme")]
    pub themes: Vec<String>,

    /// Scripture anchor such as "Psalm 23:1" (repeatable)
    #[arg(long = "anchor")]
    pub anchors: Vec<String>,

    /// Chunk id to leave out (repeatable)
    #[arg(long = "exclude")]
    pub excluded: Vec<String>,

    /// Number of chunks (default: the configured per-day chunk count)
    #[arg(short = 'k', long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let limit = self.limit.unwrap_or(config.flags.max_reference_chunks);
        tracing::info!("Executing retrieve command (limit {})", limit);

        let request = RetrievalRequest::new(self.topic.clone(), limit)
            .with_themes(self.themes.clone())
            .with_anchors(self.anchors.clone())
            .with_excluded(self.excluded.clone());
        let result = corpus_cache(config).get().retrieve(&request);

        tracing::debug!(
            "Retrieved {} chunks, total score {:.3}",
            result.chunks.len(),
            result.total_score
        );

        if self.json {
            return print_json(&result);
        }

        if result.chunks.is_empty() {
            println!("No matching reference material.");
        }
        for (i, chunk) in result.chunks.iter().enumerate() {
            println!("{}. [{}] {} ({})", i + 1, chunk.source_type, chunk.title, chunk.id);
            println!("   {}", preview(&chunk.content));
        }

        let coverage = &result.coverage_report;
        if !coverage.themes_hit.is_empty() {
            println!("Themes covered: {}", coverage.themes_hit.join(", "));
        }
        if !coverage.themes_missed.is_empty() {
            println!("Themes missed:  {}", coverage.themes_missed.join(", "));
        }
        if !self.anchors.is_empty() {
            println!("Scripture anchor hit: {}", coverage.scripture_hit);
        }
        Ok(())
    }
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let clipped = lectern_corpus::text::truncate_chars(&flat, 160);
    if clipped.len() < flat.len() {
        format!("{}...", clipped)
    } else {
        clipped
    }
}
