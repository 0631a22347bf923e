//! Corpus command handler.
//!
//! Builds the deployable index artifact and reports corpus statistics.

use clap::{Args, Subcommand};
use lectern_core::{config::AppConfig, AppResult};
use lectern_corpus::build_artifact;
use std::path::PathBuf;

use super::{corpus_cache, print_json};

/// Reference library indexing and statistics
#[derive(Args, Debug)]
pub struct CorpusCommand {
    #[command(subcommand)]
    pub action: CorpusAction,
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// Build the static index artifact from the live library
    BuildIndex(BuildIndexCommand),
    /// Show chunk counts for the active index
    Stats(CorpusStatsCommand),
}

impl CorpusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            CorpusAction::BuildIndex(cmd) => cmd.execute(config),
            CorpusAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

/// Build the static index artifact
#[derive(Args, Debug)]
pub struct BuildIndexCommand {
    /// Output path (default: the configured index artifact)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildIndexCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let out = self.out.clone().unwrap_or_else(|| config.index_artifact());
        tracing::info!("Executing corpus build-index to {:?}", out);

        let stats = build_artifact(&config.reference_root(), &config.workspace, &out)?;

        if self.json {
            return print_json(&stats);
        }

        println!(
            "Indexed {} files into {} chunks ({} words, {} bytes)",
            stats.files_indexed, stats.corpus.total_chunks, stats.corpus.total_words, stats.bytes_written
        );
        for (author, (kept, produced)) in &stats.chunks_by_author {
            if kept < produced {
                println!("  {}: kept {} of {}", author, kept, produced);
            }
        }
        println!("Wrote {}", out.display());
        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct CorpusStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing corpus stats command");

        let cache = corpus_cache(config);
        let stats = cache.get().stats();

        if self.json {
            return print_json(&stats);
        }

        if stats.total_chunks == 0 {
            println!("No reference material found.");
            println!("  Library:  {}", config.reference_root().display());
            println!("  Artifact: {}", config.index_artifact().display());
            return Ok(());
        }

        println!("Chunks: {}", stats.total_chunks);
        println!("Words:  {}", stats.total_words);
        for (source_type, count) in &stats.by_source_type {
            println!("  {:<12} {}", source_type.as_str(), count);
        }
        Ok(())
    }
}
