//! Command handlers for the Lectern CLI.
//!
//! This module organizes all CLI commands into separate submodules, plus
//! the few helpers they share for wiring services from configuration.

pub mod compose;
pub mod corpus;
pub mod providers;
pub mod retrieve;
pub mod usage;

// Re-export command types for convenience
pub use compose::ComposeCommand;
pub use corpus::CorpusCommand;
pub use providers::ProvidersCommand;
pub use retrieve::RetrieveCommand;
pub use usage::UsageCommand;

use lectern_core::{config::AppConfig, AppError, AppResult};
use lectern_corpus::{CorpusCache, CorpusPaths};
use lectern_ledger::{create_store, UsageLedger};
use lectern_llm::ProviderId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Corpus cache for the configured library and artifact.
pub fn corpus_cache(config: &AppConfig) -> CorpusCache {
    CorpusCache::new(
        CorpusPaths::new(config.reference_root())
            .with_artifact(config.index_artifact())
            .with_base(config.workspace.clone()),
    )
}

/// Usage ledger on the configured store backend.
pub fn usage_ledger(config: &AppConfig) -> AppResult<UsageLedger> {
    let store = create_store(config)?;
    tracing::debug!("Usage ledger backed by {} store", store.name());
    Ok(UsageLedger::from_config(config, store))
}

/// Parse repeated `provider=key` arguments.
pub fn parse_keys(pairs: &[String]) -> AppResult<BTreeMap<ProviderId, String>> {
    let mut keys = BTreeMap::new();
    for pair in pairs {
        let (provider, key) = pair
            .split_once('=')
            .ok_or_else(|| AppError::Config(format!("Expected provider=key, got '{}'", pair)))?;
        let provider = provider.parse::<ProviderId>().map_err(AppError::Config)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Config(format!("Empty key for {}", provider)));
        }
        keys.insert(provider, key.to_string());
    }
    Ok(keys)
}

pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
