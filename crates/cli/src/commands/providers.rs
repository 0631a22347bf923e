//! Providers command handler.
//!
//! Lists every generation provider with whether it can be used right now
//! and, if so, whose key would pay for it.

use clap::Args;
use lectern_core::{config::AppConfig, AppResult};
use lectern_llm::{create_router, HealthTracker, KeySource};
use std::sync::Arc;

use super::{parse_keys, print_json};

/// Show which generation providers are usable
#[derive(Args, Debug)]
pub struct ProvidersCommand {
    /// Caller-supplied key as provider=key (repeatable)
    #[arg(long = "key", value_name = "PROVIDER=KEY")]
    pub keys: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProvidersCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing providers command");

        let user_keys = parse_keys(&self.keys)?;
        let router = create_router(config, Arc::new(HealthTracker::new()))?;
        let listing = router.availability(
            &user_keys,
            config.flags.platform_keys_enabled,
            config.flags.allow_high_cost_on_platform,
        );

        if self.json {
            return print_json(&listing);
        }

        for entry in &listing {
            let status = match entry.using {
                KeySource::PlatformKey => "available (platform key)",
                KeySource::ByoKey => "available (your key)",
                KeySource::Unavailable => "unavailable",
            };
            match &entry.reason {
                Some(reason) => println!("{:<12} {}: {}", entry.provider.as_str(), status, reason),
                None => println!("{:<12} {}", entry.provider.as_str(), status),
            }
        }
        Ok(())
    }
}
