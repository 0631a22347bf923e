//! Router factory.
//!
//! Builds the HTTP-backed router from application configuration: one
//! backend per provider slot, endpoint and model overridable per provider,
//! platform keys resolved from the environment.

use lectern_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

use crate::client::LlmClient;
use crate::credentials::PlatformKeys;
use crate::health::HealthTracker;
use crate::providers::{
    AnthropicClient, GoogleClient, KeyRoutedClient, OpenAiClient, ANTHROPIC_API_URL,
    GOOGLE_API_URL, OPENAI_API_URL,
};
use crate::router::ProviderRouter;
use crate::types::ProviderId;

pub const MINIMAX_API_URL: &str = "https://api.minimax.chat/v1/text/chatcompletion_v2";
pub const NVIDIA_API_URL: &str = "https://integrate.api.nvidia.com/v1/chat/completions";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_MINIMAX_MODEL: &str = "MiniMax-M2";
pub const DEFAULT_NVIDIA_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Endpoint and model for one configuration entry, with defaults applied.
fn endpoint(config: &AppConfig, name: &str, url: &str, model: &str) -> (String, String) {
    let entry = config.provider_config(name);
    (
        entry
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| url.to_string()),
        entry
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| model.to_string()),
    )
}

fn http_client(config: &AppConfig, name: &str) -> AppResult<reqwest::Client> {
    let secs = config
        .provider_config(name)
        .and_then(|p| p.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    reqwest::Client::builder()
        .timeout(Duration::from_secs(secs))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client for {}: {}", name, e)))
}

/// Create the HTTP backend for one provider slot.
///
/// The `openai` slot is key-routed: Anthropic keys are served by the
/// Anthropic messages API (configured under `anthropic`), other keys by
/// OpenAI chat completions.
pub fn create_client(config: &AppConfig, provider: ProviderId) -> AppResult<Arc<dyn LlmClient>> {
    let name = provider.as_str();
    let http = http_client(config, name)?;

    let client: Arc<dyn LlmClient> = match provider {
        ProviderId::OpenAi => {
            let (url, model) = endpoint(config, name, OPENAI_API_URL, DEFAULT_OPENAI_MODEL);
            let (anthropic_url, anthropic_model) =
                endpoint(config, "anthropic", ANTHROPIC_API_URL, DEFAULT_ANTHROPIC_MODEL);
            let anthropic_http = http_client(config, "anthropic")?;
            Arc::new(KeyRoutedClient::new(
                Arc::new(OpenAiClient::new(name, url, model, http)),
                Arc::new(AnthropicClient::new(anthropic_url, anthropic_model, anthropic_http)),
            ))
        }
        ProviderId::Google => {
            let (url, model) = endpoint(config, name, GOOGLE_API_URL, DEFAULT_GOOGLE_MODEL);
            Arc::new(GoogleClient::new(url, model, http))
        }
        ProviderId::Minimax => {
            let (url, model) = endpoint(config, name, MINIMAX_API_URL, DEFAULT_MINIMAX_MODEL);
            Arc::new(OpenAiClient::new(name, url, model, http).accepting_alternate_fields())
        }
        ProviderId::NvidiaKimi => {
            let (url, model) = endpoint(config, name, NVIDIA_API_URL, DEFAULT_NVIDIA_MODEL);
            Arc::new(OpenAiClient::new(name, url, model, http).accepting_alternate_fields())
        }
    };

    tracing::debug!("Created {} backend", name);
    Ok(client)
}

/// Create a router with every provider backend registered.
///
/// # Arguments
/// * `config` - Application configuration (endpoints, models, key env vars, flags)
/// * `health` - Shared health tracker; pass the same one across requests
pub fn create_router(config: &AppConfig, health: Arc<HealthTracker>) -> AppResult<ProviderRouter> {
    let keys = PlatformKeys::from_env(config);
    tracing::debug!("Platform keys present for {:?}", keys);

    ProviderId::ALL.iter().try_fold(
        ProviderRouter::new(keys, health).with_quality_floor(config.flags.quality_floor),
        |router, &provider| Ok(router.with_client(provider, create_client(config, provider)?)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::config::ProviderConfig;

    #[test]
    fn test_endpoint_defaults() {
        let config = AppConfig::default();
        let (url, model) = endpoint(&config, "minimax", MINIMAX_API_URL, DEFAULT_MINIMAX_MODEL);
        assert_eq!(url, MINIMAX_API_URL);
        assert_eq!(model, "MiniMax-M2");
    }

    #[test]
    fn test_endpoint_overrides() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "google".to_string(),
            ProviderConfig {
                model: Some("gemini-pro".to_string()),
                ..Default::default()
            },
        );
        let (url, model) = endpoint(&config, "google", GOOGLE_API_URL, DEFAULT_GOOGLE_MODEL);
        assert_eq!(url, GOOGLE_API_URL);
        assert_eq!(model, "gemini-pro");
    }

    #[test]
    fn test_create_router_registers_every_provider() {
        let config = AppConfig::default();
        let router = create_router(&config, Arc::new(HealthTracker::new()));
        assert!(router.is_ok());
    }
}
