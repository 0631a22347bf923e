//! Pick a backend by the shape of the key.

use lectern_core::AppResult;
use std::sync::Arc;

use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// Prefix of Anthropic API keys.
pub const ANTHROPIC_KEY_PREFIX: &str = "sk-ant-";

/// Serves one provider slot with two backends: keys starting with
/// `sk-ant-` go to the Anthropic backend, everything else to the default.
pub struct KeyRoutedClient {
    default: Arc<dyn LlmClient>,
    anthropic: Arc<dyn LlmClient>,
}

impl KeyRoutedClient {
    pub fn new(default: Arc<dyn LlmClient>, anthropic: Arc<dyn LlmClient>) -> Self {
        Self { default, anthropic }
    }

    fn backend_for(&self, api_key: &str) -> &Arc<dyn LlmClient> {
        if api_key.starts_with(ANTHROPIC_KEY_PREFIX) {
            &self.anthropic
        } else {
            &self.default
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for KeyRoutedClient {
    fn provider_name(&self) -> &str {
        self.default.provider_name()
    }

    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.backend_for(api_key).complete(api_key, request).await
    }
}
