//! Anthropic messages API.

use lectern_core::AppResult;
use serde::{Deserialize, Serialize};

use super::{call_failed, status_error};
use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::types::ChatMessage;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagesResponse {
    content: Vec<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

pub struct AnthropicClient {
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            client,
        }
    }

    /// Join the text parts of a response.
    fn extract_text(response: MessagesResponse) -> String {
        response
            .content
            .into_iter()
            .filter(|part| part.kind.as_deref() == Some("text"))
            .filter_map(|part| part.text)
            .map(|text| text.trim().to_string())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending messages request to Anthropic ({})", self.model);

        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            max_tokens: request.max_tokens,
            messages: &request.messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| call_failed("anthropic", format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("anthropic", response).await);
        }

        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|e| call_failed("anthropic", format!("Failed to parse response: {}", e)))?;

        Ok(LlmResponse {
            content: Self::extract_text(payload),
            model: self.model.clone(),
        })
    }
}
