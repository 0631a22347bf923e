//! LLM client abstraction and request/response types.
//!
//! This module defines the wire-agnostic interface every provider backend
//! implements. Credentials are passed per call because the same backend can
//! run on a platform-funded key or a caller-supplied one.

use lectern_core::AppResult;
use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Output budget used when the route context does not set one.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1200;

/// Longest slice of an error body carried into an error message.
pub const ERROR_BODY_CHARS: usize = 240;

/// Chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// System prompt
    pub system: String,

    /// Conversation so far
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl LlmRequest {
    /// Create a new request with a system prompt and messages.
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System prompt and message contents joined with newlines; the basis
    /// for input token estimates.
    pub fn concatenated_input(&self) -> String {
        std::iter::once(self.system.as_str())
            .chain(self.messages.iter().map(|m| m.content.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text, trimmed
    pub content: String,

    /// Model that generated the response
    pub model: String,
}

/// Trait for LLM providers.
///
/// This trait abstracts the underlying wire format (OpenAI, Anthropic,
/// Google, OpenAI-compatible) behind one completion call.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the backend name (e.g., "openai", "anthropic").
    fn provider_name(&self) -> &str;

    /// Perform a completion.
    ///
    /// # Arguments
    /// * `api_key` - Credential for this call
    /// * `request` - The completion request
    ///
    /// # Returns
    /// The response text; network errors, non-2xx statuses and malformed
    /// bodies are `AppError::ProviderCallFailed`.
    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse>;
}

/// Keep the first [`ERROR_BODY_CHARS`] characters of an error body.
pub(crate) fn truncate_error_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_CHARS).collect()
}
