//! Provider backends.

mod anthropic;
mod google;
mod key_routed;
mod openai;
mod scripted;

pub use anthropic::{AnthropicClient, ANTHROPIC_API_URL, ANTHROPIC_VERSION};
pub use google::{GoogleClient, GOOGLE_API_URL};
pub use key_routed::{KeyRoutedClient, ANTHROPIC_KEY_PREFIX};
pub use openai::{OpenAiClient, OPENAI_API_URL};
pub use scripted::{ScriptedCall, ScriptedClient, ScriptedReply};

use lectern_core::AppError;

/// Build a `ProviderCallFailed` for `provider`.
pub(crate) fn call_failed(provider: &str, message: impl Into<String>) -> AppError {
    AppError::ProviderCallFailed {
        provider: provider.to_string(),
        message: message.into(),
    }
}

/// Turn a non-success response into an error carrying a truncated body.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    call_failed(
        provider,
        format!("({}): {}", status.as_u16(), crate::client::truncate_error_body(&body)),
    )
}
