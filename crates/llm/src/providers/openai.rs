//! OpenAI chat completions and OpenAI-compatible endpoints.

use lectern_core::AppResult;
use serde::{Deserialize, Serialize};

use super::{call_failed, status_error};
use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::types::Role;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<Choice>,
    reply: Option<String>,
    output_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Bearer-authenticated chat completions client.
///
/// Compatible endpoints (MiniMax, NVIDIA) may answer with a top-level
/// `reply` or `output_text` field instead of `choices`; enable
/// [`OpenAiClient::accepting_alternate_fields`] for those.
pub struct OpenAiClient {
    name: String,
    api_url: String,
    model: String,
    alternate_fields: bool,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into(),
            model: model.into(),
            alternate_fields: false,
            client,
        }
    }

    pub fn accepting_alternate_fields(mut self) -> Self {
        self.alternate_fields = true;
        self
    }

    fn to_chat_request<'a>(&'a self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = vec![WireMessage {
            role: "system",
            content: &request.system,
        }];
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        }));
        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
        }
    }

    fn extract_text(&self, response: ChatResponse) -> String {
        let primary = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if !self.alternate_fields {
            return primary.unwrap_or_default();
        }
        primary
            .or_else(|| response.reply.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()))
            .or_else(|| response.output_text.map(|r| r.trim().to_string()))
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending chat completion to {} ({})", self.name, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| call_failed(&self.name, format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| call_failed(&self.name, format!("Failed to parse response: {}", e)))?;

        Ok(LlmResponse {
            content: self.extract_text(payload),
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn client() -> OpenAiClient {
        OpenAiClient::new("openai", OPENAI_API_URL, "gpt-test", reqwest::Client::new())
    }

    #[test]
    fn test_system_message_goes_first() {
        let client = client();
        let request = LlmRequest::new(
            "be brief",
            vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
        );
        let wire = serde_json::to_value(client.to_chat_request(&request)).unwrap();
        assert_eq!(wire["model"], "gpt-test");
        assert_eq!(wire["messages"][0]["role"], "system");
        assert_eq!(wire["messages"][2]["role"], "assistant");
        assert_eq!(wire["max_tokens"], 1200);
    }

    #[test]
    fn test_alternate_fields_only_when_enabled() {
        let body = r#"{"reply": "  from reply  "}"#;
        let plain = client().extract_text(serde_json::from_str(body).unwrap());
        assert_eq!(plain, "");

        let compatible = client().accepting_alternate_fields();
        assert_eq!(
            compatible.extract_text(serde_json::from_str(body).unwrap()),
            "from reply"
        );
        let output_text = r#"{"choices": [], "output_text": "ot"}"#;
        assert_eq!(
            compatible.extract_text(serde_json::from_str(output_text).unwrap()),
            "ot"
        );
    }

    #[test]
    fn test_choices_content_trimmed() {
        let body = r#"{"choices": [{"message": {"content": "\n answer \n"}}]}"#;
        assert_eq!(client().extract_text(serde_json::from_str(body).unwrap()), "answer");
    }
}
