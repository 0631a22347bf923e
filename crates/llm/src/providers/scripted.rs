//! In-process scripted backend.
//!
//! Replays a fixed sequence of replies and records every call, so routing
//! and composition can be exercised without a network.

use lectern_core::AppResult;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::call_failed;
use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Succeed with this text
    Text(String),
    /// Fail with a `ProviderCallFailed` carrying this message
    Fail(String),
    /// Sleep, then succeed with this text
    Delayed(Duration, String),
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub api_key: String,
    pub request: LlmRequest,
}

/// Backend that answers from a script.
///
/// Replies are consumed in order; once the script runs out the `repeat`
/// reply (if any) is used for every further call, otherwise the call fails.
pub struct ScriptedClient {
    name: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    repeat: Option<ScriptedReply>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedClient {
    pub fn new(name: impl Into<String>, replies: Vec<ScriptedReply>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(replies.into()),
            repeat: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn always(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Vec::new()).repeating(ScriptedReply::Text(text.into()))
    }

    /// Always fail with `message`.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Vec::new()).repeating(ScriptedReply::Fail(message.into()))
    }

    pub fn repeating(mut self, reply: ScriptedReply) -> Self {
        self.repeat = Some(reply);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.pop_front().or_else(|| self.repeat.clone())
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptedCall {
                api_key: api_key.to_string(),
                request: request.clone(),
            });

        let text = match self.next_reply() {
            Some(ScriptedReply::Text(text)) => text,
            Some(ScriptedReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                text
            }
            Some(ScriptedReply::Fail(message)) => return Err(call_failed(&self.name, message)),
            None => return Err(call_failed(&self.name, "script exhausted")),
        };

        Ok(LlmResponse {
            content: text.trim().to_string(),
            model: format!("{}-scripted", self.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[tokio::test]
    async fn test_script_then_exhaustion() {
        let client = ScriptedClient::new(
            "google",
            vec![
                ScriptedReply::Text("one".to_string()),
                ScriptedReply::Fail("boom".to_string()),
            ],
        );
        let request = LlmRequest::new("s", vec![ChatMessage::user("u")]);

        assert_eq!(client.complete("k", &request).await.unwrap().content, "one");
        assert!(client.complete("k", &request).await.is_err());
        assert!(client.complete("k", &request).await.is_err());
        assert_eq!(client.calls().len(), 3);
    }
}
