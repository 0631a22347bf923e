//! Google `generateContent`.

use lectern_core::AppResult;
use serde::{Deserialize, Serialize};

use super::{call_failed, status_error};
use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::types::Role;

pub const GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GoogleClient {
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl GoogleClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            client,
        }
    }

    fn to_generate_request<'a>(request: &'a LlmRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: "system",
                parts: vec![Part {
                    text: &request.system,
                }],
            },
            contents: request
                .messages
                .iter()
                .map(|m| Content {
                    role: match m.role {
                        Role::Assistant => "model",
                        Role::User => "user",
                    },
                    parts: vec![Part { text: &m.content }],
                })
                .collect(),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
            },
        }
    }

    fn extract_text(response: GenerateResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text.unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for GoogleClient {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn complete(&self, api_key: &str, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending generateContent request to Google ({})", self.model);

        let url = format!("{}/{}:generateContent", self.api_url, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&Self::to_generate_request(request))
            .send()
            .await
            .map_err(|e| call_failed("google", format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("google", response).await);
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| call_failed("google", format!("Failed to parse response: {}", e)))?;

        Ok(LlmResponse {
            content: Self::extract_text(payload),
            model: self.model.clone(),
        })
    }
}
