//! Provider routing types.
//!
//! This module defines provider identities, credential sources and the
//! request/result shapes exchanged with the router.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cancel::CancelSignal;

/// Generation providers known to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    /// Preferred-first slot; an `sk-ant-` key routes it to Anthropic
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "minimax")]
    Minimax,
    #[serde(rename = "nvidia_kimi")]
    NvidiaKimi,
}

impl ProviderId {
    /// Every provider, in availability listing order.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Google,
        ProviderId::Minimax,
        ProviderId::NvidiaKimi,
    ];

    /// Always tried first in automatic mode when available.
    pub const PREFERRED: ProviderId = ProviderId::OpenAi;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Minimax => "minimax",
            Self::NvidiaKimi => "nvidia_kimi",
        }
    }

    /// Parse a provider identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "google" => Some(Self::Google),
            "minimax" => Some(Self::Minimax),
            "nvidia_kimi" => Some(Self::NvidiaKimi),
            _ => None,
        }
    }

    /// Expensive providers are never platform-funded without an override.
    pub fn is_high_cost(&self) -> bool {
        matches!(self, Self::Minimax | Self::NvidiaKimi)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

/// How the router picks providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderMode {
    /// Rank every available provider and fall back on failure
    #[default]
    Auto,
    /// Use exactly this provider; errors are returned as-is
    Forced(ProviderId),
}

impl ProviderMode {
    /// Unknown values normalise to `Auto`.
    pub fn parse(s: &str) -> Self {
        ProviderId::parse(s).map(Self::Forced).unwrap_or(Self::Auto)
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Forced(id) => write!(f, "{}", id),
        }
    }
}

/// Where the credential for a call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Funded by the platform; counts against quota
    PlatformKey,
    /// Supplied by the caller
    ByoKey,
    Unavailable,
}

/// Whether one provider can be used right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAvailability {
    pub provider: ProviderId,
    pub available: bool,
    pub using: KeySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProviderAvailability {
    pub(crate) fn usable(provider: ProviderId, using: KeySource) -> Self {
        Self {
            provider,
            available: true,
            using,
            reason: None,
        }
    }

    pub(crate) fn blocked(provider: ProviderId, reason: &str) -> Self {
        Self {
            provider,
            available: false,
            using: KeySource::Unavailable,
            reason: Some(reason.to_string()),
        }
    }
}

/// Output of a successful provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderExecutionResult {
    pub provider: ProviderId,
    pub output: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
    pub quality_score: f64,
    pub using: KeySource,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call routing context.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// Task label used in logs
    pub task: String,

    pub mode: ProviderMode,

    /// Caller-supplied keys; these always win over platform keys
    pub user_keys: BTreeMap<ProviderId, String>,

    /// Overrides the router's default floor
    pub quality_floor: Option<f64>,

    /// Defaults to 1200 tokens
    pub max_output_tokens: Option<u32>,

    /// When false, only caller-supplied keys are usable
    pub platform_keys_enabled: bool,

    /// Lets the platform fund high-cost providers
    pub allow_high_cost_on_platform: bool,

    /// Per-attempt timeout
    pub timeout: Option<Duration>,

    pub cancel: Option<CancelSignal>,
}

impl RouteContext {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            mode: ProviderMode::Auto,
            user_keys: BTreeMap::new(),
            quality_floor: None,
            max_output_tokens: None,
            platform_keys_enabled: true,
            allow_high_cost_on_platform: false,
            timeout: None,
            cancel: None,
        }
    }

    pub fn with_mode(mut self, mode: ProviderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_user_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.user_keys.insert(provider, key.into());
        self
    }

    pub fn with_user_keys(mut self, keys: BTreeMap<ProviderId, String>) -> Self {
        self.user_keys = keys;
        self
    }

    pub fn with_quality_floor(mut self, floor: f64) -> Self {
        self.quality_floor = Some(floor);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_platform_keys_enabled(mut self, enabled: bool) -> Self {
        self.platform_keys_enabled = enabled;
        self
    }

    pub fn with_high_cost_on_platform(mut self, allowed: bool) -> Self {
        self.allow_high_cost_on_platform = allowed;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

/// System prompt, conversation and routing context.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub context: RouteContext,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>, context: RouteContext) -> Self {
        Self {
            system: system.into(),
            messages,
            context,
        }
    }
}
