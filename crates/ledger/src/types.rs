//! Ledger records.
//!
//! Field names serialize in camelCase; the stored JSON is the same shape
//! callers receive.

use chrono::{DateTime, Utc};
use lectern_llm::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a principal's remaining platform allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaState {
    #[default]
    Active,
    NearLimit,
    HaltedPlatform,
    /// Budget exhausted; only reported, never stored by the ledger itself
    ByoRequired,
}

impl QuotaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::NearLimit => "near_limit",
            Self::HaltedPlatform => "halted_platform",
            Self::ByoRequired => "byo_required",
        }
    }
}

impl fmt::Display for QuotaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where grounding material came from for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    #[default]
    Closed,
    OpenWeb,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    pub messages: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRecord {
    pub free_cap: u32,
    pub subscription_credit: u32,
    pub used: u32,
    pub state: QuotaState,
}

impl QuotaRecord {
    pub fn allowance(&self) -> u32 {
        self.free_cap.saturating_add(self.subscription_credit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformBudget {
    pub limit_usd: f64,
    pub spent_usd: f64,
    pub remaining_usd: f64,
}

/// Usage for one principal in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub month_key: String,
    pub principal_id: String,
    pub total_messages: u64,
    pub total_cost_usd: f64,
    pub by_provider: BTreeMap<String, ProviderUsage>,
    pub quota: QuotaRecord,
    pub platform_budget: PlatformBudget,
}

impl UsageSummary {
    /// Stored state, or `ByoRequired` when the budget ran out first.
    pub fn effective_state(&self) -> QuotaState {
        match self.quota.state {
            QuotaState::HaltedPlatform => QuotaState::HaltedPlatform,
            _ if self.platform_budget.remaining_usd <= 0.0 => QuotaState::ByoRequired,
            state => state,
        }
    }
}

/// One audited generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub id: String,
    pub timestamp: String,
    pub principal_id: String,
    pub provider: ProviderId,
    pub mode: RetrievalMode,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
    pub charged_to_platform: bool,
}

/// Input to [`crate::UsageLedger::record`].
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub principal_id: String,
    pub provider: ProviderId,
    pub mode: RetrievalMode,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub premium: bool,
    /// False when the caller's own key paid for the call
    pub charge_to_platform: bool,
    pub at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(principal_id: impl Into<String>, provider: ProviderId, cost_usd: f64) -> Self {
        Self {
            principal_id: principal_id.into(),
            provider,
            mode: RetrievalMode::Closed,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd,
            premium: false,
            charge_to_platform: true,
            at: Utc::now(),
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_premium(mut self, premium: bool) -> Self {
        self.premium = premium;
        self
    }

    pub fn charged(mut self, charge_to_platform: bool) -> Self {
        self.charge_to_platform = charge_to_platform;
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}
