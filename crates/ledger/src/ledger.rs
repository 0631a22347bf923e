//! The usage ledger service.
//!
//! In-memory summaries are authoritative for this process; the store is
//! written through after every update and read only to seed a summary the
//! process has not seen yet. Store failures are logged and absorbed.

use chrono::{DateTime, Utc};
use lectern_core::AppConfig;
use lectern_llm::cost::round_to;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::quota::{compute_state, month_key, QuotaPolicy};
use crate::store::KvStore;
use crate::types::{UsageEvent, UsageRecord, UsageSummary};

/// Events kept per principal and month.
pub const EVENT_LOG_LIMIT: usize = 200;

const SUMMARY_PREFIX: &str = "ai:usage:summary:";
const EVENTS_PREFIX: &str = "ai:usage:events:";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Default)]
struct LedgerState {
    summaries: HashMap<String, UsageSummary>,
    events: HashMap<String, Vec<UsageEvent>>,
}

/// Per-principal, per-month usage and quota tracker.
pub struct UsageLedger {
    store: Arc<dyn KvStore>,
    policy: QuotaPolicy,
    retention: Duration,
    // One lock for the whole read-modify-write so concurrent records for a
    // principal never lose an increment within this process.
    state: Mutex<LedgerState>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn KvStore>, policy: QuotaPolicy) -> Self {
        Self {
            store,
            policy,
            retention: Duration::from_secs(120 * SECS_PER_DAY),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Ledger over `store` with allowances and retention from configuration.
    pub fn from_config(config: &AppConfig, store: Arc<dyn KvStore>) -> Self {
        Self::new(store, QuotaPolicy::from_flags(&config.flags))
            .with_retention(Duration::from_secs(config.ledger.retention_days as u64 * SECS_PER_DAY))
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Summary for `principal_id` in the month containing `at`, created with
    /// zero usage on first access.
    pub async fn summary(&self, principal_id: &str, premium: bool, at: DateTime<Utc>) -> UsageSummary {
        let mut state = self.state.lock().await;
        self.load_summary(&mut state, principal_id, premium, at).await.clone()
    }

    async fn load_summary<'a>(
        &self,
        state: &'a mut LedgerState,
        principal_id: &str,
        premium: bool,
        at: DateTime<Utc>,
    ) -> &'a mut UsageSummary {
        let month = month_key(at);
        let key = record_key(principal_id, &month);

        if !state.summaries.contains_key(&key) {
            let summary = match self.fetch_summary(&key).await {
                Some(stored) => stored,
                None => self.policy.empty_summary(principal_id, &month, premium),
            };
            state.summaries.insert(key.clone(), summary);
        }

        state
            .summaries
            .entry(key)
            .or_insert_with(|| self.policy.empty_summary(principal_id, &month, premium))
    }

    async fn fetch_summary(&self, key: &str) -> Option<UsageSummary> {
        let raw = match self.store.get(&format!("{}{}", SUMMARY_PREFIX, key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Usage store read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Ignoring malformed stored summary for {}: {}", key, e);
                None
            }
        }
    }

    /// Apply one generation call and return the updated summary.
    ///
    /// Every call counts toward message and cost totals. Only calls charged
    /// to the platform consume quota and platform budget.
    pub async fn record(&self, record: UsageRecord) -> UsageSummary {
        let mut state = self.state.lock().await;
        let key = record_key(&record.principal_id, &month_key(record.at));
        let threshold = self.policy.near_limit_threshold;

        let summary = {
            let summary = self
                .load_summary(&mut state, &record.principal_id, record.premium, record.at)
                .await;

            let bucket = summary
                .by_provider
                .entry(record.provider.as_str().to_string())
                .or_default();
            bucket.messages += 1;
            bucket.cost_usd = round_to(bucket.cost_usd + record.cost_usd, 8);

            summary.total_messages += 1;
            summary.total_cost_usd = round_to(summary.total_cost_usd + record.cost_usd, 8);

            if record.charge_to_platform {
                summary.quota.used += 1;
                let budget = &mut summary.platform_budget;
                budget.spent_usd = round_to(budget.spent_usd + record.cost_usd, 8);
                budget.remaining_usd = round_to((budget.limit_usd - budget.spent_usd).max(0.0), 8);
            }

            let quota = &mut summary.quota;
            quota.state = compute_state(quota.used, quota.free_cap, quota.subscription_credit, threshold);
            summary.clone()
        };

        let event = UsageEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: record.at.to_rfc3339(),
            principal_id: record.principal_id.clone(),
            provider: record.provider,
            mode: record.mode,
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            estimated_cost_usd: record.cost_usd,
            charged_to_platform: record.charge_to_platform,
        };

        let events = state.events.entry(key.clone()).or_default();
        events.insert(0, event.clone());
        events.truncate(EVENT_LOG_LIMIT);

        tracing::info!(
            "Recorded {} usage for {}: used {}/{} ({})",
            record.provider,
            record.principal_id,
            summary.quota.used,
            summary.quota.allowance(),
            summary.quota.state
        );

        if let Err(e) = self.persist(&key, &summary, &event).await {
            tracing::warn!("Usage store write failed for {}: {}", key, e);
        }

        summary
    }

    async fn persist(
        &self,
        key: &str,
        summary: &UsageSummary,
        event: &UsageEvent,
    ) -> lectern_core::AppResult<()> {
        let summary_key = format!("{}{}", SUMMARY_PREFIX, key);
        let events_key = format!("{}{}", EVENTS_PREFIX, key);

        self.store.set(&summary_key, &serde_json::to_string(summary)?).await?;
        self.store.list_push(&events_key, &serde_json::to_string(event)?).await?;
        self.store.list_trim(&events_key, 0, EVENT_LOG_LIMIT - 1).await?;
        self.store.expire(&summary_key, self.retention).await?;
        self.store.expire(&events_key, self.retention).await?;
        Ok(())
    }

    /// Recent events for a principal's month, most recent first.
    pub async fn events(&self, principal_id: &str, at: DateTime<Utc>) -> Vec<UsageEvent> {
        let key = record_key(principal_id, &month_key(at));
        let mut state = self.state.lock().await;
        if let Some(events) = state.events.get(&key) {
            return events.clone();
        }

        let events_key = format!("{}{}", EVENTS_PREFIX, key);
        let raw = match self.store.list_range(&events_key, 0, EVENT_LOG_LIMIT - 1).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Usage store read failed for {}: {}", key, e);
                return Vec::new();
            }
        };

        let events: Vec<UsageEvent> = raw
            .iter()
            .filter_map(|row| serde_json::from_str(row).ok())
            .collect();
        state.events.insert(key, events.clone());
        events
    }

    /// Forget everything held in memory. The store is left untouched.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.summaries.clear();
        state.events.clear();
    }
}

fn record_key(principal_id: &str, month: &str) -> String {
    format!("{}:{}", month, principal_id)
}
