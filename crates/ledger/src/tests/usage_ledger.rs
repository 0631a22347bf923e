use chrono::{DateTime, TimeZone, Utc};
use lectern_core::{AppError, AppResult};
use lectern_llm::ProviderId;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::ledger::{UsageLedger, EVENT_LOG_LIMIT};
use crate::quota::{quota_requires_byo, QuotaPolicy};
use crate::store::{KvStore, MemoryKvStore, SqliteKvStore};
use crate::types::{QuotaState, UsageRecord};

fn october() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
}

fn policy() -> QuotaPolicy {
    QuotaPolicy {
        free_cap: 20,
        subscription_credit: 0,
        platform_budget_usd: 100.0,
        near_limit_threshold: 0.8,
    }
}

fn memory_ledger() -> UsageLedger {
    UsageLedger::new(Arc::new(MemoryKvStore::new()), policy())
}

fn call(principal: &str) -> UsageRecord {
    UsageRecord::new(principal, ProviderId::OpenAi, 0.0004)
        .with_tokens(1200, 800)
        .at(october())
}

#[tokio::test]
async fn test_new_principal_starts_active() {
    let ledger = memory_ledger();
    let summary = ledger.summary("user:1", false, october()).await;

    assert_eq!(summary.month_key, "2026-10");
    assert_eq!(summary.quota.used, 0);
    assert_eq!(summary.quota.state, QuotaState::Active);
    assert_eq!(summary.platform_budget.remaining_usd, 100.0);
}

#[tokio::test]
async fn test_quota_walks_through_states() {
    let ledger = memory_ledger();

    let mut summary = ledger.summary("user:1", false, october()).await;
    for _ in 0..16 {
        summary = ledger.record(call("user:1")).await;
    }
    assert_eq!(summary.quota.used, 16);
    assert_eq!(summary.quota.state, QuotaState::NearLimit);
    assert!(!quota_requires_byo(&summary));

    for _ in 0..4 {
        summary = ledger.record(call("user:1")).await;
    }
    assert_eq!(summary.quota.used, 20);
    assert_eq!(summary.quota.state, QuotaState::HaltedPlatform);
    assert!(quota_requires_byo(&summary));
}

#[tokio::test]
async fn test_byo_calls_do_not_consume_quota() {
    let ledger = memory_ledger();
    let summary = ledger.record(call("user:1").charged(false)).await;

    assert_eq!(summary.total_messages, 1);
    assert_eq!(summary.total_cost_usd, 0.0004);
    assert_eq!(summary.quota.used, 0);
    assert_eq!(summary.platform_budget.spent_usd, 0.0);
    assert_eq!(summary.platform_budget.remaining_usd, 100.0);
    assert_eq!(summary.by_provider["openai"].messages, 1);
}

#[tokio::test]
async fn test_platform_calls_consume_budget() {
    let ledger = memory_ledger();
    ledger.record(call("user:1")).await;
    let summary = ledger
        .record(UsageRecord::new("user:1", ProviderId::Google, 0.0002).at(october()))
        .await;

    assert_eq!(summary.quota.used, 2);
    assert_eq!(summary.platform_budget.spent_usd, 0.0006);
    assert_eq!(summary.platform_budget.remaining_usd, 99.9994);
    assert_eq!(summary.by_provider.len(), 2);
}

#[tokio::test]
async fn test_budget_exhaustion_requires_byo() {
    let ledger = UsageLedger::new(
        Arc::new(MemoryKvStore::new()),
        QuotaPolicy {
            platform_budget_usd: 0.001,
            ..policy()
        },
    );
    let summary = ledger
        .record(UsageRecord::new("user:1", ProviderId::OpenAi, 0.002).at(october()))
        .await;

    assert_eq!(summary.platform_budget.remaining_usd, 0.0);
    assert_eq!(summary.quota.state, QuotaState::Active);
    assert_eq!(summary.effective_state(), QuotaState::ByoRequired);
    assert!(quota_requires_byo(&summary));
}

#[tokio::test]
async fn test_premium_gets_subscription_credit() {
    let ledger = UsageLedger::new(
        Arc::new(MemoryKvStore::new()),
        QuotaPolicy {
            subscription_credit: 1000,
            ..policy()
        },
    );
    let summary = ledger.record(call("user:1").with_premium(true)).await;
    assert_eq!(summary.quota.allowance(), 1020);
    assert_eq!(summary.quota.state, QuotaState::Active);
}

#[tokio::test]
async fn test_months_are_separate() {
    let ledger = memory_ledger();
    ledger.record(call("user:1")).await;

    let november = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
    let summary = ledger.summary("user:1", false, november).await;
    assert_eq!(summary.month_key, "2026-11");
    assert_eq!(summary.quota.used, 0);
}

#[tokio::test]
async fn test_event_log_is_bounded_and_recent_first() {
    let ledger = memory_ledger();
    for i in 0..(EVENT_LOG_LIMIT as u64 + 5) {
        ledger.record(call("user:1").with_tokens(i, 0)).await;
    }

    let events = ledger.events("user:1", october()).await;
    assert_eq!(events.len(), EVENT_LOG_LIMIT);
    assert_eq!(events[0].input_tokens, EVENT_LOG_LIMIT as u64 + 4);
    assert!(events[0].charged_to_platform);
    assert_eq!(events[0].timestamp, october().to_rfc3339());
}

#[tokio::test]
async fn test_sqlite_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.sqlite");

    let written = {
        let ledger = UsageLedger::new(Arc::new(SqliteKvStore::open(&path).unwrap()), policy());
        ledger.record(call("session:abc")).await;
        ledger.record(call("session:abc").charged(false)).await
    };

    let ledger = UsageLedger::new(Arc::new(SqliteKvStore::open(&path).unwrap()), policy());
    let read = ledger.summary("session:abc", false, october()).await;
    assert_eq!(read, written);
    assert_eq!(
        serde_json::to_string(&read).unwrap(),
        serde_json::to_string(&written).unwrap()
    );

    let events = ledger.events("session:abc", october()).await;
    assert_eq!(events.len(), 2);
    assert!(!events[0].charged_to_platform);
}

#[tokio::test]
async fn test_reset_reloads_from_store() {
    let ledger = memory_ledger();
    ledger.record(call("user:1")).await;
    ledger.reset().await;

    let summary = ledger.summary("user:1", false, october()).await;
    assert_eq!(summary.quota.used, 1);
}

struct BrokenStore;

#[async_trait::async_trait]
impl KvStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::Store("offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
        Err(AppError::Store("offline".to_string()))
    }

    async fn list_push(&self, _key: &str, _value: &str) -> AppResult<()> {
        Err(AppError::Store("offline".to_string()))
    }

    async fn list_trim(&self, _key: &str, _start: usize, _stop: usize) -> AppResult<()> {
        Err(AppError::Store("offline".to_string()))
    }

    async fn list_range(&self, _key: &str, _start: usize, _stop: usize) -> AppResult<Vec<String>> {
        Err(AppError::Store("offline".to_string()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::Store("offline".to_string()))
    }
}

#[tokio::test]
async fn test_store_failures_fail_open() {
    let ledger = UsageLedger::new(Arc::new(BrokenStore), policy());
    ledger.record(call("user:1")).await;
    let summary = ledger.record(call("user:1")).await;

    assert_eq!(summary.quota.used, 2);
    assert_eq!(ledger.events("user:1", october()).await.len(), 2);
    assert!(ledger.events("user:2", october()).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_not_lost() {
    let ledger = Arc::new(memory_ledger());
    let handles: Vec<_> = (0..40)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.record(call("user:1")).await })
        })
        .collect();
    for joined in futures::future::join_all(handles).await {
        joined.unwrap();
    }

    let summary = ledger.summary("user:1", false, october()).await;
    assert_eq!(summary.quota.used, 40);
    assert_eq!(summary.total_messages, 40);
}
