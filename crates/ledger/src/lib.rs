//! Usage metering for Lectern.
//!
//! Tracks platform-funded generation per principal and calendar month,
//! classifies the remaining allowance into a quota state, and keeps a short
//! audit trail of calls. Persistence goes through the [`KvStore`] trait so
//! the same ledger runs in memory (tests, single process) or on SQLite.

pub mod ledger;
pub mod quota;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use ledger::{UsageLedger, EVENT_LOG_LIMIT};
pub use quota::{compute_state, month_key, principal_id, quota_requires_byo, QuotaPolicy};
pub use store::{create_store, KvStore, MemoryKvStore, SqliteKvStore};
pub use types::{
    PlatformBudget, ProviderUsage, QuotaRecord, QuotaState, RetrievalMode, UsageEvent,
    UsageRecord, UsageSummary,
};
