//! Pluggable key-value persistence.
//!
//! The ledger only needs string values, string lists and expiry, so that
//! is all the trait exposes.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use lectern_core::config::StoreBackend;
use lectern_core::{AppConfig, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Minimal key-value store.
///
/// Lists are most-recent-first: `list_push` prepends, `list_range` and
/// `list_trim` take inclusive indices from the head.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    async fn list_push(&self, key: &str, value: &str) -> AppResult<()>;

    /// Keep only items `start..=stop`.
    async fn list_trim(&self, key: &str, start: usize, stop: usize) -> AppResult<()>;

    async fn list_range(&self, key: &str, start: usize, stop: usize) -> AppResult<Vec<String>>;

    /// Drop `key` once `ttl` has elapsed.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()>;
}

/// Inclusive `start..=stop` slice bounds clipped to `len`.
pub(crate) fn clip_range(len: usize, start: usize, stop: usize) -> std::ops::Range<usize> {
    let end = stop.saturating_add(1).min(len);
    start.min(end)..end
}

/// Create the store selected by configuration.
pub fn create_store(config: &AppConfig) -> AppResult<Arc<dyn KvStore>> {
    match config.ledger.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryKvStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteKvStore::open(&config.ledger_path())?)),
    }
}
