//! SQLite-backed store.
//!
//! Text values and lists share one table; a list is stored as a JSON array
//! with the most recent item first. Expiry is an absolute unix timestamp
//! checked on read.

use chrono::Utc;
use lectern_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{clip_range, KvStore};

const KIND_TEXT: &str = "text";
const KIND_LIST: &str = "list";

/// Durable store over a single SQLite connection.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create store directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;
        let store = Self::with_connection(conn)?;
        tracing::debug!("Opened SQLite store at {:?}", path);
        Ok(store)
    }

    /// Non-persistent database, mostly for tests.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER
            );
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Live `(kind, value)` for `key`, purging it when expired.
    fn read(conn: &Connection, key: &str) -> AppResult<Option<(String, String)>> {
        let now = Utc::now().timestamp();
        conn.execute(
            "DELETE FROM kv WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
            params![key, now],
        )
        .map_err(|e| AppError::Store(format!("Failed to purge expired key: {}", e)))?;

        conn.query_row(
            "SELECT kind, value FROM kv WHERE key = ?1",
            params![key],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to read key '{}': {}", key, e)))
    }

    fn read_list(conn: &Connection, key: &str) -> AppResult<Option<Vec<String>>> {
        match Self::read(conn, key)? {
            None => Ok(None),
            Some((kind, value)) if kind == KIND_LIST => Ok(Some(serde_json::from_str(&value)?)),
            Some(_) => Err(AppError::Store(format!(
                "Key '{}' holds a value of another type",
                key
            ))),
        }
    }

    /// Replace a list's items, keeping its expiry.
    fn write_list(conn: &Connection, key: &str, items: &[String]) -> AppResult<()> {
        let json = serde_json::to_string(items)?;
        conn.execute(
            "INSERT INTO kv (key, kind, value, expires_at) VALUES (?1, ?2, ?3, NULL)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, KIND_LIST, json],
        )
        .map_err(|e| AppError::Store(format!("Failed to write list '{}': {}", key, e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.conn();
        match Self::read(&conn, key)? {
            None => Ok(None),
            Some((kind, value)) if kind == KIND_TEXT => Ok(Some(value)),
            Some(_) => Err(AppError::Store(format!(
                "Key '{}' holds a value of another type",
                key
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO kv (key, kind, value, expires_at) VALUES (?1, ?2, ?3, NULL)",
                params![key, KIND_TEXT, value],
            )
            .map_err(|e| AppError::Store(format!("Failed to write key '{}': {}", key, e)))?;
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.conn();
        let mut items = Self::read_list(&conn, key)?.unwrap_or_default();
        items.insert(0, value.to_string());
        Self::write_list(&conn, key, &items)
    }

    async fn list_trim(&self, key: &str, start: usize, stop: usize) -> AppResult<()> {
        let conn = self.conn();
        if let Some(items) = Self::read_list(&conn, key)? {
            let keep = clip_range(items.len(), start, stop);
            Self::write_list(&conn, key, &items[keep])?;
        }
        Ok(())
    }

    async fn list_range(&self, key: &str, start: usize, stop: usize) -> AppResult<Vec<String>> {
        let conn = self.conn();
        Ok(Self::read_list(&conn, key)?
            .map(|items| items[clip_range(items.len(), start, stop)].to_vec())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let at = Utc::now().timestamp() + ttl.as_secs() as i64;
        self.conn()
            .execute(
                "UPDATE kv SET expires_at = ?1 WHERE key = ?2",
                params![at, key],
            )
            .map_err(|e| AppError::Store(format!("Failed to set expiry on '{}': {}", key, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("usage.sqlite");

        {
            let store = SqliteKvStore::open(&path).unwrap();
            store.set("summary", "{\"a\":1}").await.unwrap();
            store.list_push("events", "first").await.unwrap();
            store.list_push("events", "second").await.unwrap();
        }

        let store = SqliteKvStore::open(&path).unwrap();
        assert_eq!(store.get("summary").await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(
            store.list_range("events", 0, 199).await.unwrap(),
            vec!["second", "first"]
        );
    }

    #[test]
    fn test_file_store_uses_wal() {
        let dir = TempDir::new().unwrap();
        let store = SqliteKvStore::open(&dir.path().join("usage.sqlite")).unwrap();
        let mode: String = store
            .conn()
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_trim_and_expire() {
        let store = SqliteKvStore::in_memory().unwrap();
        for i in 0..5 {
            store.list_push("events", &i.to_string()).await.unwrap();
        }
        store.list_trim("events", 0, 2).await.unwrap();
        assert_eq!(store.list_range("events", 0, 10).await.unwrap(), vec!["4", "3", "2"]);

        store.set("gone", "x").await.unwrap();
        store.expire("gone", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("gone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_keeps_expiry_on_push() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.list_push("events", "a").await.unwrap();
        store.expire("events", Duration::from_secs(3600)).await.unwrap();
        store.list_push("events", "b").await.unwrap();
        assert_eq!(store.list_range("events", 0, 10).await.unwrap(), vec!["b", "a"]);
    }
}
