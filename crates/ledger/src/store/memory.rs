//! In-process store.

use lectern_core::{AppError, AppResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{clip_range, KvStore};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// HashMap-backed store with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` over the live entry map.
    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        entries.retain(|_, entry| entry.live(now));
        f(&mut entries)
    }
}

fn wrong_type(key: &str) -> AppError {
    AppError::Store(format!("Key '{}' holds a value of another type", key))
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.with_entries(|entries| match entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::List(_)) => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.with_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Text(value.to_string()),
                    expires_at: None,
                },
            );
        });
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> AppResult<()> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::List(VecDeque::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::List(items) => {
                    items.push_front(value.to_string());
                    Ok(())
                }
                Value::Text(_) => Err(wrong_type(key)),
            }
        })
    }

    async fn list_trim(&self, key: &str, start: usize, stop: usize) -> AppResult<()> {
        self.with_entries(|entries| match entries.get_mut(key).map(|e| &mut e.value) {
            None => Ok(()),
            Some(Value::List(items)) => {
                let keep = clip_range(items.len(), start, stop);
                *items = items.drain(keep).collect();
                Ok(())
            }
            Some(Value::Text(_)) => Err(wrong_type(key)),
        })
    }

    async fn list_range(&self, key: &str, start: usize, stop: usize) -> AppResult<Vec<String>> {
        self.with_entries(|entries| match entries.get(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => {
                Ok(items.range(clip_range(items.len(), start, stop)).cloned().collect())
            }
            Some(Value::Text(_)) => Err(wrong_type(key)),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = Some(Instant::now() + ttl);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_values() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let store = MemoryKvStore::new();
        for item in ["one", "two", "three"] {
            store.list_push("events", item).await.unwrap();
        }
        assert_eq!(store.list_range("events", 0, 10).await.unwrap(), vec!["three", "two", "one"]);

        store.list_trim("events", 0, 1).await.unwrap();
        assert_eq!(store.list_range("events", 0, 10).await.unwrap(), vec!["three", "two"]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = MemoryKvStore::new();
        store.set("k", "v").await.unwrap();
        assert!(store.list_push("k", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_keys_vanish() {
        let store = MemoryKvStore::new();
        store.set("k", "v").await.unwrap();
        store.expire("k", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
