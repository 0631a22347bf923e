//! Credential resolution.
//!
//! Platform-funded keys are read once at startup; caller-supplied keys
//! arrive per request and always take precedence.

use lectern_core::AppConfig;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{KeySource, ProviderId};

/// Platform-funded keys per provider.
#[derive(Clone, Default)]
pub struct PlatformKeys {
    keys: BTreeMap<ProviderId, String>,
}

impl PlatformKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.keys.insert(provider, key.trim().to_string());
        }
        self
    }

    /// Resolve every provider's key from the process environment.
    pub fn from_env(config: &AppConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve every provider's key through `lookup`.
    pub fn from_lookup<F>(config: &AppConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ProviderId::ALL
            .iter()
            .fold(Self::new(), |keys, provider| {
                match config.resolve_platform_key(provider.as_str(), &lookup) {
                    Some(key) => keys.with_key(*provider, key),
                    None => keys,
                }
            })
    }

    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for PlatformKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.keys()).finish()
    }
}

/// A key and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKey {
    pub key: Option<String>,
    pub using: KeySource,
}

/// Prefer a non-blank caller key, then the platform key.
pub fn resolve_key(
    provider: ProviderId,
    user_keys: &BTreeMap<ProviderId, String>,
    platform: &PlatformKeys,
) -> ResolvedKey {
    if let Some(key) = user_keys
        .get(&provider)
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
    {
        return ResolvedKey {
            key: Some(key.to_string()),
            using: KeySource::ByoKey,
        };
    }
    match platform.get(provider) {
        Some(key) => ResolvedKey {
            key: Some(key.to_string()),
            using: KeySource::PlatformKey,
        },
        None => ResolvedKey {
            key: None,
            using: KeySource::Unavailable,
        },
    }
}
