//! Rolling per-provider health.
//!
//! Every attempt updates success/failure counts and a running mean latency.
//! The router reads this back when ordering candidates, so recently
//! unreliable providers drift down the list.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::types::ProviderId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub successes: u64,
    pub failures: u64,
    pub avg_latency_ms: u64,
}

impl ProviderHealth {
    /// Failures over attempts; zero before the first attempt.
    pub fn failure_ratio(&self) -> f64 {
        self.failures as f64 / (self.successes + self.failures).max(1) as f64
    }
}

/// Shared health map. Updates are last-write-wins per provider.
#[derive(Debug, Default)]
pub struct HealthTracker {
    states: RwLock<BTreeMap<ProviderId, ProviderHealth>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt.
    pub fn record(&self, provider: ProviderId, success: bool, latency_ms: u64) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        let current = states.get(&provider).copied().unwrap_or_default();
        let total = current.successes + current.failures;
        let avg_latency_ms = if total == 0 {
            latency_ms
        } else {
            ((current.avg_latency_ms as f64 * total as f64 + latency_ms as f64)
                / (total + 1) as f64)
                .round() as u64
        };
        states.insert(
            provider,
            ProviderHealth {
                successes: current.successes + u64::from(success),
                failures: current.failures + u64::from(!success),
                avg_latency_ms,
            },
        );
    }

    pub fn get(&self, provider: ProviderId) -> Option<ProviderHealth> {
        let states = self.states.read().unwrap_or_else(|e| e.into_inner());
        states.get(&provider).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<ProviderId, ProviderHealth> {
        self.states.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget everything (test isolation).
    pub fn reset(&self) {
        self.states.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
