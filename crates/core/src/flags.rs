//! Engine tunables.
//!
//! Flags are read through a lookup function rather than directly from the
//! process environment so that callers (and tests) can supply any source.
//! Parsing is tolerant: unrecognised booleans and non-finite numbers fall
//! back to the default instead of failing startup.

use serde::{Deserialize, Serialize};

/// Runtime tunables for routing, quota and composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineFlags {
    /// Minimum quality score accepted in automatic routing
    pub quality_floor: f64,

    /// Free platform-funded generations per principal per month
    pub free_monthly_cap: u32,

    /// Extra monthly generations for premium principals
    pub subscription_monthly_credit: u32,

    /// Platform spend ceiling per principal per month (USD)
    pub platform_monthly_budget_usd: f64,

    /// Ratio of used/allowance at which the quota turns `near_limit`
    pub near_limit_threshold: f64,

    /// Reference chunks retrieved per composed day
    pub max_reference_chunks: usize,

    /// Characters of each chunk placed in the prompt
    pub max_chunk_chars_in_context: usize,

    /// Let the platform fund high-cost providers
    pub allow_high_cost_on_platform: bool,

    /// Master switch for platform-funded routing
    pub platform_keys_enabled: bool,
}

impl Default for EngineFlags {
    fn default() -> Self {
        Self {
            quality_floor: 0.65,
            free_monthly_cap: 20,
            subscription_monthly_credit: 1000,
            platform_monthly_budget_usd: 100.0,
            near_limit_threshold: 0.8,
            max_reference_chunks: 4,
            max_chunk_chars_in_context: 1200,
            allow_high_cost_on_platform: false,
            platform_keys_enabled: true,
        }
    }
}

impl EngineFlags {
    /// Read flags from the process environment.
    pub fn from_env() -> Self {
        Self::default().merged_with(|name| std::env::var(name).ok())
    }

    /// Overlay values found through `lookup` on top of `self`.
    ///
    /// Values that are present but unparsable keep the current value.
    pub fn merged_with<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let quality_floor = to_number(lookup("LECTERN_QUALITY_FLOOR"), self.quality_floor);
        let free_monthly_cap = to_number(
            lookup("LECTERN_FREE_MONTHLY_CAP"),
            f64::from(self.free_monthly_cap),
        )
        .round()
        .max(1.0) as u32;
        let subscription_monthly_credit = to_number(
            lookup("LECTERN_SUBSCRIPTION_MONTHLY_CREDIT"),
            f64::from(self.subscription_monthly_credit),
        )
        .round()
        .max(1.0) as u32;
        let platform_monthly_budget_usd = to_number(
            lookup("LECTERN_PLATFORM_BUDGET_USD"),
            self.platform_monthly_budget_usd,
        )
        .max(1.0);
        let near_limit_threshold = to_number(
            lookup("LECTERN_NEAR_LIMIT_THRESHOLD"),
            self.near_limit_threshold,
        );
        let max_reference_chunks = to_number(
            lookup("LECTERN_MAX_REFERENCE_CHUNKS"),
            self.max_reference_chunks as f64,
        )
        .round()
        .max(2.0) as usize;
        let max_chunk_chars_in_context = to_number(
            lookup("LECTERN_MAX_CHUNK_CHARS"),
            self.max_chunk_chars_in_context as f64,
        )
        .round()
        .max(400.0) as usize;
        let allow_high_cost_on_platform = to_bool(
            lookup("LECTERN_ALLOW_HIGH_COST_ON_PLATFORM"),
            self.allow_high_cost_on_platform,
        );
        let platform_keys_enabled = to_bool(
            lookup("LECTERN_PLATFORM_KEYS_ENABLED"),
            self.platform_keys_enabled,
        );

        Self {
            quality_floor,
            free_monthly_cap,
            subscription_monthly_credit,
            platform_monthly_budget_usd,
            near_limit_threshold,
            max_reference_chunks,
            max_chunk_chars_in_context,
            allow_high_cost_on_platform,
            platform_keys_enabled,
        }
    }
}

/// Parse a boolean flag, accepting the usual spellings.
pub fn to_bool(value: Option<String>, fallback: bool) -> bool {
    let Some(value) = value else {
        return fallback;
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

/// Parse a numeric flag; empty, unparsable or non-finite values fall back.
pub fn to_number(value: Option<String>, fallback: f64) -> f64 {
    match value {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .unwrap_or(fallback),
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let flags = EngineFlags::default();
        assert_eq!(flags.quality_floor, 0.65);
        assert_eq!(flags.free_monthly_cap, 20);
        assert_eq!(flags.subscription_monthly_credit, 1000);
        assert_eq!(flags.near_limit_threshold, 0.8);
        assert!(!flags.allow_high_cost_on_platform);
        assert!(flags.platform_keys_enabled);
    }

    #[test]
    fn test_overrides_and_clamps() {
        let flags = EngineFlags::default().merged_with(lookup_from(&[
            ("LECTERN_FREE_MONTHLY_CAP", "0"),
            ("LECTERN_MAX_CHUNK_CHARS", "100"),
            ("LECTERN_MAX_REFERENCE_CHUNKS", "6.6"),
            ("LECTERN_QUALITY_FLOOR", "0.4"),
        ]));
        assert_eq!(flags.free_monthly_cap, 1);
        assert_eq!(flags.max_chunk_chars_in_context, 400);
        assert_eq!(flags.max_reference_chunks, 7);
        assert_eq!(flags.quality_floor, 0.4);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let flags = EngineFlags::default().merged_with(lookup_from(&[
            ("LECTERN_QUALITY_FLOOR", "high"),
            ("LECTERN_PLATFORM_BUDGET_USD", "inf"),
            ("LECTERN_PLATFORM_KEYS_ENABLED", "maybe"),
        ]));
        assert_eq!(flags.quality_floor, 0.65);
        assert_eq!(flags.platform_monthly_budget_usd, 100.0);
        assert!(flags.platform_keys_enabled);
    }

    #[test]
    fn test_bool_spellings() {
        assert!(to_bool(Some(" YES ".to_string()), false));
        assert!(!to_bool(Some("off".to_string()), true));
        assert!(to_bool(None, true));
    }
}
