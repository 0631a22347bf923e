//! Quota state machine.
//!
//! The state is a pure function of `used` against the combined allowance;
//! nothing else feeds into it.

use chrono::{DateTime, Utc};
use lectern_core::EngineFlags;

use crate::types::{PlatformBudget, QuotaRecord, QuotaState, UsageSummary};

/// Allowances applied to new monthly summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaPolicy {
    pub free_cap: u32,
    /// Granted only to premium principals
    pub subscription_credit: u32,
    pub platform_budget_usd: f64,
    pub near_limit_threshold: f64,
}

impl QuotaPolicy {
    pub fn from_flags(flags: &EngineFlags) -> Self {
        Self {
            free_cap: flags.free_monthly_cap,
            subscription_credit: flags.subscription_monthly_credit,
            platform_budget_usd: flags.platform_monthly_budget_usd,
            near_limit_threshold: flags.near_limit_threshold,
        }
    }

    /// Zero-valued summary for a principal's month.
    pub fn empty_summary(&self, principal_id: &str, month: &str, premium: bool) -> UsageSummary {
        UsageSummary {
            month_key: month.to_string(),
            principal_id: principal_id.to_string(),
            total_messages: 0,
            total_cost_usd: 0.0,
            by_provider: Default::default(),
            quota: QuotaRecord {
                free_cap: self.free_cap,
                subscription_credit: if premium { self.subscription_credit } else { 0 },
                used: 0,
                state: QuotaState::Active,
            },
            platform_budget: PlatformBudget {
                limit_usd: self.platform_budget_usd,
                spent_usd: 0.0,
                remaining_usd: self.platform_budget_usd,
            },
        }
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::from_flags(&EngineFlags::default())
    }
}

/// Classify `used` against `free_cap + subscription_credit`.
///
/// `HaltedPlatform` once the allowance is consumed, `NearLimit` once the
/// consumed share reaches `threshold`, otherwise `Active`. A zero allowance
/// counts as fully consumed.
pub fn compute_state(used: u32, free_cap: u32, subscription_credit: u32, threshold: f64) -> QuotaState {
    let allowance = free_cap.saturating_add(subscription_credit);
    if used >= allowance {
        return QuotaState::HaltedPlatform;
    }

    let ratio = used as f64 / allowance as f64;
    if ratio >= threshold {
        QuotaState::NearLimit
    } else {
        QuotaState::Active
    }
}

/// Platform generation must be replaced by the caller's own key.
pub fn quota_requires_byo(summary: &UsageSummary) -> bool {
    summary.quota.state == QuotaState::HaltedPlatform || summary.platform_budget.remaining_usd <= 0.0
}

/// `YYYY-MM` in UTC.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// `user:<id>` for signed-in users, otherwise `session:<token>`.
pub fn principal_id(user_id: Option<&str>, session_token: &str) -> String {
    match user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("user:{}", id),
        None => format!("session:{}", session_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_thresholds() {
        assert_eq!(compute_state(0, 20, 0, 0.8), QuotaState::Active);
        assert_eq!(compute_state(15, 20, 0, 0.8), QuotaState::Active);
        assert_eq!(compute_state(16, 20, 0, 0.8), QuotaState::NearLimit);
        assert_eq!(compute_state(19, 20, 0, 0.8), QuotaState::NearLimit);
        assert_eq!(compute_state(20, 20, 0, 0.8), QuotaState::HaltedPlatform);
        assert_eq!(compute_state(25, 20, 0, 0.8), QuotaState::HaltedPlatform);
    }

    #[test]
    fn test_subscription_credit_extends_allowance() {
        assert_eq!(compute_state(20, 20, 1000, 0.8), QuotaState::Active);
        assert_eq!(compute_state(816, 20, 1000, 0.8), QuotaState::NearLimit);
    }

    #[test]
    fn test_zero_allowance_is_halted() {
        assert_eq!(compute_state(0, 0, 0, 0.8), QuotaState::HaltedPlatform);
    }

    #[test]
    fn test_huge_allowance_does_not_overflow() {
        assert_eq!(compute_state(5, u32::MAX, 1000, 0.8), QuotaState::Active);
        assert_eq!(compute_state(u32::MAX, u32::MAX, 1, 0.8), QuotaState::HaltedPlatform);
    }

    #[test]
    fn test_empty_summary_respects_premium() {
        let policy = QuotaPolicy::default();
        let free = policy.empty_summary("session:abc", "2026-10", false);
        let premium = policy.empty_summary("user:7", "2026-10", true);

        assert_eq!(free.quota.subscription_credit, 0);
        assert_eq!(premium.quota.subscription_credit, 1000);
        assert_eq!(free.platform_budget.remaining_usd, 100.0);
        assert!(!quota_requires_byo(&free));
    }

    #[test]
    fn test_month_key_and_principal() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(month_key(at), "2026-03");
        assert_eq!(principal_id(Some("42"), "tok"), "user:42");
        assert_eq!(principal_id(Some("  "), "tok"), "session:tok");
        assert_eq!(principal_id(None, "tok"), "session:tok");
    }
}
