//! Health transitions.
//!
//! Pure functions over a [`HealthRecord`]; callers hold the store lock.

use crate::cadence::Timestamp;
use crate::config::SafetyConfig;
use crate::health::backoff::failure_backoff;
use crate::health::state::{Eligibility, HealthRecord, SkipReason};

/// Parameters of failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub base_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub quarantine_threshold: u32,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            base_backoff_secs: 120,
            max_backoff_secs: 86_400,
            quarantine_threshold: 3,
        }
    }
}

impl From<&SafetyConfig> for FailurePolicy {
    fn from(safety: &SafetyConfig) -> Self {
        Self {
            base_backoff_secs: safety.failure_backoff_base_secs,
            max_backoff_secs: safety.max_backoff_secs,
            quarantine_threshold: safety.failure_quarantine_threshold,
        }
    }
}

/// What a failure did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub consecutive_failures: u32,
    pub backoff_secs: u64,
    /// True only on the failure that moved the entity into quarantine.
    pub newly_quarantined: bool,
}

pub fn is_eligible(record: &HealthRecord, now: Timestamp) -> Eligibility {
    if record.quarantined {
        Eligibility::Ineligible(SkipReason::Quarantined)
    } else if now < record.next_eligible_at {
        Eligibility::Ineligible(SkipReason::Backoff)
    } else {
        Eligibility::Eligible
    }
}

pub fn on_success(record: &mut HealthRecord, now: Timestamp) {
    record.last_success_at = Some(now);
    record.consecutive_failures = 0;
    record.next_eligible_at = now;
    record.quarantined = false;
}

pub fn on_failure(record: &mut HealthRecord, now: Timestamp, policy: &FailurePolicy) -> FailureOutcome {
    record.consecutive_failures = record.consecutive_failures.saturating_add(1);
    let backoff_secs = failure_backoff(
        record.consecutive_failures,
        policy.base_backoff_secs,
        policy.max_backoff_secs,
    );
    record.next_eligible_at = now.saturating_add(backoff_secs);

    let was_quarantined = record.quarantined;
    if record.consecutive_failures >= policy.quarantine_threshold {
        record.quarantined = true;
    }

    FailureOutcome {
        consecutive_failures: record.consecutive_failures,
        backoff_secs,
        newly_quarantined: record.quarantined && !was_quarantined,
    }
}

/// Opportunistic pause; leaves the failure counter and quarantine alone.
pub fn on_break(record: &mut HealthRecord, now: Timestamp, extra_secs: u64) {
    record.next_eligible_at = now.saturating_add(extra_secs);
}

/// Operator reset: clears failures and makes the entity eligible at once.
pub fn reset(record: &mut HealthRecord) {
    record.consecutive_failures = 0;
    record.next_eligible_at = 0;
    record.quarantined = false;
}
