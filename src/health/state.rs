//! Entity health record.
//!
//! # States
//! - Eligible: `now >= next_eligible_at` and not quarantined
//! - Backing off: `now < next_eligible_at`
//! - Quarantined: excluded until a success or an explicit reset
//!
//! # State Transitions
//! ```text
//! Eligible → Backing off: failure (or an opportunistic break)
//! Backing off → Quarantined: consecutive failures >= quarantine_threshold
//! Any → Eligible: success
//! Quarantined → Eligible: explicit reset
//! ```

use std::fmt;

use serde::Serialize;

use crate::cadence::Timestamp;

/// Health bookkeeping for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthRecord {
    /// Time of the last successful refresh, if any.
    pub last_success_at: Option<Timestamp>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Entity is skipped while `now < next_eligible_at`.
    pub next_eligible_at: Timestamp,
    /// Set once the failure counter crosses the quarantine threshold.
    pub quarantined: bool,
}

impl HealthRecord {
    pub fn is_backing_off(&self, now: Timestamp) -> bool {
        self.next_eligible_at > now
    }
}

/// Why an entity was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Quarantined,
    Backoff,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Quarantined => "quarantined",
            SkipReason::Backoff => "backoff",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}
