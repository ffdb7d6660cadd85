//! Concurrency-safe state store.
//!
//! # Responsibilities
//! - Own health records, the rotation cursor and proxy assignments
//! - Serialize every mutation through one critical section
//! - Journal each mutation into the bounded activity log
//! - Produce and restore persistence snapshots

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;

use crate::cadence::{Clock, Timestamp};
use crate::health::policy::{self, FailureOutcome, FailurePolicy};
use crate::health::{Eligibility, HealthRecord};
use crate::observability::metrics;
use crate::rotation::{GroupSelection, GroupSlot, RotationState};
use crate::state::activity::{ActivityEntry, ActivityLog};
use crate::state::snapshot::Snapshot;

/// Request-level errors reported to the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// No state exists for the requested entity.
    #[error("profile not found in state: {0}")]
    NotFound(String),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Quarantine listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedEntity {
    pub id: String,
    pub consecutive_failures: u32,
    pub next_eligible_at: Timestamp,
}

struct StoreInner {
    records: HashMap<String, HealthRecord>,
    rotation: RotationState,
    proxies: BTreeMap<String, String>,
    activity: ActivityLog,
}

impl StoreInner {
    fn record_mut(&mut self, id: &str) -> &mut HealthRecord {
        self.records.entry(id.to_string()).or_default()
    }
}

/// Single owner of all mutable scheduling state.
pub struct StateStore {
    inner: Mutex<StoreInner>,
    clock: Arc<dyn Clock>,
}

impl StateStore {
    /// Empty store with a fresh cursor over `group_count` groups.
    pub fn new(group_count: u32, max_log_items: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                rotation: RotationState::new(group_count),
                proxies: BTreeMap::new(),
                activity: ActivityLog::new(max_log_items),
            }),
            clock,
        }
    }

    /// Current time from the store's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // A panic inside a critical section cannot leave a half-applied record:
    // every mutation is a handful of field stores, so a poisoned lock is reused.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record for `id`, created with defaults on first reference.
    pub fn get(&self, id: &str) -> HealthRecord {
        *self.lock().record_mut(id)
    }

    /// True if a record exists, without creating one.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().records.contains_key(id)
    }

    /// Apply `mutator` to the record for `id` atomically.
    pub fn update<R>(&self, id: &str, mutator: impl FnOnce(&mut HealthRecord) -> R) -> R {
        let now = self.now();
        let mut inner = self.lock();
        let result = mutator(inner.record_mut(id));
        inner.activity.push(now, format!("State updated for {id}"));
        result
    }

    /// Whether `id` may be refreshed now, and why not.
    pub fn eligibility(&self, id: &str) -> Eligibility {
        let now = self.now();
        policy::is_eligible(self.lock().record_mut(id), now)
    }

    /// Record a successful refresh: clears failures and backoff.
    pub fn mark_success(&self, id: &str) {
        let now = self.now();
        {
            let mut inner = self.lock();
            policy::on_success(inner.record_mut(id), now);
            inner.activity.push(now, format!("Refreshed {id}"));
        }
        tracing::debug!(profile = %id, "Marked refresh success");
    }

    /// Record a failed refresh, applying backoff and quarantine.
    pub fn mark_failure(&self, id: &str, failure_policy: &FailurePolicy) -> FailureOutcome {
        let now = self.now();
        let (outcome, quarantined_total) = {
            let mut inner = self.lock();
            let outcome = policy::on_failure(inner.record_mut(id), now, failure_policy);
            if outcome.newly_quarantined {
                inner.activity.push(
                    now,
                    format!(
                        "[SAFETY] Quarantined profile {id} after {} failures (backoff {}s).",
                        outcome.consecutive_failures, outcome.backoff_secs
                    ),
                );
            } else {
                inner.activity.push(
                    now,
                    format!(
                        "Failure #{} for {id}; backing off {}s",
                        outcome.consecutive_failures, outcome.backoff_secs
                    ),
                );
            }
            let total = inner.records.values().filter(|r| r.quarantined).count();
            (outcome, total)
        };

        if outcome.newly_quarantined {
            tracing::warn!(
                profile = %id,
                failures = outcome.consecutive_failures,
                backoff_secs = outcome.backoff_secs,
                "Profile quarantined"
            );
        } else {
            tracing::info!(
                profile = %id,
                failures = outcome.consecutive_failures,
                backoff_secs = outcome.backoff_secs,
                "Profile backing off"
            );
        }
        metrics::record_quarantined(quarantined_total);
        outcome
    }

    /// Defer `id` by `extra_secs` without counting a failure.
    pub fn take_break(&self, id: &str, extra_secs: u64) {
        let now = self.now();
        let mut inner = self.lock();
        policy::on_break(inner.record_mut(id), now, extra_secs);
        inner.activity.push(now, format!("Taking occasional long break for {id} (+{extra_secs}s)"));
    }

    /// Clear failures and quarantine for a known entity.
    pub fn reset_quarantine(&self, id: &str) -> Result<(), ControlError> {
        let now = self.now();
        let quarantined_total = {
            let mut inner = self.lock();
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| ControlError::NotFound(id.to_string()))?;
            policy::reset(record);
            inner.activity.push(now, format!("Quarantine reset for {id}"));
            inner.records.values().filter(|r| r.quarantined).count()
        };
        tracing::info!(profile = %id, "Quarantine reset");
        metrics::record_quarantined(quarantined_total);
        Ok(())
    }

    /// Pick the group for a pass. `Advance` is the only mutator of the cursor.
    pub fn select_group(&self, selection: GroupSelection) -> GroupSlot {
        let now = self.now();
        let mut inner = self.lock();
        let slot = inner.rotation.select(selection, now);
        if selection == GroupSelection::Advance {
            inner.activity.push(
                now,
                format!("Rotation advanced to group {} of {}", slot.index + 1, slot.group_count),
            );
        }
        slot
    }

    /// Copy of the rotation cursor.
    pub fn rotation(&self) -> RotationState {
        self.lock().rotation
    }

    /// Assign a proxy descriptor to `id`, replacing any previous one.
    pub fn set_proxy(&self, id: &str, descriptor: &str) {
        let now = self.now();
        let mut inner = self.lock();
        inner.proxies.insert(id.to_string(), descriptor.to_string());
        inner.activity.push(now, format!("Proxy set for {id}: {descriptor}"));
    }

    /// Proxy assigned to `id`, if any.
    pub fn proxy_for(&self, id: &str) -> Option<String> {
        self.lock().proxies.get(id).cloned()
    }

    /// All proxy assignments, keyed by entity id.
    pub fn proxies(&self) -> BTreeMap<String, String> {
        self.lock().proxies.clone()
    }

    /// All records, sorted by entity id.
    pub fn records(&self) -> Vec<(String, HealthRecord)> {
        let mut records: Vec<(String, HealthRecord)> = self
            .lock()
            .records
            .iter()
            .map(|(id, r)| (id.clone(), *r))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    /// Quarantined entities, sorted by id.
    pub fn quarantined(&self) -> Vec<QuarantinedEntity> {
        self.records()
            .into_iter()
            .filter(|(_, r)| r.quarantined)
            .map(|(id, r)| QuarantinedEntity {
                id,
                consecutive_failures: r.consecutive_failures,
                next_eligible_at: r.next_eligible_at,
            })
            .collect()
    }

    /// `(quarantined, backing_off)` counts as of `now`.
    pub fn health_counts(&self, now: Timestamp) -> (usize, usize) {
        let inner = self.lock();
        let quarantined = inner.records.values().filter(|r| r.quarantined).count();
        let backing_off = inner.records.values().filter(|r| r.is_backing_off(now)).count();
        (quarantined, backing_off)
    }

    /// Consistent copy of everything persisted, stamped with the current time.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.now();
        let inner = self.lock();
        Snapshot {
            rotation: inner.rotation,
            records: inner.records.iter().map(|(id, r)| (id.clone(), *r)).collect(),
            proxies: inner.proxies.clone(),
            saved_at: now,
        }
    }

    /// Replace all persisted state with `snapshot`.
    pub fn restore(&self, snapshot: Snapshot) {
        let now = self.now();
        let record_count = snapshot.records.len();
        let quarantined_total = {
            let mut inner = self.lock();
            inner.rotation = snapshot.rotation.clamped();
            inner.records = snapshot.records.into_iter().collect();
            inner.proxies = snapshot.proxies;
            inner.activity.push(now, format!("Restored state for {record_count} profiles"));
            inner.records.values().filter(|r| r.quarantined).count()
        };
        metrics::record_quarantined(quarantined_total);
    }

    /// Append a free-form line to the activity journal.
    pub fn log(&self, message: impl Into<String>) {
        let now = self.now();
        let mut inner = self.lock();
        inner.activity.push(now, message);
        metrics::record_activity_log_size(inner.activity.len());
    }

    /// Journal entries, oldest first.
    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.lock().activity.entries()
    }

    /// Resize the journal, dropping the oldest entries if it shrinks.
    pub fn set_log_capacity(&self, capacity: usize) {
        self.lock().activity.set_capacity(capacity);
    }
}
