//! One pass over one rotation group.
//!
//! # Per-entity flow
//! ```text
//! cancelled? ── yes ──→ stop, keep everything already recorded
//!     │
//! eligible? ─── no ───→ log skip, next entity (no delay)
//!     │
//! long break? ─ yes ──→ defer entity ─────────────┐
//!     │                                            │
//! interaction? → hook                              │
//!     │                                            │
//! refresh ──→ mark success / mark failure ─────────┤
//!                                                  ▼
//!                                    sleep(delay) unless cancelled
//! ```

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::cadence::{per_entity_delay, should_inject, CadenceConfig, Clock, RandomSource};
use crate::config::SafetyConfig;
use crate::executor::collaborators::{Collaborators, EntityRef};
use crate::health::{Eligibility, FailurePolicy};
use crate::lifecycle::CancelToken;
use crate::observability::metrics;
use crate::rotation::{partition, GroupSelection};
use crate::state::StateStore;

/// Outcome of a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Group processed, `None` when discovery found nothing.
    pub group_index: Option<usize>,
    pub group_count: usize,
    pub group_size: usize,
    pub refreshed: usize,
    pub skipped: usize,
    pub breaks: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl PassReport {
    /// True when the pass had no entities to work on.
    pub fn nothing_to_do(&self) -> bool {
        self.group_index.is_none() && !self.cancelled
    }
}

/// Runs passes against the shared state store.
pub struct CycleExecutor {
    store: Arc<StateStore>,
    safety: Arc<ArcSwap<SafetyConfig>>,
    collaborators: Collaborators,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    // One refresh at a time across background and on-demand passes.
    refresh_lane: tokio::sync::Mutex<()>,
}

impl CycleExecutor {
    pub fn new(
        store: Arc<StateStore>,
        safety: Arc<ArcSwap<SafetyConfig>>,
        collaborators: Collaborators,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            safety,
            collaborators,
            rng,
            clock,
            refresh_lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Current entity set; a discovery failure counts as empty.
    pub async fn discover(&self) -> Vec<EntityRef> {
        match self.collaborators.discovery.discover().await {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(error = %e, "Profile discovery failed");
                self.store.log(format!("Discovery failed: {e}"));
                Vec::new()
            }
        }
    }

    pub async fn run_pass(&self, selection: GroupSelection, cancel: &CancelToken) -> PassReport {
        let kind = selection.label();
        let safety = self.safety.load_full();

        let entities = self.discover().await;
        if entities.is_empty() {
            self.store.log(format!("[{kind}] No profiles found, nothing to refresh."));
            metrics::record_pass(kind, 0);
            return PassReport::default();
        }

        if cancel.is_cancelled() {
            self.store.log(format!("[{kind}] Pass cancelled before start."));
            return PassReport {
                cancelled: true,
                ..PassReport::default()
            };
        }

        let slot = self.store.select_group(selection);
        let mut group = partition(&entities, slot.group_count)
            .into_iter()
            .nth(slot.index)
            .unwrap_or_default();
        group.truncate(safety.max_profiles_per_cycle);

        let delay = per_entity_delay(
            group.len(),
            &CadenceConfig::from(&*safety),
            &*self.rng,
            self.clock.local_hour(),
        );
        let failure_policy = FailurePolicy::from(&*safety);

        let mut report = PassReport {
            group_index: Some(slot.index),
            group_count: slot.group_count,
            group_size: group.len(),
            ..PassReport::default()
        };

        self.store.log(format!(
            "[{kind}] Group {}/{}: {} profiles, ~{}s between refreshes.",
            slot.index + 1,
            slot.group_count,
            group.len(),
            delay.as_secs()
        ));
        tracing::info!(
            kind,
            group = slot.index,
            group_count = slot.group_count,
            group_size = group.len(),
            delay_secs = delay.as_secs(),
            "Pass started"
        );

        for entity in &group {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if let Eligibility::Ineligible(reason) = self.store.eligibility(&entity.id) {
                self.store.log(format!("Skipping {} ({reason}).", entity.id));
                metrics::record_refresh("skipped");
                report.skipped += 1;
                continue;
            }

            if should_inject(&*self.rng, safety.long_break_chance_pct) {
                let extra = self.rng.below(safety.long_break_max_secs);
                self.store.take_break(&entity.id, extra);
                metrics::record_refresh("break");
                report.breaks += 1;
            } else {
                self.refresh_one(entity, &safety, &failure_policy, &mut report).await;
            }

            if !cancel.sleep(delay).await {
                report.cancelled = true;
                break;
            }
        }

        if report.cancelled {
            self.store.log(format!(
                "[{kind}] Pass cancelled after refreshing {} profiles.",
                report.refreshed
            ));
        } else {
            self.store.log(format!("[{kind}] Completed. Refreshed {} profiles.", report.refreshed));
        }
        metrics::record_pass(kind, report.refreshed);
        tracing::info!(
            kind,
            refreshed = report.refreshed,
            skipped = report.skipped,
            breaks = report.breaks,
            failed = report.failed,
            cancelled = report.cancelled,
            "Pass finished"
        );
        report
    }

    async fn refresh_one(
        &self,
        entity: &EntityRef,
        safety: &SafetyConfig,
        failure_policy: &FailurePolicy,
        report: &mut PassReport,
    ) {
        let _lane = self.refresh_lane.lock().await;
        if should_inject(&*self.rng, safety.interaction_chance_pct) {
            self.collaborators.interaction.interact(entity).await;
        }

        let proxy = self.store.proxy_for(&entity.id);
        match self.collaborators.refresh.refresh(entity, proxy.as_deref()).await {
            Ok(()) => {
                self.store.mark_success(&entity.id);
                metrics::record_refresh("success");
                report.refreshed += 1;
            }
            Err(e) => {
                tracing::warn!(profile = %entity.id, error = %e, "Refresh failed");
                self.store.log(format!("Error refreshing {}: {}", entity.id, e.reason));
                self.store.mark_failure(&entity.id, failure_policy);
                metrics::record_refresh("failure");
                report.failed += 1;
            }
        }
    }
}
