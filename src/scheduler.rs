//! Control facade over the scheduling engine.
//!
//! Every operation the admin API exposes lands here; handlers never touch
//! the executor or supervisor directly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::cadence::{Clock, OsRandom, RandomSource, SystemClock, Timestamp};
use crate::config::validation::{validate_safety, ValidationError};
use crate::config::{RotatorConfig, SafetyConfig};
use crate::executor::{
    Collaborators, CycleExecutor, DirectoryDiscovery, EntityDiscovery, EntityRef, InteractionHook, PassReport,
    RefreshAction, SimulatedInteraction, SimulatedRefresh, StaticDiscovery,
};
use crate::lifecycle::Supervisor;
use crate::rotation::{partition, GroupSelection};
use crate::state::{
    ActivityEntry, ControlError, JsonFileStore, MemoryStore, PersistError, QuarantinedEntity, SnapshotStore,
    StateStore,
};

/// Fleet overview for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_entities: usize,
    pub group_count: usize,
    /// Last consumed group, `None` before the first cycle.
    pub current_group_index: Option<usize>,
    pub current_group_size: usize,
    pub quarantined_count: usize,
    pub backing_off_count: usize,
    pub last_cycle_started_at: Timestamp,
}

/// Assembles a [`Scheduler`] from its collaborators.
pub struct SchedulerBuilder {
    safety: SafetyConfig,
    autosave_interval: Duration,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    discovery: Arc<dyn EntityDiscovery>,
    refresh: Arc<dyn RefreshAction>,
    interaction: Option<Arc<dyn InteractionHook>>,
    persistence: Arc<dyn SnapshotStore>,
}

impl SchedulerBuilder {
    pub fn new(safety: SafetyConfig) -> Self {
        Self {
            safety,
            autosave_interval: Duration::from_secs(60),
            clock: Arc::new(SystemClock),
            rng: Arc::new(OsRandom),
            discovery: Arc::new(StaticDiscovery::default()),
            refresh: Arc::new(SimulatedRefresh),
            interaction: None,
            persistence: Arc::new(MemoryStore::new()),
        }
    }

    /// Builder wired the way the service binary runs.
    pub fn from_config(config: &RotatorConfig) -> Self {
        let discovery: Arc<dyn EntityDiscovery> = if config.discovery.static_profiles.is_empty() {
            Arc::new(DirectoryDiscovery::new(&config.discovery.user_data_dir))
        } else {
            Arc::new(StaticDiscovery::from_ids(config.discovery.static_profiles.iter().cloned()))
        };
        let persistence: Arc<dyn SnapshotStore> = if config.persistence.enabled {
            Arc::new(JsonFileStore::new(Path::new(&config.persistence.state_path)))
        } else {
            Arc::new(MemoryStore::new())
        };

        Self::new(config.safety.clone())
            .discovery(discovery)
            .persistence(persistence)
            .autosave_interval(config.persistence.autosave_interval())
    }

    pub fn autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn rng(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn discovery(mut self, discovery: Arc<dyn EntityDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn refresh(mut self, refresh: Arc<dyn RefreshAction>) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn interaction(mut self, interaction: Arc<dyn InteractionHook>) -> Self {
        self.interaction = Some(interaction);
        self
    }

    pub fn persistence(mut self, persistence: Arc<dyn SnapshotStore>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn build(self) -> Scheduler {
        let store = Arc::new(StateStore::new(
            self.safety.rotation_groups,
            self.safety.max_log_items,
            self.clock.clone(),
        ));
        let interaction = self
            .interaction
            .unwrap_or_else(|| Arc::new(SimulatedInteraction::new(self.rng.clone()).journal(store.clone())));
        let collaborators = Collaborators {
            discovery: self.discovery,
            refresh: self.refresh,
            interaction,
        };
        let safety = Arc::new(ArcSwap::from_pointee(self.safety));
        let executor = Arc::new(CycleExecutor::new(
            store.clone(),
            safety.clone(),
            collaborators,
            self.rng,
            self.clock,
        ));
        let supervisor = Supervisor::new(
            executor.clone(),
            store.clone(),
            safety.clone(),
            self.persistence,
            self.autosave_interval,
        );

        Scheduler {
            store,
            safety,
            executor,
            supervisor,
        }
    }
}

pub struct Scheduler {
    store: Arc<StateStore>,
    safety: Arc<ArcSwap<SafetyConfig>>,
    executor: Arc<CycleExecutor>,
    supervisor: Supervisor,
}

impl Scheduler {
    pub fn builder(safety: SafetyConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(safety)
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn safety(&self) -> Arc<SafetyConfig> {
        self.safety.load_full()
    }

    /// Returns false if the loop was already running.
    pub fn start_scheduler(&self) -> bool {
        self.supervisor.start()
    }

    /// Returns false if the loop was not running.
    pub async fn stop_scheduler(&self) -> bool {
        self.supervisor.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Manual pass over the next group. Does not consume it.
    pub async fn run_on_demand_pass(&self) -> PassReport {
        self.store.log("[SAFE_REFRESH] Manual pass requested.");
        self.executor
            .run_pass(GroupSelection::Peek, &self.supervisor.pass_token())
            .await
    }

    pub fn list_quarantined(&self) -> Vec<QuarantinedEntity> {
        self.store.quarantined()
    }

    pub fn reset_quarantine(&self, id: &str) -> Result<(), ControlError> {
        self.store.reset_quarantine(id)
    }

    pub async fn summary(&self) -> Summary {
        let entities = self.executor.discover().await;
        let rotation = self.store.rotation();
        let group_count = rotation.group_count.max(1) as usize;
        let current_group_index = rotation.current_index();
        let current_group_size = current_group_index
            .and_then(|index| partition(&entities, group_count).get(index).map(Vec::len))
            .unwrap_or(0);
        let (quarantined_count, backing_off_count) = self.store.health_counts(self.store.now());

        Summary {
            total_entities: entities.len(),
            group_count,
            current_group_index,
            current_group_size,
            quarantined_count,
            backing_off_count,
            last_cycle_started_at: rotation.last_cycle_started_at,
        }
    }

    pub fn set_proxy(&self, id: &str, descriptor: &str) -> Result<(), ControlError> {
        check_proxy(id, descriptor)?;
        self.store.set_proxy(id.trim(), descriptor.trim());
        Ok(())
    }

    /// Apply every assignment or none. Returns the number applied.
    pub fn set_proxies(&self, proxies: &BTreeMap<String, String>) -> Result<usize, ControlError> {
        for (id, descriptor) in proxies {
            check_proxy(id, descriptor)?;
        }
        for (id, descriptor) in proxies {
            self.store.set_proxy(id.trim(), descriptor.trim());
        }
        Ok(proxies.len())
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.store.activity()
    }

    pub async fn profiles(&self) -> Vec<EntityRef> {
        self.executor.discover().await
    }

    /// Swap in new safety tuning. Invalid tuning is rejected and the old one kept.
    pub fn apply_safety(&self, safety: SafetyConfig) -> Result<(), Vec<ValidationError>> {
        validate_safety(&safety)?;

        let persisted_groups = self.store.rotation().group_count;
        if safety.rotation_groups != persisted_groups {
            tracing::warn!(
                configured = safety.rotation_groups,
                in_use = persisted_groups,
                "Rotation group count changes take effect only with fresh state"
            );
        }
        self.store.set_log_capacity(safety.max_log_items);
        self.safety.store(Arc::new(safety));
        self.store.log("Safety configuration updated.");
        Ok(())
    }

    pub fn ensure_autosave(&self) {
        self.supervisor.ensure_autosave();
    }

    pub async fn save_now(&self) -> Result<(), PersistError> {
        self.supervisor.save_now().await
    }

    pub fn restore_state(&self) -> bool {
        self.supervisor.restore_state()
    }

    /// Stop the loop, stop autosave and write a final snapshot.
    /// Cancel in-flight passes (background and manual) and stop the loop.
    /// Safe to call before [`Scheduler::shutdown`].
    pub async fn begin_shutdown(&self) {
        self.supervisor.begin_shutdown().await;
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }
}

fn check_proxy(id: &str, descriptor: &str) -> Result<(), ControlError> {
    if id.trim().is_empty() {
        return Err(ControlError::InvalidRequest("profile id must not be empty".to_string()));
    }
    if descriptor.trim().is_empty() {
        return Err(ControlError::InvalidRequest(format!("proxy for {} must not be empty", id.trim())));
    }
    Ok(())
}
