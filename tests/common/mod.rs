//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use profile_rotator::cadence::{ManualClock, SequenceRandom};
use profile_rotator::config::SafetyConfig;
use profile_rotator::executor::{EntityRef, InteractionHook, RefreshAction, RefreshError, StaticDiscovery};
use profile_rotator::state::SnapshotStore;
use profile_rotator::{Scheduler, SchedulerBuilder};

pub const START: u64 = 1_700_000_000;

/// Refresh action whose failures are scripted per profile.
#[derive(Default)]
pub struct ScriptedRefresh {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedRefresh {
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshAction for ScriptedRefresh {
    async fn refresh(&self, entity: &EntityRef, _proxy: Option<&str>) -> Result<(), RefreshError> {
        self.calls.lock().unwrap().push(entity.id.clone());
        if self.failing.lock().unwrap().contains(&entity.id) {
            Err(RefreshError::new(&entity.id, "scripted failure"))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct RecordingInteraction {
    pub seen: Mutex<Vec<String>>,
}

impl RecordingInteraction {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionHook for RecordingInteraction {
    async fn interact(&self, entity: &EntityRef) {
        self.seen.lock().unwrap().push(entity.id.clone());
    }
}

/// Safety tuning without random breaks or interactions.
pub fn quiet_safety(groups: u32) -> SafetyConfig {
    SafetyConfig {
        rotation_groups: groups,
        interaction_chance_pct: 0,
        long_break_chance_pct: 0,
        ..SafetyConfig::default()
    }
}

pub struct Fixture {
    pub scheduler: Arc<Scheduler>,
    pub refresh: Arc<ScriptedRefresh>,
    pub interaction: Arc<RecordingInteraction>,
    pub clock: Arc<ManualClock>,
}

pub fn fixture(ids: &[&str], safety: SafetyConfig, persistence: Option<Arc<dyn SnapshotStore>>) -> Fixture {
    let refresh = Arc::new(ScriptedRefresh::default());
    let interaction = Arc::new(RecordingInteraction::default());
    let clock = Arc::new(ManualClock::new(START, 12));

    let mut builder = SchedulerBuilder::new(safety)
        .clock(clock.clone())
        .rng(Arc::new(SequenceRandom::constant(10)))
        .discovery(Arc::new(StaticDiscovery::from_ids(ids.iter().copied())))
        .refresh(refresh.clone())
        .interaction(interaction.clone());
    if let Some(persistence) = persistence {
        builder = builder.persistence(persistence);
    }

    Fixture {
        scheduler: Arc::new(builder.build()),
        refresh,
        interaction,
        clock,
    }
}
