//! Simulated refresh and interaction.
//!
//! No browser automation happens here: a refresh always succeeds and an
//! interaction only records which gesture it would have made.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cadence::RandomSource;
use crate::executor::collaborators::{EntityRef, InteractionHook, RefreshAction, RefreshError};
use crate::state::StateStore;

const GESTURES: [&str; 3] = ["small_scroll", "hover", "pause"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedRefresh;

#[async_trait]
impl RefreshAction for SimulatedRefresh {
    async fn refresh(&self, entity: &EntityRef, proxy: Option<&str>) -> Result<(), RefreshError> {
        tracing::info!(
            profile = %entity.id,
            label = %entity.label,
            proxy = proxy.unwrap_or("direct"),
            "Refreshing (simulated)"
        );
        Ok(())
    }
}

pub struct SimulatedInteraction {
    rng: Arc<dyn RandomSource>,
    journal: Option<Arc<StateStore>>,
}

impl SimulatedInteraction {
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng, journal: None }
    }

    /// Also write each gesture to the store's activity log.
    pub fn journal(mut self, store: Arc<StateStore>) -> Self {
        self.journal = Some(store);
        self
    }

    pub fn pick_gesture(&self) -> &'static str {
        GESTURES[self.rng.below(GESTURES.len() as u64) as usize]
    }
}

#[async_trait]
impl InteractionHook for SimulatedInteraction {
    async fn interact(&self, entity: &EntityRef) {
        let gesture = self.pick_gesture();
        tracing::debug!(profile = %entity.id, gesture, "Simulated interaction");
        if let Some(store) = &self.journal {
            store.log(format!("[SIMULATED INTERACTION] {}: {gesture}", entity.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{ManualClock, SequenceRandom};

    #[tokio::test]
    async fn test_simulated_refresh_succeeds() {
        let entity = EntityRef::new("Default", "alice@example.com");
        assert!(SimulatedRefresh.refresh(&entity, Some("http://10.0.0.1:3128")).await.is_ok());
        assert!(SimulatedRefresh.refresh(&entity, None).await.is_ok());
    }

    #[test]
    fn test_gesture_choice_follows_rng() {
        let interaction = SimulatedInteraction::new(Arc::new(SequenceRandom::new(vec![0, 1, 2, u64::MAX])));
        let picked: Vec<&str> = (0..4).map(|_| interaction.pick_gesture()).collect();
        assert_eq!(picked, vec!["small_scroll", "hover", "pause", "pause"]);
    }

    #[tokio::test]
    async fn test_interaction_is_journaled() {
        let store = Arc::new(StateStore::new(1, 10, Arc::new(ManualClock::new(1_000, 12))));
        let interaction = SimulatedInteraction::new(Arc::new(SequenceRandom::constant(1))).journal(store.clone());

        interaction.interact(&EntityRef::new("Profile 2", "bob")).await;
        let messages: Vec<String> = store.activity().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["[SIMULATED INTERACTION] Profile 2: hover"]);
    }
}
