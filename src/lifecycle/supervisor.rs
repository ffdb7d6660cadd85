//! Background rotation loop and autosave.
//!
//! # Responsibilities
//! - Start/stop the background pass loop (idempotent)
//! - Survive panicking passes
//! - Autosave snapshots until process shutdown
//! - Two-phase shutdown: cancel every pass first, final save last

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::SafetyConfig;
use crate::executor::{CycleExecutor, PassReport};
use crate::lifecycle::cancel::{CancelToken, Cancellation};
use crate::observability::metrics;
use crate::rotation::GroupSelection;
use crate::state::{PersistError, SnapshotStore, StateStore};

struct RunningLoop {
    cancellation: Cancellation,
    handle: JoinHandle<()>,
}

/// Aborts the pass task if the loop that awaits it is itself aborted.
struct PassGuard(JoinHandle<PassReport>);

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Supervisor {
    executor: Arc<CycleExecutor>,
    store: Arc<StateStore>,
    safety: Arc<ArcSwap<SafetyConfig>>,
    persistence: Arc<dyn SnapshotStore>,
    autosave_interval: Duration,
    running: Mutex<Option<RunningLoop>>,
    autosave: Mutex<Option<JoinHandle<()>>>,
    // Parent of the loop's cancellation and of on-demand passes.
    passes: Cancellation,
    // Autosave only; outlives `passes` so the drain can still be saved.
    lifetime: Cancellation,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Supervisor {
    pub fn new(
        executor: Arc<CycleExecutor>,
        store: Arc<StateStore>,
        safety: Arc<ArcSwap<SafetyConfig>>,
        persistence: Arc<dyn SnapshotStore>,
        autosave_interval: Duration,
    ) -> Self {
        Self {
            executor,
            store,
            safety,
            persistence,
            autosave_interval,
            running: Mutex::new(None),
            autosave: Mutex::new(None),
            passes: Cancellation::new(),
            lifetime: Cancellation::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        locked(&self.running)
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Token for on-demand passes, cancelled when shutdown begins.
    pub fn pass_token(&self) -> CancelToken {
        self.passes.token()
    }

    /// Spawn the background loop. Returns false if it was already running
    /// or shutdown has begun.
    pub fn start(&self) -> bool {
        {
            let mut running = locked(&self.running);
            if running.as_ref().is_some_and(|r| !r.handle.is_finished()) || self.passes.is_cancelled() {
                return false;
            }
            let cancellation = self.passes.child();
            let handle = tokio::spawn(run_loop(
                self.executor.clone(),
                self.store.clone(),
                self.safety.clone(),
                cancellation.token(),
            ));
            *running = Some(RunningLoop { cancellation, handle });
        }
        self.store.log("Scheduler started.");
        tracing::info!("Scheduler started");
        self.ensure_autosave();
        true
    }

    /// Cancel the loop and wait for it. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(RunningLoop {
            cancellation,
            mut handle,
        }) = locked(&self.running).take()
        else {
            return false;
        };

        cancellation.cancel();
        let timeout = self.safety.load().stop_timeout();
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Scheduler loop ended abnormally"),
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Scheduler loop did not stop in time, aborting");
                handle.abort();
            }
        }
        self.store.log("Scheduler stopped.");
        tracing::info!("Scheduler stopped");
        true
    }

    /// Spawn the autosave task unless it is already alive or shutdown has begun.
    pub fn ensure_autosave(&self) {
        let mut autosave = locked(&self.autosave);
        if autosave.as_ref().is_some_and(|h| !h.is_finished()) || self.lifetime.is_cancelled() {
            return;
        }
        let store = self.store.clone();
        let persistence = self.persistence.clone();
        let token = self.lifetime.token();
        let period = self.autosave_interval.max(Duration::from_secs(1));

        *autosave = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Failures are logged inside persist.
                        let _ = persist(&store, &persistence).await;
                    }
                }
            }
            tracing::debug!("Autosave task stopped");
        }));
        tracing::info!(interval_secs = period.as_secs(), "Autosave running");
    }

    pub async fn save_now(&self) -> Result<(), PersistError> {
        persist(&self.store, &self.persistence).await
    }

    /// Load the last snapshot into the store. Returns true if one was found.
    pub fn restore_state(&self) -> bool {
        match self.persistence.load() {
            Ok(Some(snapshot)) => {
                let safety = self.safety.load();
                let configured = safety.rotation_groups;
                if snapshot.rotation.group_count != configured {
                    tracing::warn!(
                        persisted = snapshot.rotation.group_count,
                        configured,
                        "Persisted rotation group count differs from configuration, keeping persisted value"
                    );
                }
                let profiles = snapshot.records.len();
                self.store.restore(snapshot.normalized(safety.failure_quarantine_threshold));
                tracing::info!(source = %self.persistence.describe(), profiles, "State restored");
                true
            }
            Ok(None) => {
                tracing::info!(source = %self.persistence.describe(), "No saved state, starting fresh");
                false
            }
            Err(e) => {
                tracing::error!(source = %self.persistence.describe(), error = %e, "Failed to load saved state, starting fresh");
                false
            }
        }
    }

    /// First shutdown phase: cancel in-flight passes and stop the loop.
    ///
    /// Called before draining the admin server so a manual pass held open by
    /// a request ends at its next entity boundary. Idempotent.
    pub async fn begin_shutdown(&self) {
        if !self.passes.is_cancelled() {
            tracing::info!("Cancelling scheduler passes");
        }
        self.passes.cancel();
        self.stop().await;
    }

    /// Cancel passes, stop autosave, then save one last time.
    pub async fn shutdown(&self) {
        self.begin_shutdown().await;
        self.lifetime.cancel();
        let autosave = locked(&self.autosave).take();
        if let Some(handle) = autosave {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Autosave task ended abnormally");
            }
        }
        if persist(&self.store, &self.persistence).await.is_ok() {
            tracing::info!("Final state saved");
        }
    }
}

async fn run_loop(
    executor: Arc<CycleExecutor>,
    store: Arc<StateStore>,
    safety: Arc<ArcSwap<SafetyConfig>>,
    token: CancelToken,
) {
    while !token.is_cancelled() {
        let pass_executor = executor.clone();
        let pass_token = token.clone();
        let mut pass = PassGuard(tokio::spawn(async move {
            pass_executor.run_pass(GroupSelection::Advance, &pass_token).await
        }));

        let pause = match (&mut pass.0).await {
            Ok(report) if report.cancelled => break,
            Ok(report) if report.nothing_to_do() => safety.load().empty_discovery_delay(),
            Ok(_) => safety.load().idle_pass_delay(),
            Err(e) => {
                tracing::error!(error = %e, "Rotation pass crashed");
                store.log(format!("Error in scheduler loop: {e}"));
                safety.load().error_retry_delay()
            }
        };

        if !token.sleep(pause).await {
            break;
        }
    }
    tracing::debug!("Scheduler loop exited");
}

async fn persist(store: &Arc<StateStore>, persistence: &Arc<dyn SnapshotStore>) -> Result<(), PersistError> {
    let snapshot = store.snapshot();
    let persistence = persistence.clone();
    let result = match tokio::task::spawn_blocking(move || persistence.save(&snapshot)).await {
        Ok(result) => result,
        Err(e) => Err(PersistError::Io(std::io::Error::other(e.to_string()))),
    };

    match &result {
        Ok(()) => {
            metrics::record_save("ok");
            tracing::debug!("State saved");
        }
        Err(e) => {
            metrics::record_save("error");
            tracing::error!(error = %e, "Failed to save state");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::cadence::{ManualClock, SequenceRandom};
    use crate::executor::{
        Collaborators, EntityRef, InteractionHook, RefreshAction, RefreshError, StaticDiscovery,
    };
    use crate::state::MemoryStore;

    struct PanickingRefresh;

    #[async_trait]
    impl RefreshAction for PanickingRefresh {
        async fn refresh(&self, _entity: &EntityRef, _proxy: Option<&str>) -> Result<(), RefreshError> {
            panic!("refresh blew up");
        }
    }

    struct Idle;

    #[async_trait]
    impl InteractionHook for Idle {
        async fn interact(&self, _entity: &EntityRef) {}
    }

    fn supervisor(refresh: Arc<dyn RefreshAction>, persistence: Arc<MemoryStore>) -> (Supervisor, Arc<StateStore>) {
        let clock = Arc::new(ManualClock::new(1_000, 12));
        let safety = SafetyConfig {
            rotation_groups: 1,
            interaction_chance_pct: 0,
            long_break_chance_pct: 0,
            ..SafetyConfig::default()
        };
        let store = Arc::new(StateStore::new(1, 100, clock.clone()));
        let safety = Arc::new(ArcSwap::from_pointee(safety));
        let executor = Arc::new(CycleExecutor::new(
            store.clone(),
            safety.clone(),
            Collaborators {
                discovery: Arc::new(StaticDiscovery::from_ids(["p1", "p2"])),
                refresh,
                interaction: Arc::new(Idle),
            },
            Arc::new(SequenceRandom::constant(50)),
            clock,
        ));
        let supervisor = Supervisor::new(executor, store.clone(), safety, persistence, Duration::from_secs(60));
        (supervisor, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_pass_does_not_kill_loop() {
        let (supervisor, store) = supervisor(Arc::new(PanickingRefresh), Arc::new(MemoryStore::new()));
        assert!(supervisor.start());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(supervisor.is_running());
        let crashes = store
            .activity()
            .iter()
            .filter(|e| e.message.starts_with("Error in scheduler loop"))
            .count();
        assert!(crashes >= 2, "expected repeated crashes, saw {crashes}");

        assert!(supervisor.stop().await);
        assert!(!supervisor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_and_final_save() {
        let persistence = Arc::new(MemoryStore::new());
        let (supervisor, store) = supervisor(Arc::new(crate::executor::SimulatedRefresh), persistence.clone());

        supervisor.ensure_autosave();
        store.set_proxy("p1", "http://10.0.0.1:3128");
        tokio::time::sleep(Duration::from_secs(61)).await;
        let saved = persistence.load().unwrap().expect("autosave should have written a snapshot");
        assert_eq!(saved.proxies.get("p1").map(String::as_str), Some("http://10.0.0.1:3128"));

        store.set_proxy("p2", "socks5://10.0.0.2:1080");
        supervisor.shutdown().await;
        let saved = persistence.load().unwrap().unwrap();
        assert_eq!(saved.proxies.len(), 2);

        supervisor.ensure_autosave();
        assert!(locked(&supervisor.autosave).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_shutdown_cancels_passes_and_refuses_restart() {
        let persistence = Arc::new(MemoryStore::new());
        let (supervisor, _store) = supervisor(Arc::new(crate::executor::SimulatedRefresh), persistence.clone());
        assert!(supervisor.start());
        let pass_token = supervisor.pass_token();

        supervisor.begin_shutdown().await;
        assert!(pass_token.is_cancelled());
        assert!(!supervisor.is_running());
        assert!(!supervisor.start());

        // Autosave keeps its own lifetime until the final save.
        assert!(locked(&supervisor.autosave).as_ref().is_some_and(|h| !h.is_finished()));
        supervisor.shutdown().await;
        assert!(persistence.load().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_reads_persisted_snapshot() {
        let persistence = Arc::new(MemoryStore::new());
        let (first, store) = supervisor(Arc::new(crate::executor::SimulatedRefresh), persistence.clone());
        store.update("p1", |r| r.quarantined = true);
        first.save_now().await.unwrap();

        let (second, restored) = supervisor(Arc::new(crate::executor::SimulatedRefresh), persistence);
        assert!(second.restore_state());
        let record = restored.get("p1");
        assert!(record.quarantined);
        // Quarantined with zero failures on disk; loads at the threshold.
        assert_eq!(record.consecutive_failures, SafetyConfig::default().failure_quarantine_threshold);
    }
}
