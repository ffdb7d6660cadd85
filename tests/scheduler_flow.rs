//! End-to-end scheduling behaviour through the `Scheduler` facade.

use std::sync::Arc;
use std::time::Duration;

use profile_rotator::config::SafetyConfig;
use profile_rotator::state::{JsonFileStore, SnapshotStore};

mod common;
use common::{fixture, quiet_safety, START};

#[tokio::test(start_paused = true)]
async fn test_start_and_stop_are_idempotent() {
    let f = fixture(&["a", "b"], quiet_safety(1), None);

    assert!(f.scheduler.start_scheduler());
    assert!(!f.scheduler.start_scheduler());
    assert!(f.scheduler.is_running());

    assert!(f.scheduler.stop_scheduler().await);
    assert!(!f.scheduler.is_running());
    assert!(!f.scheduler.stop_scheduler().await);
}

#[tokio::test(start_paused = true)]
async fn test_background_loop_walks_the_groups() {
    // Two groups of two; with jitter pinned the spacing is 490s, so the
    // first pass ends at 980s and the second starts 5s later.
    let f = fixture(&["a", "b", "c", "d"], quiet_safety(2), None);
    f.scheduler.start_scheduler();

    tokio::time::sleep(Duration::from_secs(1_000)).await;
    assert_eq!(f.refresh.calls(), vec!["a", "b", "c"]);
    assert_eq!(f.scheduler.store().rotation().last_group_index, 1);

    f.scheduler.stop_scheduler().await;
    let calls_at_stop = f.refresh.calls().len();
    tokio::time::sleep(Duration::from_secs(5_000)).await;
    assert_eq!(f.refresh.calls().len(), calls_at_stop);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_throttle_sleep() {
    let f = fixture(&["a", "b", "c"], quiet_safety(1), None);
    f.scheduler.start_scheduler();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = tokio::time::Instant::now();
    assert!(f.scheduler.stop_scheduler().await);
    assert!(before.elapsed() < Duration::from_secs(5));
    assert_eq!(f.refresh.calls(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_begin_shutdown_ends_manual_pass_and_loop() {
    let f = fixture(&["a", "b", "c", "d"], quiet_safety(2), None);
    f.scheduler.start_scheduler();

    let scheduler = f.scheduler.clone();
    let manual = tokio::spawn(async move { scheduler.run_on_demand_pass().await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let before = tokio::time::Instant::now();
    f.scheduler.begin_shutdown().await;
    let report = manual.await.unwrap();
    assert!(before.elapsed() < Duration::from_secs(5));
    assert!(report.cancelled);
    assert!(!f.scheduler.is_running());
    assert!(!f.scheduler.start_scheduler());

    let calls = f.refresh.calls().len();
    tokio::time::sleep(Duration::from_secs(5_000)).await;
    assert_eq!(f.refresh.calls().len(), calls);
    f.scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interaction_runs_for_each_refreshed_profile() {
    let safety = SafetyConfig {
        interaction_chance_pct: 100,
        ..quiet_safety(1)
    };
    let f = fixture(&["a", "b"], safety, None);

    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.refreshed, 2);
    assert_eq!(f.interaction.seen(), vec!["a", "b"]);
    assert_eq!(f.interaction.seen(), f.refresh.calls());
}

#[tokio::test(start_paused = true)]
async fn test_quiet_safety_never_interacts() {
    let f = fixture(&["a", "b"], quiet_safety(1), None);
    f.scheduler.run_on_demand_pass().await;
    assert_eq!(f.refresh.calls().len(), 2);
    assert!(f.interaction.seen().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_on_demand_pass_does_not_consume_group() {
    let f = fixture(&["a", "b", "c", "d"], quiet_safety(2), None);

    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.group_index, Some(0));
    assert_eq!(report.refreshed, 2);
    assert_eq!(f.scheduler.store().rotation().last_group_index, -1);

    f.scheduler.store().select_group(profile_rotator::rotation::GroupSelection::Advance);
    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.group_index, Some(1));
    assert_eq!(f.refresh.calls(), vec!["a", "b", "c", "d"]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_failures_quarantine_until_reset() {
    let f = fixture(&["a"], quiet_safety(1), None);
    f.refresh.fail("a");

    for _ in 0..3 {
        let report = f.scheduler.run_on_demand_pass().await;
        assert_eq!(report.failed, 1);
        f.clock.advance(100_000);
    }
    let quarantined = f.scheduler.list_quarantined();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].id, "a");
    assert_eq!(quarantined[0].consecutive_failures, 3);

    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(f.refresh.calls().len(), 3);

    f.scheduler.reset_quarantine("a").unwrap();
    f.refresh.heal("a");
    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.refreshed, 1);

    let record = f.scheduler.store().get("a");
    assert!(!record.quarantined);
    assert_eq!(record.consecutive_failures, 0);
    assert_eq!(record.last_success_at, Some(START + 300_000));
    assert!(f.scheduler.list_quarantined().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backoff_skips_until_window_passes() {
    let f = fixture(&["a"], quiet_safety(1), None);
    f.refresh.fail("a");
    f.scheduler.run_on_demand_pass().await;
    assert_eq!(f.scheduler.store().get("a").next_eligible_at, START + 120);

    f.refresh.heal("a");
    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.skipped, 1);

    f.clock.advance(120);
    let report = f.scheduler.run_on_demand_pass().await;
    assert_eq!(report.refreshed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server_state.json");

    let first = fixture(
        &["a", "b", "c"],
        quiet_safety(3),
        Some(Arc::new(JsonFileStore::new(&path)) as Arc<dyn SnapshotStore>),
    );
    first.scheduler.set_proxy("b", "http://10.0.0.7:3128").unwrap();
    first.refresh.fail("a");
    first.scheduler.start_scheduler();
    tokio::time::sleep(Duration::from_secs(10)).await;
    first.scheduler.shutdown().await;

    let second = fixture(
        &["a", "b", "c"],
        quiet_safety(3),
        Some(Arc::new(JsonFileStore::new(&path)) as Arc<dyn SnapshotStore>),
    );
    assert!(second.scheduler.restore_state());
    let store = second.scheduler.store();
    assert_eq!(store.rotation().last_group_index, 0);
    assert_eq!(store.rotation().last_cycle_started_at, START);
    assert_eq!(store.proxy_for("b").as_deref(), Some("http://10.0.0.7:3128"));
    assert_eq!(store.get("a").consecutive_failures, 1);
}
