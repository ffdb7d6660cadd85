//! Profile rotator service.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐     ┌──────────────────────────────────────────────┐
//!   │ rotator-cli  │     │                 profile-rotator               │
//!   └──────┬───────┘     │                                              │
//!          │ HTTP        │  ┌───────────┐   ┌───────────┐               │
//!          └─────────────┼─▶│   admin   │──▶│ Scheduler │               │
//!                        │  │ (axum)    │   │  facade   │               │
//!                        │  └───────────┘   └─────┬─────┘               │
//!                        │                        │                     │
//!                        │        ┌───────────────┼──────────────┐      │
//!                        │        ▼               ▼              ▼      │
//!                        │  ┌───────────┐  ┌────────────┐  ┌──────────┐ │
//!                        │  │supervisor │─▶│  executor  │─▶│  state   │ │
//!                        │  │loop/save  │  │ pass logic │  │  store   │ │
//!                        │  └───────────┘  └─────┬──────┘  └────┬─────┘ │
//!                        │                       │              │       │
//!                        │         cadence · rotation · health  │       │
//!                        │                                      ▼       │
//!                        │                            server_state.json │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use profile_rotator::config::loader::load_config;
use profile_rotator::config::watcher::ConfigWatcher;
use profile_rotator::config::RotatorConfig;
use profile_rotator::http::{AppState, HttpServer};
use profile_rotator::lifecycle::{signals, Shutdown};
use profile_rotator::net::load_tls_config;
use profile_rotator::observability::{logging, metrics};
use profile_rotator::scheduler::{Scheduler, SchedulerBuilder};

const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

#[derive(Parser)]
#[command(name = "profile-rotator", version, about = "Throttled rotation scheduler for browser profiles")]
struct Args {
    /// Configuration file; defaults apply if it does not exist.
    #[arg(short, long, default_value = "rotator.toml")]
    config: PathBuf,

    /// Start the background rotation immediately.
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_exists = args.config.exists();
    let config = if config_exists {
        load_config(&args.config)?
    } else {
        RotatorConfig::default()
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "profile-rotator starting");
    if !config_exists {
        tracing::warn!(path = ?args.config, "Config file not found, using defaults");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let scheduler = Arc::new(SchedulerBuilder::from_config(&config).build());
    scheduler.restore_state();
    scheduler.ensure_autosave();
    if args.autostart {
        scheduler.start_scheduler();
    }

    let _watcher = if config_exists {
        spawn_config_watcher(&args.config, &config, scheduler.clone())
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let server_task = if config.admin.enabled {
        if config.admin.api_key == PLACEHOLDER_API_KEY {
            tracing::warn!("Admin API is using the placeholder API key, set admin.api_key");
        }
        let server = HttpServer::new(AppState::new(scheduler.clone(), &config.admin.api_key), &config.admin);
        let shutdown_rx = shutdown.subscribe();

        let task = match &config.admin.tls {
            Some(tls) => {
                let tls_config = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
                let addr: SocketAddr = config.admin.bind_address.parse()?;
                tokio::spawn(server.run_tls(addr, tls_config, shutdown_rx))
            }
            None => {
                let listener = TcpListener::bind(&config.admin.bind_address).await?;
                tokio::spawn(server.run(listener, shutdown_rx))
            }
        };
        Some(task)
    } else {
        tracing::info!("Admin API disabled");
        None
    };

    signals::wait_for_termination().await;
    tracing::info!("Shutting down");
    shutdown.trigger();
    // Manual passes hold admin requests open; end them before draining.
    scheduler.begin_shutdown().await;

    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
        }
    }
    scheduler.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Watch the config file and push safety changes into the scheduler.
fn spawn_config_watcher(
    path: &Path,
    config: &RotatorConfig,
    scheduler: Arc<Scheduler>,
) -> Option<notify::RecommendedWatcher> {
    let (watcher, mut updates) = ConfigWatcher::new(path, config.clone());
    let watcher = match watcher.run() {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload unavailable");
            return None;
        }
    };

    tokio::spawn(async move {
        while let Some(updated) = updates.recv().await {
            if let Err(errors) = scheduler.apply_safety(updated.safety) {
                for error in errors {
                    tracing::error!(%error, "Rejected safety configuration");
                }
            }
        }
    });
    Some(watcher)
}
