//! Configuration file watcher for hot reload.
//!
//! Only reloads that parse, validate and actually differ from the last
//! delivered config reach the receiver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RotatorConfig;

/// Watches one config file and forwards validated changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: RotatorConfig,
    update_tx: mpsc::UnboundedSender<RotatorConfig>,
}

impl ConfigWatcher {
    /// `current` is the config already in effect; identical reloads are dropped.
    pub fn new(path: &Path, current: RotatorConfig) -> (Self, mpsc::UnboundedReceiver<RotatorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, current, update_tx } = self;
        let mut last_sent = current;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &watched) => {
                    if let Some(config) = reload(&watched, &last_sent) {
                        last_sent = config.clone();
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && (event.paths.is_empty() || event.paths.iter().any(|p| p.file_name() == path.file_name()))
}

fn reload(path: &Path, last: &RotatorConfig) -> Option<RotatorConfig> {
    match load_config(path) {
        Ok(config) if config == *last => {
            tracing::debug!("Config file touched without changes");
            None
        }
        Ok(config) => {
            tracing::info!(path = ?path, "Config reloaded");
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
