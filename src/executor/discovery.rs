//! Entity discovery implementations.
//!
//! # Responsibilities
//! - Scan a browser user-data directory for `Default` and `Profile *` folders
//! - Keep only folders that contain a `Bookmarks` file
//! - Label each profile with the account name from `Local State`
//!
//! Results are sorted by id so every caller partitions the same way.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::executor::collaborators::{DiscoveryError, EntityDiscovery, EntityRef};

const UNKNOWN_LABEL: &str = "Unknown";

/// Scans a browser user-data directory.
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    user_data_dir: PathBuf,
}

impl DirectoryDiscovery {
    pub fn new(user_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_data_dir: user_data_dir.into(),
        }
    }
}

#[async_trait]
impl EntityDiscovery for DirectoryDiscovery {
    async fn discover(&self) -> Result<Vec<EntityRef>, DiscoveryError> {
        let dir = self.user_data_dir.clone();
        tokio::task::spawn_blocking(move || scan_profiles(&dir))
            .await
            .map_err(|e| DiscoveryError::Unavailable(format!("profile scan task failed: {e}")))?
    }
}

#[derive(Debug, Default, Deserialize)]
struct LocalState {
    #[serde(default)]
    profile: ProfileSection,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileSection {
    #[serde(default)]
    info_cache: HashMap<String, ProfileInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileInfo {
    #[serde(default)]
    user_name: Option<String>,
}

fn read_labels(user_data_dir: &Path) -> HashMap<String, String> {
    let path = user_data_dir.join("Local State");
    let parsed = fs::read(&path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<LocalState>(&bytes).ok());

    match parsed {
        Some(state) => state
            .profile
            .info_cache
            .into_iter()
            .filter_map(|(folder, info)| info.user_name.filter(|n| !n.is_empty()).map(|n| (folder, n)))
            .collect(),
        None => {
            tracing::debug!(path = ?path, "No readable Local State, profiles will be unlabelled");
            HashMap::new()
        }
    }
}

fn is_profile_folder(name: &str) -> bool {
    name == "Default" || name.starts_with("Profile ")
}

fn scan_profiles(user_data_dir: &Path) -> Result<Vec<EntityRef>, DiscoveryError> {
    let entries = fs::read_dir(user_data_dir).map_err(|source| DiscoveryError::Io {
        path: user_data_dir.display().to_string(),
        source,
    })?;
    let labels = read_labels(user_data_dir);

    let mut profiles: Vec<EntityRef> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_profile_folder(&name) || !entry.path().join("Bookmarks").exists() {
                return None;
            }
            let label = labels.get(&name).cloned().unwrap_or_else(|| UNKNOWN_LABEL.to_string());
            Some(EntityRef::new(name, label))
        })
        .collect();

    profiles.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(profiles)
}

/// Fixed entity list, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    entities: Vec<EntityRef>,
}

impl StaticDiscovery {
    pub fn new(mut entities: Vec<EntityRef>) -> Self {
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        entities.dedup_by(|a, b| a.id == b.id);
        Self { entities }
    }

    /// Entities labelled with their own id.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| {
                    let id = id.into();
                    EntityRef::new(id.clone(), id)
                })
                .collect(),
        )
    }
}

#[async_trait]
impl EntityDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<EntityRef>, DiscoveryError> {
        Ok(self.entities.clone())
    }
}
