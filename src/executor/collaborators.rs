//! Seams to the outside world: discovery, refresh, interaction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A managed entity as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    /// Unique identifier, e.g. the profile directory name.
    pub id: String,
    /// Informational label, e.g. the signed-in account.
    pub label: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Entity enumeration failed; the pass has nothing to do.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("profile directory {path} unreadable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("discovery unavailable: {0}")]
    Unavailable(String),
}

/// A refresh attempt failed; handled by backoff, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("refresh of {entity} failed: {reason}")]
pub struct RefreshError {
    pub entity: String,
    pub reason: String,
}

impl RefreshError {
    pub fn new(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

/// Enumerates the current entity set.
#[async_trait]
pub trait EntityDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Vec<EntityRef>, DiscoveryError>;
}

/// Performs the refresh of one entity.
#[async_trait]
pub trait RefreshAction: Send + Sync {
    async fn refresh(&self, entity: &EntityRef, proxy: Option<&str>) -> Result<(), RefreshError>;
}

/// Fire-and-forget hook invoked before some refreshes.
#[async_trait]
pub trait InteractionHook: Send + Sync {
    async fn interact(&self, entity: &EntityRef);
}

/// The three collaborators a pass needs.
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn EntityDiscovery>,
    pub refresh: Arc<dyn RefreshAction>,
    pub interaction: Arc<dyn InteractionHook>,
}
