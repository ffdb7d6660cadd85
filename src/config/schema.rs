//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the rotator.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RotatorConfig {
    /// Admin API listener and credentials.
    pub admin: AdminConfig,

    /// Rotation, cadence and failure-handling tuning.
    pub safety: SafetyConfig,

    /// State file settings.
    pub persistence: PersistenceConfig,

    /// Where profiles come from.
    pub discovery: DiscoveryConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token or X-Auth-Token).
    pub api_key: String,

    /// Bind address.
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Per-request timeout in seconds. On-demand passes run inside a request.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:5002".to_string(),
            tls: None,
            request_timeout_secs: 2 * 60 * 60,
        }
    }
}

/// TLS configuration for the admin listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Scheduling safety settings. Hot-reloadable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SafetyConfig {
    /// Target duration of one group pass in minutes.
    pub base_cycle_minutes: u64,

    /// Ceiling on entities processed per pass.
    pub max_profiles_per_cycle: usize,

    /// Floor on the per-entity delay in seconds.
    pub min_delay_secs: u64,

    /// Jitter bound (±) in seconds.
    pub jitter_secs: u64,

    /// Chance (0-100) of a simulated interaction before a refresh.
    pub interaction_chance_pct: u32,

    /// Chance (0-100) of skipping an entity with a long break.
    pub long_break_chance_pct: u32,

    /// Upper bound (exclusive) of a long break in seconds.
    pub long_break_max_secs: u64,

    /// Consecutive failures before quarantine.
    pub failure_quarantine_threshold: u32,

    /// Backoff after the first failure in seconds; doubles per failure.
    pub failure_backoff_base_secs: u64,

    /// Backoff cap in seconds.
    pub max_backoff_secs: u64,

    /// First local hour of the active window.
    pub active_hours_start: u32,

    /// Local hour the active window ends (exclusive).
    pub active_hours_end: u32,

    /// Number of rotation groups. Only used when no state has been persisted.
    pub rotation_groups: u32,

    /// Activity journal bound.
    pub max_log_items: usize,

    /// Pause between background passes in seconds.
    pub idle_pass_delay_secs: u64,

    /// Pause when discovery found nothing, in seconds.
    pub empty_discovery_delay_secs: u64,

    /// Pause after a pass crashed, in seconds.
    pub error_retry_delay_secs: u64,

    /// How long stop waits for the worker before aborting it, in seconds.
    pub stop_timeout_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            base_cycle_minutes: 32,
            max_profiles_per_cycle: 1000,
            min_delay_secs: 60,
            jitter_secs: 480,
            interaction_chance_pct: 30,
            long_break_chance_pct: 8,
            long_break_max_secs: 30 * 60,
            failure_quarantine_threshold: 3,
            failure_backoff_base_secs: 2 * 60,
            max_backoff_secs: 24 * 60 * 60,
            active_hours_start: 8,
            active_hours_end: 23,
            rotation_groups: 3,
            max_log_items: 2000,
            idle_pass_delay_secs: 5,
            empty_discovery_delay_secs: 10,
            error_retry_delay_secs: 10,
            stop_timeout_secs: 5,
        }
    }
}

impl SafetyConfig {
    pub fn idle_pass_delay(&self) -> Duration {
        Duration::from_secs(self.idle_pass_delay_secs)
    }

    pub fn empty_discovery_delay(&self) -> Duration {
        Duration::from_secs(self.empty_discovery_delay_secs)
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_secs(self.error_retry_delay_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// State persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Persist state to disk. When false state lives only in memory.
    pub enabled: bool,

    /// JSON state file.
    pub state_path: String,

    /// Autosave interval in seconds.
    pub autosave_interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_path: "server_state.json".to_string(),
            autosave_interval_secs: 60,
        }
    }
}

impl PersistenceConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// Profile discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Browser user-data directory scanned for profiles.
    pub user_data_dir: String,

    /// Fixed profile list; when non-empty the directory is not scanned.
    pub static_profiles: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            user_data_dir: "User Data".to_string(),
            static_profiles: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
