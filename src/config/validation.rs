//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (percentages, hours, thresholds)
//! - Validate addresses before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RotatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RotatorConfig, SafetyConfig};

/// Ceiling for every delay-like safety setting: one week.
const MAX_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &RotatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = safety_errors(&config.safety);

    if config.admin.enabled {
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "must be a socket address"));
        }
        if config.admin.request_timeout_secs == 0 {
            errors.push(ValidationError::new("admin.request_timeout_secs", "must be at least 1"));
        }
    }

    if config.persistence.enabled {
        if config.persistence.state_path.trim().is_empty() {
            errors.push(ValidationError::new("persistence.state_path", "must not be empty"));
        }
        if config.persistence.autosave_interval_secs == 0 {
            errors.push(ValidationError::new("persistence.autosave_interval_secs", "must be at least 1"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "must be a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks for the hot-reloadable section alone.
pub fn validate_safety(safety: &SafetyConfig) -> Result<(), Vec<ValidationError>> {
    let errors = safety_errors(safety);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn safety_errors(safety: &SafetyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if safety.rotation_groups == 0 {
        errors.push(ValidationError::new("safety.rotation_groups", "must be at least 1"));
    }
    if safety.max_profiles_per_cycle == 0 {
        errors.push(ValidationError::new("safety.max_profiles_per_cycle", "must be at least 1"));
    }
    if safety.interaction_chance_pct > 100 {
        errors.push(ValidationError::new("safety.interaction_chance_pct", "must be between 0 and 100"));
    }
    if safety.long_break_chance_pct > 100 {
        errors.push(ValidationError::new("safety.long_break_chance_pct", "must be between 0 and 100"));
    }
    if safety.active_hours_start > 23 {
        errors.push(ValidationError::new("safety.active_hours_start", "must be an hour 0-23"));
    }
    if safety.active_hours_end > 23 {
        errors.push(ValidationError::new("safety.active_hours_end", "must be an hour 0-23"));
    }
    if safety.failure_quarantine_threshold == 0 {
        errors.push(ValidationError::new("safety.failure_quarantine_threshold", "must be at least 1"));
    }
    if safety.failure_backoff_base_secs == 0 {
        errors.push(ValidationError::new("safety.failure_backoff_base_secs", "must be at least 1"));
    }
    if safety.max_backoff_secs < safety.failure_backoff_base_secs {
        errors.push(ValidationError::new(
            "safety.max_backoff_secs",
            "must not be below failure_backoff_base_secs",
        ));
    }
    if safety.max_log_items == 0 {
        errors.push(ValidationError::new("safety.max_log_items", "must be at least 1"));
    }
    if safety.base_cycle_minutes > MAX_DELAY_SECS / 60 {
        errors.push(ValidationError::new(
            "safety.base_cycle_minutes",
            format!("must not exceed {}", MAX_DELAY_SECS / 60),
        ));
    }
    for (field, value) in [
        ("safety.min_delay_secs", safety.min_delay_secs),
        ("safety.jitter_secs", safety.jitter_secs),
        ("safety.long_break_max_secs", safety.long_break_max_secs),
    ] {
        if value > MAX_DELAY_SECS {
            errors.push(ValidationError::new(field, format!("must not exceed {MAX_DELAY_SECS}")));
        }
    }

    errors
}
