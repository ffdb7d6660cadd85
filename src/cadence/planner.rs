//! Inter-entity delay planning.
//!
//! ```text
//! base  = max(min_delay, target_cycle_secs / max(1, group_size))
//! delay = max(min_delay, base + uniform(-jitter, +jitter))
//! outside active hours: delay *= 1.5
//! ```

use std::time::Duration;

use crate::cadence::random::RandomSource;
use crate::config::SafetyConfig;

/// Window of local hours during which the fleet runs at full cadence.
///
/// `start <= end` covers `[start, end)`; `start > end` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHours {
    pub start: u32,
    pub end: u32,
}

impl ActiveHours {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Inputs to the delay computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceConfig {
    pub target_cycle_minutes: u64,
    pub min_delay_secs: u64,
    pub jitter_secs: u64,
    pub active_hours: ActiveHours,
}

impl From<&SafetyConfig> for CadenceConfig {
    fn from(safety: &SafetyConfig) -> Self {
        Self {
            target_cycle_minutes: safety.base_cycle_minutes,
            min_delay_secs: safety.min_delay_secs,
            jitter_secs: safety.jitter_secs,
            active_hours: ActiveHours {
                start: safety.active_hours_start,
                end: safety.active_hours_end,
            },
        }
    }
}

/// Delay to sleep after each entity of a group of `group_size`.
pub fn per_entity_delay(
    group_size: usize,
    config: &CadenceConfig,
    rng: &dyn RandomSource,
    local_hour: u32,
) -> Duration {
    let min_delay = saturating_i64(config.min_delay_secs);
    let spread = saturating_i64(config.target_cycle_minutes.saturating_mul(60) / group_size.max(1) as u64);
    let base = min_delay.max(spread);

    let jitter_bound = saturating_i64(config.jitter_secs);
    let jitter = rng.between(-jitter_bound, jitter_bound);

    // min_delay is non-negative, so the max is too.
    let mut delay = min_delay.max(base.saturating_add(jitter)).unsigned_abs();
    if !config.active_hours.contains(local_hour) {
        delay = delay.saturating_mul(3) / 2;
    }
    Duration::from_secs(delay)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Independent percentage draw: true with probability `pct`/100.
pub fn should_inject(rng: &dyn RandomSource, pct: u32) -> bool {
    rng.below(100) < u64::from(pct)
}
