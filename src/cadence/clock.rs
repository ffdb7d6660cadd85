//! Wall-clock access.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Timelike;

/// Whole seconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of the current time for the scheduling engine.
pub trait Clock: Send + Sync {
    /// Current time as epoch seconds.
    fn now(&self) -> Timestamp;

    /// Hour of the day (0-23) in the operator's local time zone.
    fn local_hour(&self) -> u32;
}

/// Clock backed by the system time and local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
    hour: AtomicU32,
}

impl ManualClock {
    pub fn new(now: Timestamp, local_hour: u32) -> Self {
        Self {
            now: AtomicU64::new(now),
            hour: AtomicU32::new(local_hour % 24),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
