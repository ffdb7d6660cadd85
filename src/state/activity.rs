//! Bounded activity journal.

use std::collections::VecDeque;

use chrono::TimeZone;
use serde::Serialize;

use crate::cadence::Timestamp;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub at: Timestamp,
    pub message: String,
}

impl ActivityEntry {
    /// `[YYYY-MM-DD HH:MM:SS] message` in local time.
    pub fn render(&self) -> String {
        match chrono::Local.timestamp_opt(self.at as i64, 0).single() {
            Some(at) => format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), self.message),
            None => format!("[{}] {}", self.at, self.message),
        }
    }
}

/// FIFO journal that drops the oldest entries beyond `capacity`.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry; it is mirrored to `tracing` under the `activity` target.
    pub fn push(&mut self, at: Timestamp, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "profile_rotator::activity", "{message}");
        self.entries.push_back(ActivityEntry { at, message });
        self.trim();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_dropped_first() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.push(i, format!("event {i}"));
        }
        assert_eq!(log.len(), 3);
        let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn test_shrinking_capacity_trims() {
        let mut log = ActivityLog::new(10);
        for i in 0..10 {
            log.push(i, "x");
        }
        log.set_capacity(4);
        assert_eq!(log.len(), 4);
        assert_eq!(log.entries()[0].at, 6);
    }

    #[test]
    fn test_render_has_timestamp_prefix() {
        let entry = ActivityEntry { at: 1_700_000_000, message: "Saved state to disk.".into() };
        let line = entry.render();
        assert!(line.starts_with("[20"));
        assert!(line.ends_with("] Saved state to disk."));
    }
}
