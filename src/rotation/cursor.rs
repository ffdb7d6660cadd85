//! Round-robin rotation cursor.

use crate::cadence::Timestamp;

/// How a pass picks its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSelection {
    /// Consume the next group (background rotation).
    Advance,
    /// Look at the next group without consuming it (on-demand passes, dashboards).
    Peek,
}

impl GroupSelection {
    pub fn label(&self) -> &'static str {
        match self {
            GroupSelection::Advance => "ROTATION",
            GroupSelection::Peek => "SAFE_REFRESH",
        }
    }
}

/// A selected group index together with the group count it was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSlot {
    pub index: usize,
    pub group_count: usize,
}

/// Persistent rotation cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    /// Number of rotation groups (at least 1).
    pub group_count: u32,
    /// Last consumed group, -1 before the first cycle.
    pub last_group_index: i64,
    /// Start time of the last consumed cycle.
    pub last_cycle_started_at: Timestamp,
}

impl RotationState {
    pub fn new(group_count: u32) -> Self {
        Self {
            group_count: group_count.max(1),
            last_group_index: -1,
            last_cycle_started_at: 0,
        }
    }

    /// Index the next advance would return.
    pub fn peek_next(&self) -> usize {
        let n = i64::from(self.group_count.max(1));
        (self.last_group_index + 1).rem_euclid(n) as usize
    }

    /// Consume the next group and stamp the cycle start.
    pub fn advance(&mut self, now: Timestamp) -> usize {
        let next = self.peek_next();
        self.last_group_index = next as i64;
        self.last_cycle_started_at = self.last_cycle_started_at.max(now);
        next
    }

    pub fn select(&mut self, selection: GroupSelection, now: Timestamp) -> GroupSlot {
        let index = match selection {
            GroupSelection::Advance => self.advance(now),
            GroupSelection::Peek => self.peek_next(),
        };
        GroupSlot {
            index,
            group_count: self.group_count.max(1) as usize,
        }
    }

    /// Last consumed group, if any cycle has run.
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.last_group_index).ok()
    }

    /// Bring externally supplied values back into range.
    pub fn clamped(self) -> Self {
        let group_count = self.group_count.max(1);
        Self {
            group_count,
            last_group_index: self.last_group_index.clamp(-1, i64::from(group_count) - 1),
            last_cycle_started_at: self.last_cycle_started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let mut state = RotationState::new(3);
        let indices: Vec<usize> = (0..4).map(|t| state.advance(t)).collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(state.last_cycle_started_at, 3);
    }

    #[test]
    fn test_full_revolution_returns_to_start() {
        let mut state = RotationState::new(5);
        state.advance(10);
        let start = state.last_group_index;
        for t in 0..5 {
            state.advance(20 + t);
        }
        assert_eq!(state.last_group_index, start);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut state = RotationState::new(3);
        let slot = state.select(GroupSelection::Peek, 99);
        assert_eq!(slot, GroupSlot { index: 0, group_count: 3 });
        assert_eq!(state, RotationState::new(3));

        state.select(GroupSelection::Advance, 100);
        assert_eq!(state.select(GroupSelection::Peek, 101).index, 1);
        assert_eq!(state.current_index(), Some(0));
    }

    #[test]
    fn test_cycle_stamp_never_decreases() {
        let mut state = RotationState::new(2);
        state.advance(500);
        state.advance(400);
        assert_eq!(state.last_cycle_started_at, 500);
    }

    #[test]
    fn test_clamped() {
        let wild = RotationState {
            group_count: 0,
            last_group_index: 7,
            last_cycle_started_at: 3,
        };
        assert_eq!(
            wild.clamped(),
            RotationState { group_count: 1, last_group_index: 0, last_cycle_started_at: 3 }
        );

        let negative = RotationState { group_count: 3, last_group_index: -9, last_cycle_started_at: 0 };
        assert_eq!(negative.clamped().last_group_index, -1);
        assert_eq!(negative.clamped().current_index(), None);
    }
}
