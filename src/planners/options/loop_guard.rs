use std::collections::VecDeque;

use crate::infra::Action;

/// Identical consecutive actions that count as a loop.
pub const LOOP_WINDOW: usize = 3;

/// Recent actions emitted by an option's policy.
///
/// Once the last [`LOOP_WINDOW`] actions are identical the policy switches to
/// exact search for one tick; recording that tick's action starts a fresh window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopGuard {
    recent: VecDeque<Action>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_looping(&self) -> bool {
        self.recent.len() >= LOOP_WINDOW
            && self.recent.iter().all(|&action| Some(&action) == self.recent.front())
    }

    pub fn record(&mut self, action: Action) {
        if self.is_looping() {
            self.recent.clear();
        }
        self.recent.push_back(action);
        while self.recent.len() > LOOP_WINDOW {
            self.recent.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_identical_actions_trip_once() {
        let mut guard = LoopGuard::new();
        guard.record(Action::Left);
        guard.record(Action::Left);
        assert!(!guard.is_looping());
        guard.record(Action::Left);
        assert!(guard.is_looping());

        // The tick that used exact search resets the window
        guard.record(Action::Left);
        assert!(!guard.is_looping());
        guard.record(Action::Left);
        guard.record(Action::Left);
        assert!(guard.is_looping());
    }

    #[test]
    fn test_mixed_actions_never_trip() {
        let mut guard = LoopGuard::new();
        for action in [Action::Up, Action::Left, Action::Up, Action::Left, Action::Up] {
            guard.record(action);
            assert!(!guard.is_looping());
        }
    }
}
