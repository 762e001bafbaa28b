// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Decisions awaiting reward.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::state::StateKey;

/// One action taken by an agent, replayed by later learning passes.
#[derive(Debug, Clone)]
pub struct Decision {
    pub state: StateKey,
    /// Same as `state`: the engine observes no transition.
    pub next_state: StateKey,
    pub object_key: Arc<str>,
    pub action: usize,
    /// Reward assigned by the most recent pass.
    pub reward: f64,
    pub eligible: Arc<[usize]>,
    pub created_at: Instant,
    /// Value updates applied so far.
    pub updates: u32,
}

impl Decision {
    #[must_use]
    pub fn new(
        state: StateKey,
        object_key: Arc<str>,
        action: usize,
        eligible: Arc<[usize]>,
    ) -> Self {
        Self {
            state,
            next_state: state,
            object_key,
            action,
            reward: 0.0,
            eligible,
            created_at: Instant::now(),
            updates: 0,
        }
    }
}

/// Bounded FIFO of pending decisions.
#[derive(Debug)]
pub struct DecisionLog {
    entries: VecDeque<Decision>,
    capacity: usize,
    dropped: u64,
}

impl DecisionLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append a decision, returning the oldest one if it had to make room.
    pub fn push(&mut self, decision: Decision) -> Option<Decision> {
        let evicted = if self.entries.len() >= self.capacity {
            self.dropped += 1;
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(decision);
        evicted
    }

    /// Oldest first.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Decision> {
        self.entries.iter_mut()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Decision> {
        self.entries.iter()
    }

    /// Remove decisions that have received `max_updates` updates; returns how many.
    pub fn prune(&mut self, max_updates: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|d| d.updates < max_updates);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decisions discarded because the log was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(action: usize) -> Decision {
        let state = StateKey::encode([0; 9]).unwrap();
        Decision::new(state, Arc::from("/k"), action, Arc::from(vec![0, 1, 2]))
    }

    #[test]
    fn test_new_decision_shape() {
        let d = decision(1);
        assert_eq!(d.state, d.next_state);
        assert_eq!(d.updates, 0);
        assert_eq!(d.reward, 0.0);
        assert_eq!(&*d.object_key, "/k");
    }

    #[test]
    fn test_bounded_push_drops_oldest() {
        let mut log = DecisionLog::new(2);
        assert!(log.push(decision(0)).is_none());
        assert!(log.push(decision(1)).is_none());
        let evicted = log.push(decision(2)).unwrap();
        assert_eq!(evicted.action, 0);
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 1);
        let actions: Vec<_> = log.iter().map(|d| d.action).collect();
        assert_eq!(actions, vec![1, 2]);
    }

    #[test]
    fn test_prune() {
        let mut log = DecisionLog::new(10);
        log.push(decision(0));
        log.push(decision(1));
        if let Some(d) = log.iter_mut().next() {
            d.updates = 3;
        }
        assert_eq!(log.prune(3), 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.iter().next().map(|d| d.action), Some(1));
    }
}
