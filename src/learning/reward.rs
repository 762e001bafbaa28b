// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reward shaping and the shared learning pass.
//!
//! Both agents score a decision from two inputs: a per-action cost taken
//! from the agent's reward table, and the object's current frequency
//! class. The pass itself is identical for both and only differs in the
//! table and the replay order.

use tracing::debug;

use super::decision::{Decision, DecisionLog};
use super::q_store::QValueStore;
use crate::descriptor::FrequencyClass;

/// Admission reward per position ordinal (none, disk, ssd, disk+ssd,
/// memory, disk+memory, ssd+memory, all).
pub const ADMISSION_REWARD_TABLE: [f64; 8] = [6.0, 2.0, 1.0, 1.4, 0.0, 1.2, 0.4, 1.6];

/// Replacement reward per action (not evict, evict to lower tier, evict to none).
pub const REPLACEMENT_REWARD_TABLE: [f64; 3] = [0.0, 5.0, 6.0];

/// Table values above this are "drop the object" actions.
pub const HIGH_COST_THRESHOLD: f64 = 5.0;

/// Fixed reward for dropping an object nobody asks for.
pub const UNPOPULAR_DROP_REWARD: f64 = 0.667;

/// Rewards above 1 are reflected: `r' = pivot - r`.
pub const REFLECTION_PIVOT: f64 = 2.0;

/// Reward shaping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardShaping {
    pub high_cost_threshold: f64,
    pub unpopular_drop_reward: f64,
    pub reflection_pivot: f64,
}

impl RewardShaping {
    pub const DEFAULT: RewardShaping = RewardShaping {
        high_cost_threshold: HIGH_COST_THRESHOLD,
        unpopular_drop_reward: UNPOPULAR_DROP_REWARD,
        reflection_pivot: REFLECTION_PIVOT,
    };

    /// Combine a table value with the object's frequency class.
    #[must_use]
    pub fn reward(&self, table_value: f64, frequency: FrequencyClass) -> f64 {
        let ordinal = f64::from(frequency.ordinal());
        if table_value > self.high_cost_threshold && frequency == FrequencyClass::NotFamous {
            return self.unpopular_drop_reward;
        }
        let reward = (table_value + ordinal) / 3.0;
        if reward > 1.0 {
            self.reflection_pivot - reward
        } else {
            reward
        }
    }
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Order in which a pass replays the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOrder {
    OldestFirst,
    NewestFirst,
}

/// Outcome of one learning pass over one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassSummary {
    pub updated: usize,
    pub pruned: usize,
    /// Decisions whose object is no longer known; scored as not famous.
    pub unknown_objects: usize,
    pub mean_reward: f64,
}

/// Everything a pass needs besides the table and the log.
pub struct PassParams<'a> {
    /// Reward table value per action index.
    pub action_rewards: &'a [f64],
    pub shaping: RewardShaping,
    pub gamma: f64,
    pub order: ReplayOrder,
    pub max_decision_updates: u32,
}

/// Reward and update every pending decision, then prune spent ones.
pub fn run_pass(
    store: &mut QValueStore,
    log: &mut DecisionLog,
    params: &PassParams<'_>,
    frequency_of: &dyn Fn(&str) -> Option<FrequencyClass>,
) -> PassSummary {
    let mut summary = PassSummary::default();
    let mut reward_sum = 0.0;

    let mut apply = |decision: &mut Decision| {
        let frequency = frequency_of(&*decision.object_key).unwrap_or_else(|| {
            summary.unknown_objects += 1;
            FrequencyClass::NotFamous
        });
        let table_value = params.action_rewards.get(decision.action).copied().unwrap_or(0.0);
        let reward = params.shaping.reward(table_value, frequency);
        let value = store.update(
            decision.state,
            decision.next_state,
            decision.action,
            reward,
            params.gamma,
            &decision.eligible,
        );
        decision.reward = reward;
        decision.updates += 1;
        reward_sum += reward;
        summary.updated += 1;
        debug!(
            state = %decision.state,
            action = decision.action,
            reward,
            value,
            object = %decision.object_key,
            "Decision updated"
        );
    };

    match params.order {
        ReplayOrder::OldestFirst => log.iter_mut().for_each(&mut apply),
        ReplayOrder::NewestFirst => log.iter_mut().rev().for_each(&mut apply),
    }

    summary.pruned = log.prune(params.max_decision_updates);
    if summary.updated > 0 {
        summary.mean_reward = reward_sum / summary.updated as f64;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateKey;
    use std::sync::Arc;

    #[test]
    fn test_none_famous_reflects_to_negative() {
        let r = RewardShaping::DEFAULT.reward(ADMISSION_REWARD_TABLE[0], FrequencyClass::Famous);
        assert!((r - -1.0).abs() < 1e-12);
    }

    #[test]
    fn test_memory_unpopular_is_zero() {
        let r = RewardShaping::DEFAULT.reward(ADMISSION_REWARD_TABLE[4], FrequencyClass::NotFamous);
        assert_eq!(r, 0.0);
    }

    #[test]
    fn test_unpopular_drop_special_case() {
        let shaping = RewardShaping::DEFAULT;
        let r = shaping.reward(REPLACEMENT_REWARD_TABLE[2], FrequencyClass::NotFamous);
        assert_eq!(r, UNPOPULAR_DROP_REWARD);
        // 5.0 is not above the threshold
        let r = shaping.reward(REPLACEMENT_REWARD_TABLE[1], FrequencyClass::NotFamous);
        assert!((r - (2.0 - 5.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_no_reflection_at_or_below_one() {
        // (2.0 + 1) / 3 = 1.0
        let r =
            RewardShaping::DEFAULT.reward(ADMISSION_REWARD_TABLE[1], FrequencyClass::LessFamous);
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tuned_shaping() {
        let shaping = RewardShaping { reflection_pivot: 3.0, ..RewardShaping::DEFAULT };
        let r = shaping.reward(6.0, FrequencyClass::Famous);
        assert!((r - 0.0).abs() < 1e-12);
    }

    fn state(n: u8) -> StateKey {
        StateKey::encode([n, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap()
    }

    #[test]
    fn test_pass_updates_and_prunes() {
        let mut store = QValueStore::new(vec![0.0, 0.0, 0.0], 1.0);
        let mut log = DecisionLog::new(16);
        let eligible: Arc<[usize]> = Arc::from(vec![0, 1, 2]);
        log.push(Decision::new(state(0), Arc::from("/hot"), 2, eligible.clone()));
        log.push(Decision::new(state(1), Arc::from("/gone"), 2, eligible));

        let params = PassParams {
            action_rewards: &REPLACEMENT_REWARD_TABLE,
            shaping: RewardShaping::DEFAULT,
            gamma: 0.0,
            order: ReplayOrder::NewestFirst,
            max_decision_updates: 2,
        };
        let lookup = |key: &str| (key == "/hot").then_some(FrequencyClass::Famous);

        let first = run_pass(&mut store, &mut log, &params, &lookup);
        assert_eq!(first.updated, 2);
        assert_eq!(first.pruned, 0);
        assert_eq!(first.unknown_objects, 1);
        // alpha 1, gamma 0: value becomes the reward
        assert!((store.get_value(state(0), 2) - (2.0 - 3.0)).abs() < 1e-12);
        assert_eq!(store.get_value(state(1), 2), UNPOPULAR_DROP_REWARD);

        let second = run_pass(&mut store, &mut log, &params, &lookup);
        assert_eq!(second.pruned, 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_replay_order() {
        // With alpha 1 and gamma 1 the second update in a state sees the first.
        let mut store = QValueStore::new(vec![0.0, 0.0], 1.0);
        let mut log = DecisionLog::new(16);
        let eligible: Arc<[usize]> = Arc::from(vec![0, 1]);
        log.push(Decision::new(state(0), Arc::from("/a"), 0, eligible.clone()));
        log.push(Decision::new(state(0), Arc::from("/a"), 1, eligible));

        let params = PassParams {
            action_rewards: &[0.0, 0.3],
            shaping: RewardShaping::DEFAULT,
            gamma: 1.0,
            order: ReplayOrder::OldestFirst,
            max_decision_updates: 10,
        };
        let lookup = |_: &str| Some(FrequencyClass::NotFamous);
        run_pass(&mut store, &mut log, &params, &lookup);
        // action 0: 0 + 0 = 0; then action 1: 0.1 + max(0, 0) = 0.1
        assert_eq!(store.get_value(state(0), 0), 0.0);
        assert!((store.get_value(state(0), 1) - 0.1).abs() < 1e-12);

        let mut store_rev = QValueStore::new(vec![0.0, 0.0], 1.0);
        let params = PassParams { order: ReplayOrder::NewestFirst, ..params };
        run_pass(&mut store_rev, &mut log, &params, &lookup);
        // action 1 first: 0.1; then action 0: 0 + max(0, 0.1) = 0.1
        assert!((store_rev.get_value(state(0), 0) - 0.1).abs() < 1e-12);
    }
}
