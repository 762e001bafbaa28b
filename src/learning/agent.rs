// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shared decision-agent machinery.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::decision::{Decision, DecisionLog};
use super::q_store::QValueStore;
use super::reward::{run_pass, PassParams, PassSummary, ReplayOrder, RewardShaping};
use crate::config::{Exploration, TieringConfig};
use crate::descriptor::FrequencyClass;
use crate::state::StateKey;

/// Table, log and selection policy shared by both agents.
#[derive(Debug)]
pub struct AgentCore {
    store: QValueStore,
    log: DecisionLog,
    action_rewards: Vec<f64>,
    shaping: RewardShaping,
    gamma: f64,
    order: ReplayOrder,
    max_decision_updates: u32,
    exploration: Exploration,
    rng: StdRng,
    name: &'static str,
}

/// An action chosen for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub action: usize,
    pub value: f64,
    /// Whether the state had a row before this selection.
    pub state_existed: bool,
}

impl AgentCore {
    pub(crate) fn new(
        name: &'static str,
        config: &TieringConfig,
        initial_q: Vec<f64>,
        action_rewards: Vec<f64>,
        order: ReplayOrder,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store: QValueStore::new(initial_q, config.alpha),
            log: DecisionLog::new(config.decision_log_capacity),
            action_rewards,
            shaping: RewardShaping::DEFAULT,
            gamma: config.gamma,
            order,
            max_decision_updates: config.max_decision_updates,
            exploration: config.exploration,
            rng,
            name,
        }
    }

    /// Pick an action for `state` and log the decision.
    ///
    /// Returns `None` only when `eligible` is empty.
    pub(crate) fn select_and_record(
        &mut self,
        state: StateKey,
        object_key: &Arc<str>,
        eligible: &Arc<[usize]>,
    ) -> Option<Selection> {
        let state_existed = self.store.has_state(state);
        let (action, value) = match self.exploration {
            Exploration::Greedy => self.store.select_greedy(state, eligible)?,
            Exploration::Stochastic => {
                self.store.select_stochastic(state, eligible, &mut self.rng)?
            }
        };
        let decision = Decision::new(state, Arc::clone(object_key), action, Arc::clone(eligible));
        if let Some(dropped) = self.log.push(decision) {
            debug!(
                agent = self.name,
                object = %dropped.object_key,
                "Decision log full, dropped oldest decision"
            );
        }
        Some(Selection {
            action,
            value,
            state_existed,
        })
    }

    pub(crate) fn learn(
        &mut self,
        frequency_of: &dyn Fn(&str) -> Option<FrequencyClass>,
    ) -> PassSummary {
        let params = PassParams {
            action_rewards: &self.action_rewards,
            shaping: self.shaping,
            gamma: self.gamma,
            order: self.order,
            max_decision_updates: self.max_decision_updates,
        };
        run_pass(&mut self.store, &mut self.log, &params, frequency_of)
    }

    pub(crate) fn set_shaping(&mut self, shaping: RewardShaping) {
        self.shaping = shaping;
    }
}

/// Common surface of the admission and replacement agents.
///
/// Implementors expose their [`AgentCore`]; the rest comes for free.
pub trait DecisionAgent {
    fn core(&self) -> &AgentCore;
    fn core_mut(&mut self) -> &mut AgentCore;

    /// Name used in logs and metrics.
    fn name(&self) -> &'static str {
        self.core().name
    }

    fn store(&self) -> &QValueStore {
        &self.core().store
    }

    fn store_mut(&mut self) -> &mut QValueStore {
        &mut self.core_mut().store
    }

    fn pending_decisions(&self) -> usize {
        self.core().log.len()
    }

    /// Decisions dropped because the log was full.
    fn dropped_decisions(&self) -> u64 {
        self.core().log.dropped()
    }

    fn pending(&self) -> Vec<Decision> {
        self.core().log.iter().cloned().collect()
    }

    /// Forget all pending decisions.
    fn clear_history(&mut self) {
        self.core_mut().log.clear();
    }

    /// Reward and update every pending decision, then prune spent ones.
    ///
    /// `frequency_of` resolves an object key to its current frequency class.
    fn learn(&mut self, frequency_of: &dyn Fn(&str) -> Option<FrequencyClass>) -> PassSummary {
        self.core_mut().learn(frequency_of)
    }

    fn set_reward_shaping(&mut self, shaping: RewardShaping) {
        self.core_mut().set_shaping(shaping);
    }
}
