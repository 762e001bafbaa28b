// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Admission agent: which tiers should an object live in?
//!
//! The learned choice is bent by two guardrails before it is returned:
//!
//! ```text
//!  select action ──► force-to-memory ──► read monotonicity ──► position
//!                    (cold start,         (never demote on
//!                     empty memory,        a plain read)
//!                     empty disk)
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use super::agent::{AgentCore, DecisionAgent};
use super::reward::{ReplayOrder, ADMISSION_REWARD_TABLE};
use crate::config::TieringConfig;
use crate::position::TierPosition;
use crate::state::StateKey;

/// Inputs for one admission decision.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub state: StateKey,
    pub object_key: Arc<str>,
    /// Where the object is now (`None` for a new object).
    pub current: TierPosition,
    /// Read requests never move an object to a slower tier.
    pub is_read: bool,
    pub memory_used_bytes: u64,
    pub disk_used_bytes: u64,
}

/// Decides the target position of admitted objects.
#[derive(Debug)]
pub struct AdmissionAgent {
    core: AgentCore,
    tiers: u8,
    positions: &'static [TierPosition],
    eligible: Arc<[usize]>,
    memory_threshold_bytes: u64,
    disk_threshold_bytes: u64,
}

impl AdmissionAgent {
    /// Build from a validated configuration.
    #[must_use]
    pub fn new(config: &TieringConfig) -> Self {
        let positions = TierPosition::valid_positions(config.tiers);
        let action_rewards = positions
            .iter()
            .map(|p| ADMISSION_REWARD_TABLE[p.bits() as usize])
            .collect();
        Self {
            core: AgentCore::new(
                "admission",
                config,
                config.admission_initial_q.clone(),
                action_rewards,
                ReplayOrder::OldestFirst,
            ),
            tiers: config.tiers,
            positions,
            eligible: (0..positions.len()).collect(),
            memory_threshold_bytes: config.memory_threshold_bytes(),
            disk_threshold_bytes: config.disk_threshold_bytes(),
        }
    }

    /// Position reached by action index `action`.
    #[must_use]
    pub fn position_of(&self, action: usize) -> Option<TierPosition> {
        self.positions.get(action).copied()
    }

    /// Choose where the object should live.
    pub fn act(&mut self, request: &AdmissionRequest) -> TierPosition {
        let Some(selection) =
            self.core
                .select_and_record(request.state, &request.object_key, &self.eligible)
        else {
            return request.current;
        };
        let mut chosen = self.position_of(selection.action).unwrap_or(TierPosition::None);

        let memory_starved = request.memory_used_bytes < self.memory_threshold_bytes;
        if selection.value <= 0.0 || !selection.state_existed || memory_starved {
            let with_memory = chosen.combine(TierPosition::Memory);
            if with_memory.is_valid_for(self.tiers) {
                chosen = with_memory;
            }
        } else if request.disk_used_bytes < self.disk_threshold_bytes
            && chosen.is_none()
            && TierPosition::Disk.is_valid_for(self.tiers)
        {
            chosen = TierPosition::Disk;
        }

        if request.is_read && chosen != request.current {
            match request.current.compare_highest(chosen) {
                Ordering::Greater => chosen = request.current,
                Ordering::Equal => {
                    let union = request.current.combine(chosen);
                    if union.is_valid_for(self.tiers) {
                        chosen = union;
                    }
                }
                Ordering::Less => {}
            }
        }

        chosen
    }
}

impl DecisionAgent for AdmissionAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FrequencyClass;

    fn state(n: u8) -> StateKey {
        StateKey::encode([n, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap()
    }

    fn config(tiers: u8) -> TieringConfig {
        TieringConfig {
            tiers,
            admission_initial_q: vec![0.5; TierPosition::valid_positions(tiers).len()],
            memory_capacity_bytes: 1_000,
            memory_threshold_percent: 50,
            disk_capacity_bytes: 10_000,
            disk_threshold_percent: 50,
            rng_seed: Some(1),
            ..Default::default()
        }
    }

    fn request(state: StateKey, current: TierPosition, is_read: bool) -> AdmissionRequest {
        AdmissionRequest {
            state,
            object_key: Arc::from("/a/b.txt"),
            current,
            is_read,
            // above both thresholds so only the learned value matters
            memory_used_bytes: 900,
            disk_used_bytes: 9_000,
        }
    }

    #[test]
    fn test_unseen_state_goes_to_memory() {
        let mut agent = AdmissionAgent::new(&config(3));
        let pos = agent.act(&request(state(0), TierPosition::None, false));
        assert!(pos.contains(crate::position::Tier::Memory));
        assert_eq!(agent.pending_decisions(), 1);
    }

    #[test]
    fn test_seen_state_follows_table() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        // make ssd (index 2) the clear winner
        agent.store_mut().set_value(s, 2, 3.0);
        assert_eq!(agent.act(&request(s, TierPosition::None, false)), TierPosition::Ssd);
    }

    #[test]
    fn test_non_positive_value_forces_memory() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        for a in 0..8 {
            agent.store_mut().set_value(s, a, -1.0);
        }
        agent.store_mut().set_value(s, 1, -0.1); // disk
        assert_eq!(agent.act(&request(s, TierPosition::None, false)), TierPosition::DiskMemory);
    }

    #[test]
    fn test_memory_starved_forces_memory() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        agent.store_mut().set_value(s, 2, 3.0);
        let mut req = request(s, TierPosition::None, false);
        req.memory_used_bytes = 100;
        assert_eq!(agent.act(&req), TierPosition::SsdMemory);
    }

    #[test]
    fn test_empty_disk_promotes_none() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        agent.store_mut().set_value(s, 0, 3.0); // none
        let mut req = request(s, TierPosition::None, false);
        req.disk_used_bytes = 10;
        assert_eq!(agent.act(&req), TierPosition::Disk);
        // disk full enough: none stays none
        assert_eq!(agent.act(&request(s, TierPosition::None, false)), TierPosition::None);
    }

    #[test]
    fn test_single_tier_cannot_promote_to_disk() {
        let mut agent = AdmissionAgent::new(&config(1));
        let s = state(1);
        agent.store_mut().set_value(s, 0, 3.0);
        let mut req = request(s, TierPosition::None, false);
        req.disk_used_bytes = 0;
        assert_eq!(agent.act(&req), TierPosition::None);
    }

    #[test]
    fn test_read_keeps_higher_current_tier() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        agent.store_mut().set_value(s, 1, 3.0); // disk
        let pos = agent.act(&request(s, TierPosition::SsdMemory, true));
        assert_eq!(pos, TierPosition::SsdMemory);
    }

    #[test]
    fn test_read_unions_on_tie() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        agent.store_mut().set_value(s, 6, 3.0); // ssd+memory
        let pos = agent.act(&request(s, TierPosition::DiskMemory, true));
        assert_eq!(pos, TierPosition::DiskSsdMemory);
    }

    #[test]
    fn test_read_allows_promotion() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(1);
        agent.store_mut().set_value(s, 4, 3.0); // memory
        assert_eq!(agent.act(&request(s, TierPosition::Disk, true)), TierPosition::Memory);
    }

    #[test]
    fn test_two_tier_action_mapping() {
        let agent = AdmissionAgent::new(&config(2));
        assert_eq!(agent.position_of(0), Some(TierPosition::None));
        assert_eq!(agent.position_of(1), Some(TierPosition::Disk));
        assert_eq!(agent.position_of(2), Some(TierPosition::Memory));
        assert_eq!(agent.position_of(3), Some(TierPosition::DiskMemory));
        assert_eq!(agent.position_of(4), None);
    }

    #[test]
    fn test_learning_moves_values() {
        let mut agent = AdmissionAgent::new(&config(3));
        let s = state(2);
        agent.store_mut().set_value(s, 0, 3.0);
        agent.act(&request(s, TierPosition::None, false));
        let summary = agent.learn(&|_| Some(FrequencyClass::Famous));
        assert_eq!(summary.updated, 1);
        // none + famous = -1 reward, so the value of "none" must drop
        assert!(agent.store().row(s).map_or(false, |r| r[0] < 3.0));
    }
}
