// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replacement agent: should this candidate leave its tier?

use std::sync::Arc;

use super::agent::{AgentCore, DecisionAgent};
use super::reward::{ReplayOrder, REPLACEMENT_REWARD_TABLE};
use crate::config::TieringConfig;
use crate::position::TierPosition;
use crate::state::StateKey;

pub const REPLACEMENT_ACTION_COUNT: usize = 3;

/// What to do with an eviction candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacementAction {
    NotEvict = 0,
    /// Drop from this tier, keep in a slower one.
    EvictToLowerTier = 1,
    /// Drop from every tier.
    EvictToNone = 2,
}

impl ReplacementAction {
    pub const ALL: [ReplacementAction; REPLACEMENT_ACTION_COUNT] = [
        ReplacementAction::NotEvict,
        ReplacementAction::EvictToLowerTier,
        ReplacementAction::EvictToNone,
    ];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_evict(self) -> bool {
        self != ReplacementAction::NotEvict
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReplacementAction::NotEvict => "not_evict",
            ReplacementAction::EvictToLowerTier => "evict_to_lower_tier",
            ReplacementAction::EvictToNone => "evict_to_none",
        }
    }
}

impl std::fmt::Display for ReplacementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether least-recent candidates should be evicted.
#[derive(Debug)]
pub struct ReplacementAgent {
    core: AgentCore,
    eligible: Arc<[usize]>,
}

impl ReplacementAgent {
    #[must_use]
    pub fn new(config: &TieringConfig) -> Self {
        Self {
            core: AgentCore::new(
                "replacement",
                config,
                config.replacement_initial_q.clone(),
                REPLACEMENT_REWARD_TABLE.to_vec(),
                ReplayOrder::NewestFirst,
            ),
            eligible: (0..REPLACEMENT_ACTION_COUNT).collect(),
        }
    }

    /// Judge one candidate currently at `current`.
    pub fn act(
        &mut self,
        state: StateKey,
        object_key: &Arc<str>,
        current: TierPosition,
    ) -> ReplacementAction {
        let Some(selection) = self.core.select_and_record(state, object_key, &self.eligible) else {
            return ReplacementAction::NotEvict;
        };
        if selection.value <= 0.0 {
            return ReplacementAction::NotEvict;
        }
        match ReplacementAction::from_index(selection.action) {
            // Memory-only objects are downgraded rather than dropped.
            Some(ReplacementAction::EvictToNone) if current == TierPosition::Memory => {
                ReplacementAction::EvictToLowerTier
            }
            Some(action) => action,
            None => ReplacementAction::NotEvict,
        }
    }
}

impl DecisionAgent for ReplacementAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }
}
