// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Q-learning agents.
//!
//! Each agent owns a [`QValueStore`] and a [`DecisionLog`]. Decisions are
//! logged as they are made and rewarded later, in batches, by a learning
//! pass:
//!
//! ```text
//! act() ──► Decision ──► DecisionLog ──(learning pass)──► reward ──► Q update ──► prune
//! ```

pub mod admission;
pub mod agent;
pub mod decision;
pub mod q_store;
pub mod replacement;
pub mod reward;

pub use admission::{AdmissionAgent, AdmissionRequest};
pub use agent::{AgentCore, DecisionAgent, Selection};
pub use decision::{Decision, DecisionLog};
pub use q_store::QValueStore;
pub use replacement::{ReplacementAction, ReplacementAgent, REPLACEMENT_ACTION_COUNT};
pub use reward::{
    PassSummary, ReplayOrder, RewardShaping, ADMISSION_REWARD_TABLE, HIGH_COST_THRESHOLD,
    REFLECTION_PIVOT, REPLACEMENT_REWARD_TABLE, UNPOPULAR_DROP_REWARD,
};
