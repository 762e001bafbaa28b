// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Tiering Engine
//!
//! Reinforcement-learning admission and replacement for multi-tier
//! (memory / SSD / disk) storage caches.
//!
//! Two independent Q-learning agents decide where objects live: the
//! admission agent picks the tier set for an incoming object, the
//! replacement agent picks which least-recently-used object leaves a full
//! tier. Both learn from the access patterns the host reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Host Storage                         │
//! │  • request_admission / request_replacement                  │
//! │  • notify_update(create | read | write | delete)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheManager                          │
//! │  • Object / type / directory registries (DashMap)           │
//! │  • Per-tier recency trackers                                │
//! │  • Atomic occupancy counters                                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  (9 features → 18-bit state key)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               AdmissionAgent / ReplacementAgent             │
//! │  • Sparse Q-value tables, greedy or stochastic selection    │
//! │  • Decision logs replayed in batched learning passes        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tiering_engine::{CacheEvent, CacheManager, Tier, TieringConfig};
//!
//! let manager = CacheManager::new(TieringConfig::default()).unwrap();
//!
//! let position = manager.request_admission("/media/clip.mp4", 2_000, false);
//! manager.notify_update(CacheEvent::Create, "/media/clip.mp4", 2_000, position, 0);
//! manager.notify_update(CacheEvent::Read, "/media/clip.mp4", 2_000, position, 0);
//!
//! if let Some(victim) = manager.request_replacement(Tier::Memory) {
//!     let keep_lower = manager.request_delete_or_downgrade(&victim);
//!     println!("evict {victim}, keep in a lower tier: {keep_lower}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`manager`]: The [`CacheManager`] orchestrating all components
//! - [`learning`]: Q-value store, decision log, reward shaping and both agents
//! - [`position`]: Tier-position algebra
//! - [`descriptor`]: Object, type and directory statistics
//! - [`state`]: State-key encoding
//! - [`recency`]: Per-tier LRU tracker
//! - [`config`]: Configuration and validation
//! - [`metrics`]: Metrics instrumentation

pub mod clock;
pub mod config;
pub mod descriptor;
pub mod learning;
pub mod manager;
pub mod metrics;
pub mod position;
pub mod recency;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Exploration, TieringConfig};
pub use descriptor::{FileType, FrequencyClass, RecencyClass, SizeClass};
pub use learning::{
    AdmissionAgent, DecisionAgent, PassSummary, ReplacementAction, ReplacementAgent,
    RewardShaping,
};
pub use manager::{
    CacheEvent, CacheManager, EventOutcome, IgnoreReason, LearnerState, LearningReport,
    ManagerStats, ObjectSnapshot,
};
pub use metrics::LatencyTimer;
pub use position::{Tier, TierPosition};
pub use recency::RecencyTracker;
pub use state::{EncodingError, StateFeatures, StateKey};
