// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the tiering engine.
//!
//! # Example
//!
//! ```
//! use tiering_engine::TieringConfig;
//!
//! // Minimal config (uses defaults)
//! let config = TieringConfig::default();
//! assert_eq!(config.tiers, 3);
//! assert!(config.validate().is_ok());
//!
//! // Two-tier deployment with a smaller memory tier
//! let config = TieringConfig {
//!     tiers: 2,
//!     admission_initial_q: vec![0.5; 4],
//!     memory_capacity_bytes: 64 * 1024 * 1024,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! // From JSON; omitted fields take their defaults
//! let config = TieringConfig::from_json_str(r#"{ "alpha": 0.2, "gamma": 0.8 }"#).unwrap();
//! assert_eq!(config.alpha, 0.2);
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::learning::replacement::REPLACEMENT_ACTION_COUNT;
use crate::position::TierPosition;

/// How an agent picks among eligible actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exploration {
    /// Highest value wins, first one on ties.
    #[default]
    Greedy,
    /// Sample proportionally to value.
    Stochastic,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("tier count must be 1, 2 or 3, got {0}")]
    TierCount(u8),
    #[error("{agent} initial Q vector has {actual} entries, expected {expected}")]
    InitialQLength {
        agent: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{agent} initial Q vector contains a non-finite value")]
    InitialQNotFinite { agent: &'static str },
    #[error("alpha must be in (0, 1], got {0}")]
    Alpha(f64),
    #[error("gamma must be in [0, 1], got {0}")]
    Gamma(f64),
    #[error("{name} threshold must be at most 100 percent, got {value}")]
    ThresholdPercent { name: &'static str, value: u8 },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the tiering engine.
///
/// Every field has a default. [`validate`](Self::validate) runs at manager
/// construction and rejects anything the agents could not work with.
#[derive(Debug, Clone, Deserialize)]
pub struct TieringConfig {
    /// Number of physical tiers: 1 (memory), 2 (memory + disk) or 3.
    #[serde(default = "default_tiers")]
    pub tiers: u8,

    /// Seed values for a fresh admission row, one per valid position.
    #[serde(default = "default_admission_initial_q")]
    pub admission_initial_q: Vec<f64>,

    /// Seed values for a fresh replacement row: not evict, evict to lower, evict to none.
    #[serde(default = "default_replacement_initial_q")]
    pub replacement_initial_q: Vec<f64>,

    /// Learning rate.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Discount factor.
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    #[serde(default = "default_memory_capacity_bytes")]
    pub memory_capacity_bytes: u64,

    /// Below this occupancy (percent of capacity) admission forces memory.
    #[serde(default = "default_memory_threshold_percent")]
    pub memory_threshold_percent: u8,

    #[serde(default = "default_disk_capacity_bytes")]
    pub disk_capacity_bytes: u64,

    /// Below this occupancy (percent of capacity) "none" is promoted to disk.
    #[serde(default = "default_disk_threshold_percent")]
    pub disk_threshold_percent: u8,

    /// Read/write events between learning passes.
    #[serde(default = "default_max_updates_before_learning")]
    pub max_updates_before_learning: usize,

    /// Value updates a decision receives before it is pruned.
    #[serde(default = "default_max_decision_updates")]
    pub max_decision_updates: u32,

    /// Least-recent candidates examined per replacement request.
    #[serde(default = "default_max_recency_scan")]
    pub max_recency_scan: usize,

    #[serde(default)]
    pub exploration: Exploration,

    /// Pending decisions kept per agent; the oldest is dropped beyond this.
    #[serde(default = "default_decision_log_capacity")]
    pub decision_log_capacity: usize,

    /// Scheduled learning passes that may wait for the worker.
    #[serde(default = "default_learning_queue_capacity")]
    pub learning_queue_capacity: usize,

    /// Fixed seed for stochastic exploration (entropy when unset).
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_tiers() -> u8 {
    3
}
fn default_admission_initial_q() -> Vec<f64> {
    vec![0.5; TierPosition::ALL.len()]
}
fn default_replacement_initial_q() -> Vec<f64> {
    vec![0.5; REPLACEMENT_ACTION_COUNT]
}
fn default_alpha() -> f64 {
    0.1
}
fn default_gamma() -> f64 {
    0.9
}
fn default_memory_capacity_bytes() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}
fn default_memory_threshold_percent() -> u8 {
    50
}
fn default_disk_capacity_bytes() -> u64 {
    100 * 1024 * 1024 * 1024 // 100 GB
}
fn default_disk_threshold_percent() -> u8 {
    80
}
fn default_max_updates_before_learning() -> usize {
    1000
}
fn default_max_decision_updates() -> u32 {
    5
}
fn default_max_recency_scan() -> usize {
    16
}
fn default_decision_log_capacity() -> usize {
    100_000
}
fn default_learning_queue_capacity() -> usize {
    4
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            admission_initial_q: default_admission_initial_q(),
            replacement_initial_q: default_replacement_initial_q(),
            alpha: default_alpha(),
            gamma: default_gamma(),
            memory_capacity_bytes: default_memory_capacity_bytes(),
            memory_threshold_percent: default_memory_threshold_percent(),
            disk_capacity_bytes: default_disk_capacity_bytes(),
            disk_threshold_percent: default_disk_threshold_percent(),
            max_updates_before_learning: default_max_updates_before_learning(),
            max_decision_updates: default_max_decision_updates(),
            max_recency_scan: default_max_recency_scan(),
            exploration: Exploration::default(),
            decision_log_capacity: default_decision_log_capacity(),
            learning_queue_capacity: default_learning_queue_capacity(),
            rng_seed: None,
        }
    }
}

impl TieringConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TieringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.tiers) {
            return Err(ConfigError::TierCount(self.tiers));
        }
        check_initial_q("admission", &self.admission_initial_q, self.admission_action_count())?;
        check_initial_q("replacement", &self.replacement_initial_q, REPLACEMENT_ACTION_COUNT)?;
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::Alpha(self.alpha));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Gamma(self.gamma));
        }
        if self.memory_threshold_percent > 100 {
            return Err(ConfigError::ThresholdPercent {
                name: "memory",
                value: self.memory_threshold_percent,
            });
        }
        if self.disk_threshold_percent > 100 {
            return Err(ConfigError::ThresholdPercent {
                name: "disk",
                value: self.disk_threshold_percent,
            });
        }
        if self.max_updates_before_learning == 0 {
            return Err(ConfigError::Zero("max_updates_before_learning"));
        }
        if self.max_decision_updates == 0 {
            return Err(ConfigError::Zero("max_decision_updates"));
        }
        if self.max_recency_scan == 0 {
            return Err(ConfigError::Zero("max_recency_scan"));
        }
        if self.decision_log_capacity == 0 {
            return Err(ConfigError::Zero("decision_log_capacity"));
        }
        if self.learning_queue_capacity == 0 {
            return Err(ConfigError::Zero("learning_queue_capacity"));
        }
        Ok(())
    }

    /// Admission actions for the configured tier count.
    #[must_use]
    pub fn admission_action_count(&self) -> usize {
        TierPosition::valid_positions(self.tiers).len()
    }

    /// Memory occupancy in bytes below which admission forces memory.
    #[must_use]
    pub fn memory_threshold_bytes(&self) -> u64 {
        percent_of(self.memory_capacity_bytes, self.memory_threshold_percent)
    }

    /// Disk occupancy in bytes below which "none" is promoted to disk.
    #[must_use]
    pub fn disk_threshold_bytes(&self) -> u64 {
        percent_of(self.disk_capacity_bytes, self.disk_threshold_percent)
    }
}

fn check_initial_q(
    agent: &'static str,
    values: &[f64],
    expected: usize,
) -> Result<(), ConfigError> {
    if values.len() != expected {
        return Err(ConfigError::InitialQLength {
            agent,
            expected,
            actual: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::InitialQNotFinite { agent });
    }
    Ok(())
}

fn percent_of(capacity: u64, percent: u8) -> u64 {
    (u128::from(capacity) * u128::from(percent) / 100) as u64
}
