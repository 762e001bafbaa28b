// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sparse Q-value table.
//!
//! Rows are created on first use and seeded from a fixed vector. Each row
//! carries its own per-action learning rates so they can be reset globally
//! without touching the values.

use std::collections::HashMap;

use rand::Rng;

use crate::state::StateKey;

#[derive(Debug, Clone, PartialEq)]
struct Row {
    values: Vec<f64>,
    alphas: Vec<f64>,
}

/// Q-values for one agent.
#[derive(Debug, Clone)]
pub struct QValueStore {
    initial: Vec<f64>,
    alpha: f64,
    rows: HashMap<StateKey, Row>,
}

impl QValueStore {
    /// A store whose rows start as `initial` with learning rate `alpha`.
    #[must_use]
    pub fn new(initial: Vec<f64>, alpha: f64) -> Self {
        Self {
            initial,
            alpha,
            rows: HashMap::new(),
        }
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.initial.len()
    }

    fn row_mut(&mut self, state: StateKey) -> &mut Row {
        let (initial, alpha) = (&self.initial, self.alpha);
        self.rows.entry(state).or_insert_with(|| Row {
            values: initial.clone(),
            alphas: vec![alpha; initial.len()],
        })
    }

    /// Value of `action` in `state`, seeding the row if needed.
    ///
    /// Out-of-range actions read as zero.
    pub fn get_value(&mut self, state: StateKey, action: usize) -> f64 {
        debug_assert!(action < self.action_count());
        self.row_mut(state).values.get(action).copied().unwrap_or(0.0)
    }

    pub fn set_value(&mut self, state: StateKey, action: usize, value: f64) {
        debug_assert!(action < self.action_count());
        if let Some(slot) = self.row_mut(state).values.get_mut(action) {
            *slot = value;
        }
    }

    /// Learning rate of `action` in `state`, seeding the row if needed.
    pub fn get_alpha(&mut self, state: StateKey, action: usize) -> f64 {
        let alpha = self.alpha;
        self.row_mut(state).alphas.get(action).copied().unwrap_or(alpha)
    }

    /// Whether `state` has been seen, without seeding it.
    #[must_use]
    pub fn has_state(&self, state: StateKey) -> bool {
        self.rows.contains_key(&state)
    }

    /// Current values of `state`, if seen.
    #[must_use]
    pub fn row(&self, state: StateKey) -> Option<&[f64]> {
        self.rows.get(&state).map(|r| r.values.as_slice())
    }

    /// Number of seen states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highest-valued eligible action. Ties go to the earliest in `eligible`.
    ///
    /// Returns `None` only when `eligible` is empty.
    pub fn select_greedy(&mut self, state: StateKey, eligible: &[usize]) -> Option<(usize, f64)> {
        let values = &self.row_mut(state).values;
        let mut best: Option<(usize, f64)> = None;
        for &action in eligible {
            let Some(&value) = values.get(action) else { continue };
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((action, value)),
            }
        }
        best
    }

    /// Sample an eligible action with probability proportional to its value.
    ///
    /// Negative values carry no weight. When nothing has positive weight the
    /// choice falls back to [`select_greedy`](Self::select_greedy).
    pub fn select_stochastic<R: Rng + ?Sized>(
        &mut self,
        state: StateKey,
        eligible: &[usize],
        rng: &mut R,
    ) -> Option<(usize, f64)> {
        let values = &self.row_mut(state).values;
        let weights: Vec<(usize, f64)> = eligible
            .iter()
            .filter_map(|&a| values.get(a).map(|&v| (a, v)))
            .collect();
        let total: f64 = weights.iter().map(|&(_, v)| v.max(0.0)).sum();
        if !(total > 0.0 && total.is_finite()) {
            return self.select_greedy(state, eligible);
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for &(action, value) in &weights {
            cumulative += value.max(0.0);
            if target < cumulative {
                return Some((action, value));
            }
        }
        // Rounding left the target at the very top; take the last weighted action.
        weights.iter().rev().find(|&&(_, v)| v > 0.0).copied()
    }

    /// Highest eligible value in `state`, seeding the row if needed.
    pub fn max_value(&mut self, state: StateKey, eligible: &[usize]) -> f64 {
        self.select_greedy(state, eligible).map_or(0.0, |(_, v)| v)
    }

    /// One Q-learning step; returns the new value.
    ///
    /// `Q(s,a) += alpha(s,a) * (reward + gamma * max Q(s',.) - Q(s,a))`
    pub fn update(
        &mut self,
        state: StateKey,
        next_state: StateKey,
        action: usize,
        reward: f64,
        gamma: f64,
        eligible: &[usize],
    ) -> f64 {
        let future = self.max_value(next_state, eligible);
        let current = self.get_value(state, action);
        let alpha = self.get_alpha(state, action);
        let updated = current + alpha * (reward + gamma * future - current);
        self.set_value(state, action, updated);
        updated
    }

    /// Set the learning rate of every row, and of rows created later.
    pub fn reset_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
        for row in self.rows.values_mut() {
            row.alphas.fill(alpha);
        }
    }

    /// Overwrite every row with `initial`, which also becomes the new seed.
    ///
    /// Ignored when the length does not match the action count.
    pub fn reset_values(&mut self, initial: &[f64]) {
        if initial.len() != self.initial.len() {
            return;
        }
        self.initial = initial.to_vec();
        for row in self.rows.values_mut() {
            row.values.copy_from_slice(initial);
        }
    }
}
