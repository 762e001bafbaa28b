// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batched learning passes and the learning worker.
//!
//! Every `max_updates_before_learning` read/write events one pass is
//! scheduled. With a worker attached ([`CacheManager::run_learner`]) the pass
//! goes through a bounded queue; a full queue coalesces the request since a
//! queued pass already covers every pending decision. Without a worker the
//! pass runs on the blocking pool (or a short-lived thread outside a runtime).
//!
//! ```text
//! notify_update ──► updates ≥ max ──► try_send ──► run_learner ──► spawn_blocking(pass)
//!                                        │ full: coalesced
//!                                        └ no worker: detached pass
//! ```
//!
//! On shutdown the worker closes the queue and runs whatever is still in it
//! before reporting `Stopped`.
//!
//! Each agent is locked on its own for its share of the pass, so admission
//! and replacement updates never interleave and never block each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::types::LearnerState;
use super::CacheManager;
use crate::descriptor::ObjectRecord;
use crate::learning::{AdmissionAgent, DecisionAgent, PassSummary, ReplacementAgent};

/// Outcome of one learning pass over both agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningReport {
    pub admission: PassSummary,
    pub replacement: PassSummary,
    pub duration: Duration,
}

/// Everything a pass needs, detached from the manager's lifetime.
pub(super) struct LearningPass {
    admission: Arc<Mutex<AdmissionAgent>>,
    replacement: Arc<Mutex<ReplacementAgent>>,
    objects: Arc<DashMap<String, ObjectRecord>>,
    passes_completed: Arc<AtomicU64>,
}

impl LearningPass {
    fn run(&self) -> LearningReport {
        let start = Instant::now();
        let frequency_of = |key: &str| CacheManager::frequency_of(&self.objects, key);

        let admission = learn_agent(&mut *self.admission.lock(), &frequency_of);
        let replacement = learn_agent(&mut *self.replacement.lock(), &frequency_of);

        let duration = start.elapsed();
        let completed = self.passes_completed.fetch_add(1, Ordering::AcqRel) + 1;
        crate::metrics::record_learning_duration(duration);
        info!(
            pass = completed,
            admission_updated = admission.updated,
            admission_pruned = admission.pruned,
            replacement_updated = replacement.updated,
            replacement_pruned = replacement.pruned,
            duration_ms = duration.as_millis() as u64,
            "Learning pass complete"
        );

        LearningReport {
            admission,
            replacement,
            duration,
        }
    }
}

fn learn_agent<A: DecisionAgent>(
    agent: &mut A,
    frequency_of: &dyn Fn(&str) -> Option<crate::descriptor::FrequencyClass>,
) -> PassSummary {
    let summary = agent.learn(frequency_of);
    crate::metrics::record_learning_pass(
        agent.name(),
        summary.updated,
        summary.pruned,
        summary.mean_reward,
    );
    crate::metrics::set_pending_decisions(agent.name(), agent.pending_decisions());
    crate::metrics::set_q_table_states(agent.name(), agent.store().len());
    if summary.unknown_objects > 0 {
        debug!(
            agent = agent.name(),
            unknown_objects = summary.unknown_objects,
            "Decisions referenced objects no longer registered"
        );
    }
    summary
}

impl CacheManager {
    fn learning_pass(&self) -> LearningPass {
        LearningPass {
            admission: Arc::clone(&self.admission),
            replacement: Arc::clone(&self.replacement),
            objects: Arc::clone(&self.objects),
            passes_completed: Arc::clone(&self.passes_completed),
        }
    }

    /// Schedule a pass if the update counter reached its threshold.
    ///
    /// The counter is reset by whichever caller crosses the threshold, so
    /// one crossing schedules exactly one pass.
    pub(super) fn maybe_schedule_learning(&self) {
        let threshold = self.config.max_updates_before_learning;
        let crossed = self
            .updates
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n >= threshold).then_some(0)
            })
            .is_ok();
        if !crossed {
            return;
        }

        let pass = self.learning_pass();
        match self.learner_state() {
            LearnerState::Idle | LearnerState::Learning => match self.learning_tx.try_send(pass) {
                Ok(()) => {
                    crate::metrics::record_learning_scheduled("queued");
                    debug!("Learning pass queued");
                }
                Err(TrySendError::Full(_)) => {
                    crate::metrics::record_learning_scheduled("coalesced");
                    debug!("Learning queue full, pass coalesced with queued work");
                }
                Err(TrySendError::Closed(pass)) => {
                    crate::metrics::record_learning_scheduled("detached");
                    spawn_detached(pass);
                }
            },
            LearnerState::Detached | LearnerState::Stopped => {
                crate::metrics::record_learning_scheduled("detached");
                spawn_detached(pass);
            }
        }
    }

    /// Run one learning pass on the calling thread.
    pub fn run_learning_pass(&self) -> LearningReport {
        self.learning_pass().run()
    }

    /// Serve learning passes until [`shutdown`](Self::shutdown) is called.
    ///
    /// Only one worker can be attached; a second call returns immediately.
    #[tracing::instrument(skip(self))]
    pub async fn run_learner(self: Arc<Self>) {
        let receiver = self.learning_rx.lock().take();
        let Some(mut rx) = receiver else {
            warn!("Learning worker already attached");
            return;
        };
        let mut shutdown = self.shutdown.subscribe();
        self.set_learner_state(LearnerState::Idle);
        info!("Learning worker running");

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                pass = rx.recv() => {
                    let Some(pass) = pass else {
                        break;
                    };
                    self.set_learner_state(LearnerState::Learning);
                    serve_pass(pass).await;
                    self.set_learner_state(LearnerState::Idle);
                }
            }
        }

        // Later requests fail with Closed and run detached; finish what is queued.
        rx.close();
        let mut drained = 0usize;
        while let Ok(pass) = rx.try_recv() {
            self.set_learner_state(LearnerState::Learning);
            serve_pass(pass).await;
            drained += 1;
        }

        self.set_learner_state(LearnerState::Stopped);
        info!(drained, "Learning worker stopped");
    }

    /// Stop the learning worker. Passes already queued still run before it exits.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!("Cache manager shutdown requested");
    }

    #[must_use]
    pub fn learner_state(&self) -> LearnerState {
        *self.learner_state.borrow()
    }

    /// Subscribe to learning worker state changes.
    #[must_use]
    pub fn learner_state_receiver(&self) -> watch::Receiver<LearnerState> {
        self.learner_state.subscribe()
    }

    fn set_learner_state(&self, state: LearnerState) {
        self.learner_state.send_replace(state);
        crate::metrics::set_learner_state(&state.to_string());
    }
}

async fn serve_pass(pass: LearningPass) {
    if let Err(e) = tokio::task::spawn_blocking(move || pass.run()).await {
        error!(error = %e, "Learning pass failed");
    }
}

/// Run a pass off the calling thread without a worker.
fn spawn_detached(pass: LearningPass) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn_blocking(move || pass.run());
        return;
    }
    let spawned = std::thread::Builder::new()
        .name("tiering-learning-pass".to_string())
        .spawn(move || {
            pass.run();
        });
    if let Err(e) = spawned {
        error!(error = %e, "Failed to spawn learning pass thread");
    }
}
