// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Workload simulation example.
//!
//! Demonstrates:
//! 1. Configuring a three-tier engine with a small memory tier
//! 2. Attaching the learning worker
//! 3. Replaying a skewed read workload (hot / warm / cold directories)
//! 4. Evicting from memory with replacement + delete-or-downgrade
//! 5. Displaying engine stats and metrics
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! cargo run --example workload_simulation
//! ```

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiering_engine::{
    CacheEvent, CacheManager, Exploration, LearnerState, Tier, TierPosition, TieringConfig,
};

const OPERATIONS: usize = 20_000;
const MEMORY_CAPACITY: u64 = 256 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for export)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║         tiering-engine: Workload Simulation Example           ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure the engine
    // ─────────────────────────────────────────────────────────────────────────
    let config = TieringConfig {
        memory_capacity_bytes: MEMORY_CAPACITY,
        memory_threshold_percent: 50,
        disk_capacity_bytes: 64 * 1024 * 1024,
        disk_threshold_percent: 80,
        max_updates_before_learning: 500,
        exploration: Exploration::Stochastic,
        rng_seed: Some(42),
        ..Default::default()
    };
    let manager = Arc::new(CacheManager::new(config)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Attach the learning worker
    // ─────────────────────────────────────────────────────────────────────────
    let mut state_rx = manager.learner_state_receiver();
    let worker = tokio::spawn(Arc::clone(&manager).run_learner());
    state_rx.wait_for(|s| *s == LearnerState::Idle).await?;
    println!("🧠 Learning worker: {}", manager.learner_state());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Replay the workload
    // ─────────────────────────────────────────────────────────────────────────
    let catalog = build_catalog();
    let mut rng = StdRng::seed_from_u64(7);
    let mut hits = 0_usize;
    let mut evictions = 0_usize;

    for _ in 0..OPERATIONS {
        let (key, size) = pick(&catalog, &mut rng);

        let placed = manager
            .object(key)
            .map(|snap| snap.position)
            .filter(|p| !p.is_none());

        match placed {
            Some(position) => {
                hits += 1;
                let tier = position.highest_tier();
                manager.notify_update(CacheEvent::Read, key, size, tier, 0);
            }
            None => {
                manager.record_miss(key, size);
                let position = manager.request_admission(key, size, true);
                if !position.is_none() {
                    manager.notify_update(CacheEvent::Create, key, size, position, 0);
                }
            }
        }

        evictions += make_room(&manager);
    }

    println!("📦 Replayed {OPERATIONS} requests: {hits} hits, {evictions} memory evictions");

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Engine stats
    // ─────────────────────────────────────────────────────────────────────────
    let report = manager.run_learning_pass();
    println!(
        "📊 Final pass: admission updated={} (mean reward {:.3}), replacement updated={}",
        report.admission.updated, report.admission.mean_reward, report.replacement.updated
    );
    let stats = manager.stats();
    println!("   └─ {stats:#?}");

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Dump raw metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics:");
    manager.update_gauge_metrics();
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Clean shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🛑 Shutting down...");
    manager.shutdown();
    worker.await?;
    println!("   ✅ Shutdown complete! Learner: {}", manager.learner_state());

    Ok(())
}

/// Keys with sizes: a few hot images, more warm documents, many cold videos.
fn build_catalog() -> Vec<(String, u64)> {
    let hot = (0..10).map(|i| (format!("/hot/thumb_{i}.png"), 4 * 1024));
    let warm = (0..40).map(|i| (format!("/warm/report_{i}.pdf"), 24 * 1024));
    let cold = (0..150).map(|i| (format!("/cold/clip_{i}.mp4"), 96 * 1024));
    hot.chain(warm).chain(cold).collect()
}

/// 70% hot, 20% warm, 10% cold.
fn pick<'a>(catalog: &'a [(String, u64)], rng: &mut StdRng) -> (&'a str, u64) {
    let roll: f64 = rng.gen();
    let range = if roll < 0.7 {
        0..10
    } else if roll < 0.9 {
        10..50
    } else {
        50..catalog.len()
    };
    let (key, size) = &catalog[rng.gen_range(range)];
    (key.as_str(), *size)
}

/// Evict from memory until it fits. Returns the number of evictions.
fn make_room(manager: &CacheManager) -> usize {
    let mut evicted = 0;
    while manager.occupancy_bytes(Tier::Memory) > MEMORY_CAPACITY {
        let Some(victim) = manager.request_replacement(Tier::Memory) else {
            break;
        };
        let Some(current) = manager.object(&victim).map(|s| s.position) else {
            break;
        };
        let size = manager.object(&victim).map_or(0, |s| s.size);

        let outcome = if manager.request_delete_or_downgrade(&victim) {
            if current == TierPosition::Memory {
                manager.notify_update(CacheEvent::Create, &victim, size, TierPosition::Disk, 0);
            }
            manager.notify_update(CacheEvent::Delete, &victim, size, TierPosition::Memory, 0)
        } else {
            manager.notify_update(CacheEvent::Delete, &victim, size, current, 0)
        };
        if !outcome.is_applied() {
            break;
        }
        evicted += 1;
    }
    evicted
}

/// Dump all captured metrics
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", labels.join(","))
        };

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                let avg = if count > 0 { sum / count as f64 } else { 0.0 };
                histograms.push((name, label_str, count, avg));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    gauges.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    histograms.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.2}", name, labels, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, avg) in &histograms {
            println!("   │  └─ {}{} count={} avg={:.4}", name, labels, count, avg);
        }
    }
}
