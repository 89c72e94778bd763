//! `stress` subcommand — many threads driving one store, verified at the end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::Rng;
use reqctx_store::{RequestContextStore, TracingSink, WriterSink};
use serde_json::json;
use tracing::{info, warn};

use crate::RunResult;

#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Worker threads
    pub threads: usize,
    /// Requests per thread
    pub requests: usize,
    /// Keys written per request
    pub keys: usize,
    /// Dump live contexts to stdout once, halfway through the run
    pub dump: bool,
}

#[derive(Default)]
struct Counters {
    sets: AtomicUsize,
    reads: AtomicUsize,
    deletes: AtomicUsize,
    cleared: AtomicUsize,
    inconsistent: AtomicUsize,
}

/// Run the workload; fails if a read saw a torn context or anything leaked.
pub fn run_stress(store: Arc<RequestContextStore>, config: StressConfig) -> RunResult {
    info!(
        "Stress: {} threads x {} requests, {} keys each",
        config.threads, config.requests, config.keys
    );
    let counters = Counters::default();
    let started = Instant::now();

    std::thread::scope(|s| {
        for worker in 0..config.threads {
            let store = &store;
            let counters = &counters;
            s.spawn(move || stress_worker(store, counters, worker, config));
        }
    });

    let elapsed = started.elapsed();
    let total = config.threads * config.requests;
    info!(
        "Stress done in {:.2?}: {} requests, {} sets, {} reads, {} deletes, {} clears",
        elapsed,
        total,
        counters.sets.load(Ordering::Relaxed),
        counters.reads.load(Ordering::Relaxed),
        counters.deletes.load(Ordering::Relaxed),
        counters.cleared.load(Ordering::Relaxed),
    );

    let inconsistent = counters.inconsistent.load(Ordering::Relaxed);
    if inconsistent > 0 {
        return Err(format!("{inconsistent} reads observed a partially written context").into());
    }
    if !store.is_empty() {
        return Err(format!("{} request contexts leaked", store.len()).into());
    }
    Ok(())
}

fn stress_worker(
    store: &Arc<RequestContextStore>,
    counters: &Counters,
    worker: usize,
    config: StressConfig,
) {
    let mut rng = rand::rng();

    for n in 0..config.requests {
        let scope = store.scope(format!("w{worker}-r{n}"));

        // Every key of a request is written with the same generation, so a
        // snapshot mixing generations would mean a torn read.
        for generation in 0..2u64 {
            for k in 0..config.keys {
                scope.set(&format!("k{k}"), json!({"worker": worker, "gen": generation}));
                counters.sets.fetch_add(1, Ordering::Relaxed);
            }
            if let Some(bag) = scope.get_all() {
                counters.reads.fetch_add(1, Ordering::Relaxed);
                let torn = bag.values().any(|v| v["gen"] != generation);
                if bag.len() != config.keys || torn {
                    counters.inconsistent.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        // Peek at a neighbour's request; it may or may not exist yet.
        let neighbour = format!("w{}-r{n}", (worker + 1) % config.threads.max(1));
        let _ = store.get_ok(&neighbour, "k0");
        counters.reads.fetch_add(1, Ordering::Relaxed);

        if config.keys > 0 && rng.random_bool(0.5) {
            let key = format!("k{}", rng.random_range(0..config.keys));
            scope.delete(&key);
            counters.deletes.fetch_add(1, Ordering::Relaxed);
            if scope.get_ok(&key).is_some() {
                counters.inconsistent.fetch_add(1, Ordering::Relaxed);
            }
        }

        if config.dump && worker == 0 && n == config.requests / 2 {
            let mut stdout = WriterSink::new(std::io::stdout().lock());
            match store.print_all(&mut stdout) {
                Ok(count) => info!("Dumped {count} live entries"),
                Err(e) => warn!("Dump failed: {e}"),
            }
        } else if n % 1000 == 0 {
            if let Err(e) = scope.store().print_data(scope.id(), &mut TracingSink) {
                warn!("Dump failed: {e}");
            }
        }

        drop(scope);
        counters.cleared.fetch_add(1, Ordering::Relaxed);
    }
}
