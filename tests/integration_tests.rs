//! End-to-end tests — a shared store driven by many threads and tasks the
//! way a request pipeline drives it.

use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;
use reqctx::{StressConfig, run_demo, run_stress};
use reqctx_store::{Bag, ClearHandler, RequestContextStore, RequestHandler, RequestScope};
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Request lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn request_lifecycle_end_to_end() {
    let store = RequestContextStore::new();

    store.set("req1", "user", "alice");
    store.set("req1", "role", "admin");

    let bag = store.get_all("req1").unwrap();
    assert_eq!(json!(bag), json!({"user": "alice", "role": "admin"}));

    store.clear("req1");
    assert_eq!(store.get_all_ok("req1"), (Bag::new(), false));
    assert!(store.dump_all().is_empty());
}

#[test]
fn cleared_requests_never_show_up_in_enumeration() {
    let store = RequestContextStore::new();
    for i in 0..10 {
        store.set(&format!("req{i}"), "n", i);
    }
    for i in (0..10).step_by(2) {
        store.clear(&format!("req{i}"));
    }

    assert_eq!(store.request_ids(), vec!["req1", "req3", "req5", "req7", "req9"]);
    let dumped: Vec<String> = store.dump_all().into_iter().map(|e| e.request_id).collect();
    assert_eq!(dumped, store.request_ids());
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn interleaved_writers_and_readers_on_shared_ids() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 2000;
    const IDS: usize = 4;
    const KEYS: usize = 3;

    let store = Arc::new(RequestContextStore::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let torn = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let torn = Arc::clone(&torn);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    let id = format!("shared-{}", (t + round) % IDS);
                    match round % 5 {
                        0 | 1 => {
                            for k in 0..KEYS {
                                store.set(&id, &format!("k{k}"), json!({"t": t, "round": round}));
                            }
                        }
                        2 => {
                            // Values are always objects; a snapshot must never
                            // contain anything else.
                            let (bag, found) = store.get_all_ok(&id);
                            if !found && !bag.is_empty() {
                                torn.lock().push(format!("{id}: non-empty bag reported absent"));
                            }
                            if bag.values().any(|v| !v.is_object()) || bag.len() > KEYS {
                                torn.lock().push(format!("{id}: malformed snapshot {bag:?}"));
                            }
                        }
                        3 => store.delete(&id, &format!("k{}", round % KEYS)),
                        _ => store.clear(&id),
                    }
                    let _ = store.get(&id, "k0");
                    let _ = store.get_ok(&id, "k1");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let torn = torn.lock();
    assert!(torn.is_empty(), "torn reads: {:?}", *torn);
    for i in 0..IDS {
        store.clear(&format!("shared-{i}"));
    }
    assert!(store.is_empty());
}

#[test]
fn per_thread_requests_stay_isolated_and_are_cleared() {
    const THREADS: usize = 16;
    const REQUESTS: usize = 500;

    let store = Arc::new(RequestContextStore::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for r in 0..REQUESTS {
                    let scope = store.scope(format!("t{t}-r{r}"));
                    scope.set("owner", t);
                    scope.set("request", r);
                    assert_eq!(scope.get("owner"), json!(t));
                    assert_eq!(scope.get_all().unwrap().len(), 2);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
    assert!(store.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Guaranteed cleanup through the handler wrapper
// ─────────────────────────────────────────────────────────────────────────────

struct TimedStage;

impl RequestHandler for TimedStage {
    type Output = Option<u64>;

    async fn handle(&self, scope: &RequestScope) -> Option<u64> {
        scope.set("startedAt", 1_000u64);
        tokio::task::yield_now().await;
        scope.set("finishedAt", 1_250u64);

        let started = scope.get_as::<u64>("startedAt").ok()??;
        let finished = scope.get_as::<u64>("finishedAt").ok()??;
        Some(finished - started)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_requests_through_clear_handler() {
    let store = Arc::new(RequestContextStore::new());
    let handler = Arc::new(ClearHandler::new(Arc::clone(&store), TimedStage));

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.serve(format!("req-{i}")).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Some(250));
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn cancelled_request_is_still_cleared() {
    let store = Arc::new(RequestContextStore::new());
    let handler = Arc::new(ClearHandler::new(Arc::clone(&store), Stalled));

    let task = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move { handler.serve("req-stalled").await })
    };

    while !store.contains("req-stalled") {
        tokio::task::yield_now().await;
    }
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(store.is_empty());
}

struct Stalled;

impl RequestHandler for Stalled {
    type Output = ();

    async fn handle(&self, scope: &RequestScope) {
        scope.set("user", "alice");
        std::future::pending::<()>().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CLI drivers
// ─────────────────────────────────────────────────────────────────────────────

fn small_stress() -> StressConfig {
    StressConfig {
        threads: 3,
        requests: 40,
        keys: 2,
        dump: false,
    }
}

#[test]
fn stress_run_leaves_store_empty() {
    let store = Arc::new(RequestContextStore::new());
    run_stress(Arc::clone(&store), small_stress()).unwrap();
    assert!(store.is_empty());
}

#[test]
fn stress_run_reports_leftover_contexts() {
    let store = Arc::new(RequestContextStore::new());
    store.set("leftover", "user", "alice");

    let err = run_stress(Arc::clone(&store), small_stress()).unwrap_err();
    assert!(err.to_string().contains("1 request contexts leaked"), "{err}");
    assert_eq!(store.request_ids(), vec!["leftover"]);
}

#[test]
fn stress_run_without_keys_still_clears() {
    let store = Arc::new(RequestContextStore::new());
    let config = StressConfig { keys: 0, ..small_stress() };
    run_stress(Arc::clone(&store), config).unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn demo_run_clears_every_request() {
    let store = Arc::new(RequestContextStore::new());
    run_demo(Arc::clone(&store)).await.unwrap();
    assert!(store.is_empty());
}
