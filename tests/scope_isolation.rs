//! Integration tests for scope-stack isolation between call chains
//!
//! Each chain owns its `ScopeContext`. Chains running concurrently on the same
//! model, as `may` coroutines or OS threads, must never observe each other's
//! stacked criteria or default-scope suppression.

use std::sync::{Arc, Barrier};
use std::thread;

use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
use lifeguard_search::{ScopeContext, SearchQuery, Searchable};

fn people() -> Searchable<String> {
    let model = Searchable::new(
        "people",
        Arc::new(MockBackend::returning_ids(&["1"])),
        Arc::new(MemoryStore::from_records([("1", "Joe".to_string())])),
    );
    model.default_scope(SearchQuery::new().filter(("active", true)));
    model
}

#[test]
fn test_coroutine_chains_see_only_their_own_frames() {
    let model = people();
    let (tx, rx) = crossbeam_channel::unbounded();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let model = model.clone();
            let tx = tx.clone();
            may::go!(move || {
                let mut ctx = ScopeContext::new();
                if worker % 2 == 0 {
                    model.without_default_scope(&mut ctx);
                }
                // Built outside the chain, so it carries the default scope either way
                let base = model.criteria().filter(("worker", worker));
                let seen = ctx.with_scope(base, |scope| {
                    // Let the other chains push their frames before reading ours
                    may::coroutine::yield_now();
                    model.criteria_in(scope).selector().to_string()
                });
                let after = model.criteria_in(&ctx).selector().to_string();
                tx.send((worker, seen, after, ctx.depth("people")))
                    .expect("receiver alive");
            })
        })
        .collect();
    drop(tx);

    for handle in handles {
        handle.join().expect("coroutine panicked");
    }

    let mut results: Vec<_> = rx.iter().collect();
    results.sort_by_key(|(worker, ..)| *worker);
    assert_eq!(results.len(), 8);
    for (worker, seen, after, depth) in results {
        assert_eq!(seen, format!("((active:true)) AND (worker:{worker})"));
        assert_eq!(depth, 0, "worker {worker} left a frame behind");
        let expected_after = if worker % 2 == 0 { "" } else { "((active:true))" };
        assert_eq!(after, expected_after, "worker {worker} saw foreign suppression state");
    }
}

#[test]
fn test_thread_chains_interleaved_on_one_model() {
    let model = people();
    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = crossbeam_channel::unbounded();

    let handles: Vec<_> = ["Joe", "Ann"]
        .into_iter()
        .map(|name| {
            let model = model.clone();
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            thread::spawn(move || {
                let mut ctx = ScopeContext::new();
                if name == "Ann" {
                    model.without_default_scope(&mut ctx);
                }
                let base = model.criteria_in(&ctx).filter(("name", name));
                let seen = ctx.with_scope(base, |scope| {
                    // Both chains hold a frame on the same model here
                    barrier.wait();
                    let seen = model.criteria_in(scope).selector().to_string();
                    barrier.wait();
                    seen
                });
                tx.send((name, seen)).expect("receiver alive");
            })
        })
        .collect();
    drop(tx);

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let mut results: Vec<(&str, String)> = rx.iter().collect();
    results.sort();
    assert_eq!(
        results,
        vec![
            ("Ann", "(name:Ann)".to_string()),
            ("Joe", "((active:true)) AND (name:Joe)".to_string()),
        ]
    );
}

#[test]
fn test_sequential_chains_start_clean() {
    let model = people();
    let mut first = ScopeContext::new();
    model.without_default_scope(&mut first);
    let _guard = first.push(model.filter(("a", 1)));

    let second = ScopeContext::new();
    assert_eq!(model.criteria_in(&second).selector(), "((active:true))");
    assert_eq!(second.depth("people"), 0);
}
