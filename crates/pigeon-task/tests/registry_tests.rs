//! Integration tests for concurrent use of a task registry

use pigeon_task::{KillOutcome, TaskRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_spawn_and_kill() {
    let registry = Arc::new(TaskRegistry::new("race"));
    let stopped = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let stopped = Arc::clone(&stopped);
            thread::spawn(move || {
                for j in 0..10 {
                    let stopped = Arc::clone(&stopped);
                    let handle = registry
                        .spawn(&format!("w{}-{}", i, j), move |token| {
                            while !token.wait_timeout(Duration::from_secs(30)) {}
                            stopped.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    assert_eq!(registry.kill(&handle), KillOutcome::Stopped);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(stopped.load(Ordering::SeqCst), 80);
    assert!(registry.is_empty());
}

#[test]
fn test_kill_all_races_with_kill() {
    let registry = Arc::new(TaskRegistry::new("race"));
    let handles: Vec<_> = (0..16)
        .map(|i| {
            registry
                .spawn(&format!("loop-{}", i), |token| {
                    while !token.wait_timeout(Duration::from_secs(30)) {}
                })
                .unwrap()
        })
        .collect();

    let killer = {
        let registry = Arc::clone(&registry);
        let handles = handles.clone();
        thread::spawn(move || {
            handles
                .iter()
                .map(|handle| registry.kill(handle))
                .filter(|outcome| outcome.is_success())
                .count()
        })
    };
    let from_all = registry.kill_all().len();
    let from_killer = killer.join().unwrap();

    // Every task is stopped by exactly one of the two callers.
    assert_eq!(from_all + from_killer, handles.len());
    assert!(registry.is_empty());
}

#[test]
fn test_tasks_spawned_during_kill_all_are_stopped() {
    let registry = Arc::new(TaskRegistry::new("nested"));

    let inner = Arc::clone(&registry);
    registry
        .spawn("parent", move |token| {
            while !token.wait_timeout(Duration::from_millis(5)) {
                let _ = inner.spawn("child", |child| {
                    while !child.wait_timeout(Duration::from_secs(30)) {}
                });
            }
        })
        .unwrap();

    thread::sleep(Duration::from_millis(30));
    registry.kill_all();

    assert!(registry.is_empty());
}
