//! Integration tests for the directory watcher

use pigeon_watch::{BoxError, DirWatcher, KillOutcome, TaskHandle, WatcherConfig};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// Create files and a classifier returning a fixed timestamp per file name
fn fixture(stamps: &[(&str, SystemTime)]) -> (TempDir, DirWatcher) {
    let dir = TempDir::new().unwrap();
    let mut table = HashMap::new();
    for (name, stamp) in stamps {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"x").unwrap();
        table.insert(name.to_string(), *stamp);
    }

    let watcher = DirWatcher::new(dir.path(), WatcherConfig::default()).unwrap();
    watcher.set_classifier(move |path: &Path| -> std::io::Result<SystemTime> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        table
            .get(name)
            .copied()
            .ok_or_else(|| std::io::Error::other(format!("no stamp for {}", name)))
    });

    (dir, watcher)
}

fn recorder(seen: &Arc<Mutex<Vec<PathBuf>>>) -> impl Fn(&Path) -> Result<(), BoxError> {
    let seen = Arc::clone(seen);
    move |path: &Path| -> Result<(), BoxError> {
        seen.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_threshold_scenario_one_purgeable_two_fresh() {
    let threshold = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    let (_dir, watcher) = fixture(&[
        ("old", threshold - Duration::from_secs(10)),
        ("new-a", threshold + Duration::from_secs(5)),
        ("new-b", threshold + Duration::from_secs(5)),
    ]);
    let purged = Arc::new(Mutex::new(Vec::new()));
    let retained = Arc::new(Mutex::new(Vec::new()));
    watcher.set_purge_handler(recorder(&purged));
    watcher.set_retain_handler(recorder(&retained));

    let outcome = watcher.scan_once(threshold, None).unwrap();
    assert_eq!(outcome.purgeable_count, 1);
    assert_eq!(outcome.fresh_count, 2);

    for handle in outcome.handles() {
        assert_eq!(watcher.join(handle), KillOutcome::Stopped);
    }

    let purged = purged.lock().unwrap();
    let retained = retained.lock().unwrap();
    assert_eq!(purged.len(), 1);
    assert!(purged[0].ends_with("old"));
    assert_eq!(retained.len(), 2);
    assert!(retained[0].ends_with("new-a"));
    assert!(retained[1].ends_with("new-b"));

    let metrics = watcher.metrics();
    assert_eq!(metrics.purged, 1);
    assert_eq!(metrics.retained, 2);
}

#[test]
fn test_root_only_scan_ignores_subdirectories() {
    let now = SystemTime::now();
    let (_dir, watcher) = fixture(&[("top", now), ("nested/inner", now)]);

    let root_only = watcher.classify(SystemTime::UNIX_EPOCH, Some(0)).unwrap();
    let everything = watcher.classify(SystemTime::UNIX_EPOCH, None).unwrap();

    assert_eq!(root_only.fresh.len(), 1);
    assert!(root_only.fresh[0].ends_with("top"));
    assert_eq!(everything.fresh.len(), 2);
}

#[test]
fn test_failing_handler_does_not_abort_batch() {
    let threshold = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    let old = threshold - Duration::from_secs(1);
    let (_dir, watcher) = fixture(&[("a", old), ("b", old), ("c", old)]);
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    watcher.set_purge_handler(move |path: &Path| -> Result<(), BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if path.ends_with("a") {
            return Err("permission denied".into());
        }
        if path.ends_with("b") {
            panic!("handler bug");
        }
        Ok(())
    });

    let outcome = watcher.scan_once(threshold, None).unwrap();
    let batch = outcome.purgeable.expect("purge batch");
    assert_eq!(watcher.join(&batch), KillOutcome::Stopped);

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let metrics = watcher.metrics();
    assert_eq!(metrics.purged, 1);
    assert_eq!(metrics.handler_failures, 2);
}

#[test]
fn test_bootstrap_scans_until_killed() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("image.jpg"), b"x").unwrap();
    let watcher = DirWatcher::with_poll_interval(dir.path(), Duration::from_millis(20)).unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let handler = move |_: &Path| -> Result<(), BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };
    watcher.set_purge_handler(handler.clone());
    watcher.set_retain_handler(handler);

    let controller = watcher.bootstrap(SystemTime::UNIX_EPOCH).unwrap();
    assert!(wait_until(Duration::from_secs(5), || watcher.metrics().scan_count >= 3));

    assert_eq!(watcher.kill(&controller), KillOutcome::Stopped);
    assert!(!watcher.is_alive(&controller));

    // The controller drains its batches before exiting.
    assert_eq!(watcher.task_count(), 0);
    let scans = watcher.metrics().scan_count;
    assert_eq!(seen.load(Ordering::SeqCst), scans);

    thread::sleep(Duration::from_millis(60));
    assert_eq!(watcher.metrics().scan_count, scans);
}

#[test]
fn test_controller_moves_threshold_forward() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("existing"), b"x").unwrap();
    let watcher = DirWatcher::with_poll_interval(dir.path(), Duration::from_millis(20)).unwrap();
    // Everything existing is fresh against the epoch, then stale against "now".
    watcher.set_classifier(|_: &Path| -> std::io::Result<SystemTime> {
        Ok(SystemTime::now() - Duration::from_secs(60))
    });

    let controller = watcher.bootstrap(SystemTime::UNIX_EPOCH).unwrap();
    assert!(wait_until(Duration::from_secs(5), || watcher.metrics().scan_count >= 2));
    watcher.kill(&controller);

    let metrics = watcher.metrics();
    assert_eq!(metrics.fresh_seen, 1);
    assert_eq!(metrics.purgeable_seen, metrics.scan_count - 1);
}

#[test]
fn test_kill_all_stops_controller_and_batches() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("f{}", i)), b"x").unwrap();
    }
    let watcher = DirWatcher::with_poll_interval(dir.path(), Duration::from_millis(10)).unwrap();
    watcher.set_retain_handler(|_: &Path| -> Result<(), BoxError> {
        thread::sleep(Duration::from_millis(5));
        Ok(())
    });

    watcher.bootstrap(SystemTime::UNIX_EPOCH).unwrap();
    assert!(wait_until(Duration::from_secs(5), || watcher.metrics().scan_count >= 2));

    let outcomes = watcher.kill_all();

    assert!(!outcomes.is_empty());
    assert!(outcomes
        .iter()
        .all(|(_, outcome)| *outcome != KillOutcome::Panicked));
    assert_eq!(watcher.task_count(), 0);
}

#[test]
fn test_handlers_can_be_replaced_while_running() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), b"x").unwrap();
    let watcher = DirWatcher::with_poll_interval(dir.path(), Duration::from_millis(10)).unwrap();
    watcher.set_classifier(|_: &Path| -> std::io::Result<SystemTime> { Ok(SystemTime::now()) });

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&first);
    watcher.set_retain_handler(move |_: &Path| -> Result<(), BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let controller = watcher.bootstrap(SystemTime::UNIX_EPOCH).unwrap();
    assert!(wait_until(Duration::from_secs(5), || first.load(Ordering::SeqCst) >= 1));

    let counter = Arc::clone(&second);
    watcher.set_retain_handler(move |_: &Path| -> Result<(), BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert!(wait_until(Duration::from_secs(5), || second.load(Ordering::SeqCst) >= 1));

    watcher.kill(&controller);
}

#[test]
fn test_handler_can_kill_its_own_controller() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("live"), b"x").unwrap();
    let watcher =
        Arc::new(DirWatcher::with_poll_interval(dir.path(), Duration::from_millis(10)).unwrap());
    let slot: Arc<OnceLock<TaskHandle>> = Arc::new(OnceLock::new());
    let (tx, rx) = mpsc::channel();

    let owner: Weak<DirWatcher> = Arc::downgrade(&watcher);
    let target = Arc::clone(&slot);
    let tx = Mutex::new(tx);
    watcher.set_retain_handler(move |_: &Path| -> Result<(), BoxError> {
        if let (Some(watcher), Some(controller)) = (owner.upgrade(), target.get()) {
            let outcome = watcher.kill(controller);
            let _ = tx.lock().unwrap().send(outcome);
        }
        Ok(())
    });

    let controller = watcher.bootstrap(SystemTime::UNIX_EPOCH).unwrap();
    slot.set(controller.clone()).unwrap();

    let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, KillOutcome::Stopped);
    assert!(wait_until(Duration::from_secs(5), || !watcher.is_alive(&controller)));
    assert!(wait_until(Duration::from_secs(5), || watcher.task_count() == 0));
}
