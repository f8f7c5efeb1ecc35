//! Counter demo: increment-by-two and decrement-by-one jobs sharing one lock.

use pigeon_jobs::{Job, JobResult, JobRunner, JobRunnerError, MutexLock, SharedLock};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Spawn increment and decrement jobs until the counter reaches `target`.
///
/// Each round spawns `+2` then `-1`, both guarded by the same lock and each
/// reporting through a printing callback, and closes the runner before
/// checking the counter again. Returns the final counter value.
pub fn count_to(runner: &JobRunner, target: i64) -> Result<i64, JobRunnerError> {
    let lock = MutexLock::shared();
    let counter = Arc::new(AtomicI64::new(0));
    let mut rounds = 0usize;

    while counter.load(Ordering::SeqCst) < target {
        runner.spawn(adjust("increment", 2, &counter, &lock), report)?;
        runner.spawn(adjust("decrement", -1, &counter, &lock), report)?;
        runner.close();
        rounds += 1;
    }

    let value = counter.load(Ordering::SeqCst);
    tracing::info!("Counter reached {} after {} round(s)", value, rounds);
    Ok(value)
}

fn adjust(name: &str, delta: i64, counter: &Arc<AtomicI64>, lock: &SharedLock) -> Job<i64> {
    let counter = Arc::clone(counter);
    Job::infallible(name, move || {
        let before = counter.fetch_add(delta, Ordering::SeqCst);
        tracing::debug!("{} -> {}", before, before + delta);
        before + delta
    })
    .with_lock(Arc::clone(lock))
}

fn report(result: JobResult<i64>) {
    match result {
        JobResult::Success(value) => println!("counter = {}", value),
        JobResult::Retryable(reason) => println!("skipped: {}", reason),
        JobResult::Failed(e) => println!("failed: {}", e),
    }
}
