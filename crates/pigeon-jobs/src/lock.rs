//! Try-lock capability guarding job bodies

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A lock that can be taken without waiting.
///
/// Implementations must never block in [`try_acquire`](Self::try_acquire).
/// `release` is only called after a successful `try_acquire`.
pub trait JobLock: Send + Sync {
    /// Take the lock if it is free; return `false` immediately otherwise
    fn try_acquire(&self) -> bool;

    /// Release a lock taken with [`try_acquire`](Self::try_acquire)
    fn release(&self);
}

/// A lock shared between jobs and call sites
pub type SharedLock = Arc<dyn JobLock>;

/// Binary mutual-exclusion lock
#[derive(Debug, Default)]
pub struct MutexLock {
    held: AtomicBool,
}

impl MutexLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unlocked lock ready to be shared between jobs
    pub fn shared() -> SharedLock {
        Arc::new(Self::new())
    }

    /// Whether the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl JobLock for MutexLock {
    fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

/// Lock that never contends
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLock;

impl JobLock for NoopLock {
    fn try_acquire(&self) -> bool {
        true
    }

    fn release(&self) {}
}

/// Holds a [`JobLock`] and releases it when dropped
pub struct LockGuard<'a> {
    lock: &'a dyn JobLock,
}

impl<'a> LockGuard<'a> {
    /// Try to take `lock`, returning a guard on success
    pub fn try_acquire(lock: &'a dyn JobLock) -> Option<Self> {
        // Lazy: an eagerly built guard would release a lock held by someone else.
        lock.try_acquire().then(|| Self { lock })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}
