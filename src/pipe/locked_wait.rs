//! Sleep/wake helper for structures guarded by a [`SpinLock`].
//!
//! Sleeping on a condition variable needs a real mutex, but the structures
//! using this helper keep their state behind a spin lock. The waiter takes
//! the secondary mutex before it gives up the spin lock, and the waker
//! takes the same mutex while it still holds the spin lock, so a wake-up
//! can never fall between "decided to sleep" and "asleep".

use crate::sync::SpinLockGuard;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Default)]
pub struct LockedWait {
    // only modified with the owning spin lock held
    waiters: AtomicUsize,
    trigger: Condvar,
}

impl LockedWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the spin lock held by `guard`, sleeps until woken and takes
    /// the spin lock again. Spurious wake-ups are possible.
    pub fn wait<T: ?Sized>(&self, guard: &mut SpinLockGuard<'_, T>, wait_mutex: &Mutex<()>) {
        self.waiters.fetch_add(1, Ordering::Relaxed);
        let sleep = wait_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        SpinLockGuard::unlocked(guard, move || {
            drop(self.trigger.wait(sleep).unwrap_or_else(PoisonError::into_inner));
        });
        self.waiters.fetch_sub(1, Ordering::Relaxed);
    }

    /// Wakes one sleeper. Must be called with the spin lock held.
    pub fn awake_one(&self, wait_mutex: &Mutex<()>) -> bool {
        if self.waiters.load(Ordering::Relaxed) == 0 {
            return false;
        }
        let _sleep = wait_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.trigger.notify_one();
        true
    }

    /// Wakes every sleeper and returns how many were counted. Must be called
    /// with the spin lock held.
    pub fn awake_all(&self, wait_mutex: &Mutex<()>) -> usize {
        let waiters = self.waiters.load(Ordering::Relaxed);
        if waiters == 0 {
            return 0;
        }
        let _sleep = wait_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.trigger.notify_all();
        waiters
    }

    /// Threads currently counted as sleeping.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }
}
