//! Barrier with one privileged thread.

use portable_atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct SwapState {
    count: u32,
    generation: u64,
    broken: bool,
}

/// All threads but one call [`arrive_and_wait`](Self::arrive_and_wait).
/// The odd thread calls [`arrive_and_lock`](Self::arrive_and_lock), which
/// returns once everybody has arrived while the others are still held.
/// The odd thread does its work and drops the guard to release them.
///
/// ```
/// use threading::SwapBarrier;
///
/// let barrier = SwapBarrier::new(2);
/// let mut shared = 0;
/// std::thread::scope(|s| {
///     s.spawn(|| barrier.arrive_and_wait());
///     barrier.arrive(|| shared += 1);
/// });
/// assert_eq!(shared, 1);
/// ```
pub struct SwapBarrier {
    state: Mutex<SwapState>,
    cv_wait: Condvar,
    cv_lock: Condvar,
    // mirrors `SwapState::broken` so it can be read while a guard holds the state
    broken: AtomicBool,
    group_size: u32,
}

/// The odd thread's hold on a [`SwapBarrier`]. Dropping it unlocks.
#[must_use = "dropping the guard releases the waiting threads immediately"]
pub struct SwapBarrierGuard<'a> {
    barrier: &'a SwapBarrier,
    state: MutexGuard<'a, SwapState>,
}

impl SwapBarrier {
    pub fn new(group_size: u32) -> Self {
        crate::threading_assert!(group_size > 0, "swap barrier group size must be positive");
        Self {
            state: Mutex::new(SwapState {
                count: 0,
                generation: 0,
                broken: false,
            }),
            cv_wait: Condvar::new(),
            cv_lock: Condvar::new(),
            broken: AtomicBool::new(false),
            group_size,
        }
    }

    /// Blocks until the odd thread unlocks. Returns `false` if the barrier
    /// was broken instead.
    pub fn arrive_and_wait(&self) -> bool {
        let mut state = self.lock();
        if state.broken {
            return false;
        }
        let generation = state.generation;
        state.count += 1;
        if state.count == self.group_size {
            self.cv_lock.notify_all();
        }
        let state = self
            .cv_wait
            .wait_while(state, |state| state.generation == generation && !state.broken)
            .unwrap_or_else(PoisonError::into_inner);
        state.generation != generation
    }

    /// Blocks until every member has arrived and returns holding the
    /// barrier. Waiters stay blocked until the guard is dropped.
    pub fn arrive_and_lock(&self) -> SwapBarrierGuard<'_> {
        let mut state = self.lock();
        if !state.broken {
            state.count += 1;
        }
        let state = self
            .cv_lock
            .wait_while(state, |state| state.count < self.group_size && !state.broken)
            .unwrap_or_else(PoisonError::into_inner);
        SwapBarrierGuard { barrier: self, state }
    }

    /// Runs `f` between `arrive_and_lock` and unlock.
    pub fn arrive<F, U>(&self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        let guard = self.arrive_and_lock();
        let result = f();
        guard.unlock();
        result
    }

    /// Breaks the barrier for good. Every current and future wait returns.
    pub fn break_locks(&self) {
        let mut state = self.lock();
        state.broken = true;
        self.broken.store(true, Ordering::Release);
        self.cv_wait.notify_all();
        self.cv_lock.notify_all();
    }

    /// Whether [`break_locks`](Self::break_locks) was called. Never blocks,
    /// so the odd thread may call it while it holds the barrier.
    pub fn broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    #[inline]
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    fn lock(&self) -> MutexGuard<'_, SwapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SwapBarrierGuard<'_> {
    /// Whether the barrier was broken while this thread waited to lock.
    pub fn broken(&self) -> bool {
        self.state.broken
    }

    /// Releases the waiting threads and starts a new generation.
    pub fn unlock(self) {
        // the release happens in Drop
        drop(self);
    }
}

impl Drop for SwapBarrierGuard<'_> {
    fn drop(&mut self) {
        if self.state.broken {
            return;
        }
        crate::threading_assert!(self.state.count == self.barrier.group_size);
        self.state.count = 0;
        self.state.generation = self.state.generation.wrapping_add(1);
        self.barrier.cv_wait.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_lock_holder_runs_while_others_wait() {
        let group = 5;
        let barrier = SwapBarrier::new(group);
        let released = AtomicU32::new(0);
        let rounds = 10;
        std::thread::scope(|s| {
            for _ in 0..group - 1 {
                s.spawn(|| {
                    for _ in 0..rounds {
                        assert!(barrier.arrive_and_wait());
                        released.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
            for round in 0..rounds {
                barrier.arrive(|| {
                    // nobody passes the barrier while the odd thread works
                    assert_eq!(released.load(Ordering::SeqCst), round * (group - 1));
                });
                while released.load(Ordering::SeqCst) < (round + 1) * (group - 1) {
                    std::thread::yield_now();
                }
            }
        });
    }

    #[test]
    fn test_break_locks_releases_waiters() {
        let barrier = SwapBarrier::new(3);
        std::thread::scope(|s| {
            let waiter = s.spawn(|| barrier.arrive_and_wait());
            let locker = s.spawn(|| barrier.arrive_and_lock().broken());
            std::thread::sleep(Duration::from_millis(50));
            barrier.break_locks();
            assert!(!waiter.join().unwrap());
            assert!(locker.join().unwrap());
        });
        assert!(barrier.broken());
        assert!(!barrier.arrive_and_wait());
    }

    #[test]
    fn test_broken_readable_while_locked() {
        let barrier = SwapBarrier::new(1);
        assert!(!barrier.arrive(|| barrier.broken()));

        let guard = barrier.arrive_and_lock();
        assert!(!barrier.broken());
        assert!(!guard.broken());
        guard.unlock();

        barrier.break_locks();
        assert!(barrier.arrive(|| barrier.broken()));
    }
}
