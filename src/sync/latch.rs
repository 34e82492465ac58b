//! One-shot latch.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Like a barrier, but not reusable.
///
/// Once `group_size` arrivals have been counted the latch stays open and
/// every later wait returns immediately.
pub struct Latch {
    count: Mutex<u32>,
    cv: Condvar,
    group_size: u32,
}

impl Latch {
    pub fn new(group_size: u32) -> Self {
        Self {
            count: Mutex::new(0),
            cv: Condvar::new(),
            group_size,
        }
    }

    /// Counts this thread and blocks until the whole group has arrived.
    pub fn arrive_and_wait(&self) {
        let count = self.arrive_locked();
        drop(self.wait_released(count));
    }

    /// Counts an arrival without blocking.
    pub fn arrive(&self) {
        drop(self.arrive_locked());
    }

    /// Blocks until the latch opens, without counting an arrival.
    pub fn wait(&self) {
        drop(self.wait_released(self.lock()));
    }

    pub fn is_released(&self) -> bool {
        *self.lock() >= self.group_size
    }

    #[inline]
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    fn arrive_locked(&self) -> MutexGuard<'_, u32> {
        let mut count = self.lock();
        *count = count.saturating_add(1);
        if *count == self.group_size {
            self.cv.notify_all();
        }
        count
    }

    fn wait_released<'a>(&self, count: MutexGuard<'a, u32>) -> MutexGuard<'a, u32> {
        self.cv
            .wait_while(count, |count| *count < self.group_size)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};

    #[test]
    fn test_releases_whole_group() {
        let latch = Latch::new(4);
        let before = AtomicU32::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    before.fetch_add(1, Ordering::SeqCst);
                    latch.arrive_and_wait();
                    assert_eq!(before.load(Ordering::SeqCst), 4);
                });
            }
        });
        assert!(latch.is_released());
    }

    #[test]
    fn test_arrive_without_waiting() {
        let latch = Latch::new(2);
        latch.arrive();
        assert!(!latch.is_released());
        latch.arrive();
        assert!(latch.is_released());
        // open latches do not block
        latch.arrive_and_wait();
        latch.wait();
    }

    #[test]
    fn test_observer_waits_for_arrivals() {
        let latch = Latch::new(3);
        std::thread::scope(|s| {
            let observer = s.spawn(|| {
                latch.wait();
                latch.is_released()
            });
            for _ in 0..3 {
                s.spawn(|| latch.arrive_and_wait());
            }
            assert!(observer.join().unwrap());
        });
    }

    #[test]
    fn test_empty_group_is_open() {
        let latch = Latch::new(0);
        assert!(latch.is_released());
        latch.wait();
        assert_eq!(latch.group_size(), 0);
    }
}
