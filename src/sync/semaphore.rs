//! Counting semaphore.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Classic counting semaphore built on a mutex and a condition variable.
pub struct Semaphore {
    available: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Takes one permit, blocking while none is available.
    pub fn acquire(&self) {
        let mut available = self
            .cv
            .wait_while(self.count(), |available| *available == 0)
            .unwrap_or_else(PoisonError::into_inner);
        *available -= 1;
    }

    /// Takes one permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut available = self.count();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Returns one permit and wakes one waiter.
    pub fn release(&self) {
        *self.count() += 1;
        self.cv.notify_one();
    }

    pub fn available(&self) -> usize {
        *self.count()
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
