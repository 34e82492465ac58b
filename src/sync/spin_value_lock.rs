//! A value that is read on lock and written back on unlock.

use core::cell::UnsafeCell;
use portable_atomic::{AtomicBool, Ordering};
use spin::relax::{RelaxStrategy, Spin};

/// Spin-locked `Copy` value.
///
/// `lock()` hands out the current value, `unlock(v)` publishes a new one.
/// This is the shape of a read-modify-write done by hand:
///
/// ```
/// use threading::SpinValueLock;
///
/// let counter = SpinValueLock::new(0u32);
/// let guard = counter.lock();
/// let v = guard.value();
/// guard.unlock(v + 1);
/// assert_eq!(counter.peek(), 1);
/// ```
pub struct SpinValueLock<T: Copy> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

/// Held lock on a [`SpinValueLock`]. Dropping it keeps the old value.
#[must_use = "dropping the guard releases the lock without storing a value"]
pub struct SpinValueGuard<'a, T: Copy> {
    lock: &'a SpinValueLock<T>,
    value: T,
}

unsafe impl<T: Copy + Send> Send for SpinValueLock<T> {}
unsafe impl<T: Copy + Send> Sync for SpinValueLock<T> {}

impl<T: Copy> SpinValueLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> SpinValueGuard<'_, T> {
        loop {
            if !self.locked.swap(true, Ordering::Acquire) {
                break;
            }
            while self.locked.load(Ordering::Relaxed) {
                Spin::relax();
            }
        }
        // SAFETY: the flag is held, no other thread touches the cell.
        let value = unsafe { *self.value.get() };
        SpinValueGuard { lock: self, value }
    }

    /// Current value, taken under a short lock.
    pub fn peek(&self) -> T {
        self.lock().value()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Copy> SpinValueGuard<'_, T> {
    /// Value observed when the lock was taken.
    pub fn value(&self) -> T {
        self.value
    }

    /// Stores `value` and releases the lock.
    pub fn unlock(self, value: T) {
        // SAFETY: the flag is still held by this guard.
        unsafe { *self.lock.value.get() = value };
    }
}

impl<T: Copy> Drop for SpinValueGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_keeps_old_value() {
        let lock = SpinValueLock::new(3u32);
        let guard = lock.lock();
        assert!(lock.is_locked());
        assert_eq!(guard.value(), 3);
        drop(guard);
        assert!(!lock.is_locked());
        assert_eq!(lock.peek(), 3);
    }

    #[test]
    fn test_unlock_publishes_value() {
        let lock = SpinValueLock::new(10i64);
        let guard = lock.lock();
        let v = guard.value();
        guard.unlock(v * 2);
        assert!(!lock.is_locked());
        assert_eq!(lock.into_inner(), 20);
    }
}
