//! Test-and-test-and-set spin lock.

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use portable_atomic::{AtomicBool, Ordering};
use spin::relax::{RelaxStrategy, Spin};

/// A spin lock protecting a value of type `T`.
///
/// Waiters spin on a relaxed load and only retry the exchange once the lock
/// looks free, which keeps the cache line shared while contended. `R` picks
/// what a waiter does between loads (`spin::relax::Spin` issues a pause
/// hint, `spin::relax::Yield` yields to the OS).
pub struct SpinLock<T: ?Sized, R = Spin> {
    flag: AtomicBool,
    relax: PhantomData<R>,
    data: UnsafeCell<T>,
}

/// RAII guard for [`SpinLock`]. The lock is released on drop.
pub struct SpinLockGuard<'a, T: ?Sized, R: RelaxStrategy = Spin> {
    lock: &'a SpinLock<T, R>,
}

unsafe impl<T: ?Sized + Send, R> Send for SpinLock<T, R> {}
unsafe impl<T: ?Sized + Send, R> Sync for SpinLock<T, R> {}
unsafe impl<T: ?Sized + Sync, R: RelaxStrategy> Sync for SpinLockGuard<'_, T, R> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self::with_relax(value)
    }
}

impl<T, R> SpinLock<T, R> {
    /// Creates a lock with a relax strategy other than the default.
    pub const fn with_relax(value: T) -> Self {
        Self {
            flag: AtomicBool::new(false),
            relax: PhantomData,
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized, R: RelaxStrategy> SpinLock<T, R> {
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T, R> {
        self.acquire();
        SpinLockGuard { lock: self }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T, R>> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Whether some thread currently holds the lock. Racy by nature.
    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[inline]
    fn acquire(&self) {
        loop {
            if !self.flag.swap(true, Ordering::Acquire) {
                return;
            }
            while self.flag.load(Ordering::Relaxed) {
                R::relax();
            }
        }
    }

    #[inline]
    fn release(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<T: Default, R> Default for SpinLock<T, R> {
    fn default() -> Self {
        Self::with_relax(T::default())
    }
}

impl<T: ?Sized + fmt::Debug, R: RelaxStrategy> fmt::Debug for SpinLock<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &&*guard).finish(),
            None => f.write_str("SpinLock { <locked> }"),
        }
    }
}

impl<'a, T: ?Sized, R: RelaxStrategy> SpinLockGuard<'a, T, R> {
    /// Temporarily releases the lock while `f` runs, then takes it back.
    ///
    /// The lock is re-acquired even when `f` unwinds, so the guard stays
    /// consistent with the lock state.
    pub fn unlocked<F, U>(guard: &mut Self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        struct Relock<'b, T: ?Sized, R: RelaxStrategy>(&'b SpinLock<T, R>);

        impl<T: ?Sized, R: RelaxStrategy> Drop for Relock<'_, T, R> {
            fn drop(&mut self) {
                self.0.acquire();
            }
        }

        guard.lock.release();
        let _relock = Relock(guard.lock);
        f()
    }
}

impl<T: ?Sized, R: RelaxStrategy> Deref for SpinLockGuard<'_, T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized, R: RelaxStrategy> DerefMut for SpinLockGuard<'_, T, R> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized, R: RelaxStrategy> Drop for SpinLockGuard<'_, T, R> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
