//! Multi-reader spin lock.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use portable_atomic::{AtomicUsize, Ordering};
use spin::relax::{RelaxStrategy, Spin};

const WRITER: usize = 1 << (usize::BITS - 1);
const READERS: usize = !WRITER;

/// Spin lock with shared read access and exclusive write access.
///
/// A writer first claims the writer bit, which stops new readers from
/// entering, then spins until the readers already inside have left.
pub struct MrSpinLock<T: ?Sized> {
    state: AtomicUsize,
    data: UnsafeCell<T>,
}

pub struct MrReadGuard<'a, T: ?Sized> {
    lock: &'a MrSpinLock<T>,
}

pub struct MrWriteGuard<'a, T: ?Sized> {
    lock: &'a MrSpinLock<T>,
}

unsafe impl<T: ?Sized + Send> Send for MrSpinLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for MrSpinLock<T> {}

impl<T> MrSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicUsize::new(0),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> MrSpinLock<T> {
    pub fn read(&self) -> MrReadGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }
            Spin::relax();
        }
    }

    pub fn try_read(&self) -> Option<MrReadGuard<'_, T>> {
        let state = self.state.load(Ordering::Relaxed);
        if state & WRITER != 0 {
            return None;
        }
        crate::threading_assert!(state & READERS != READERS, "reader count overflow");
        self.state
            .compare_exchange(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| MrReadGuard { lock: self })
    }

    pub fn write(&self) -> MrWriteGuard<'_, T> {
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & WRITER == 0
                && self
                    .state
                    .compare_exchange_weak(state, state | WRITER, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                break;
            }
            Spin::relax();
        }
        while self.state.load(Ordering::Acquire) & READERS != 0 {
            Spin::relax();
        }
        MrWriteGuard { lock: self }
    }

    pub fn try_write(&self) -> Option<MrWriteGuard<'_, T>> {
        self.state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| MrWriteGuard { lock: self })
    }

    pub fn reader_count(&self) -> usize {
        self.state.load(Ordering::Relaxed) & READERS
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & WRITER != 0
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for MrSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> Deref for MrReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: no writer can enter while a reader is counted.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for MrReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

impl<T: ?Sized> Deref for MrWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the writer bit is held and all readers have left.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MrWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the writer bit is held and all readers have left.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for MrWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_and(READERS, Ordering::Release);
    }
}
