//! Blocking and spinning synchronization primitives.

pub mod barrier;
pub mod latch;
pub mod latch_events;
pub mod mr_spin_lock;
pub mod semaphore;
pub mod spin_lock;
pub mod spin_value_lock;
pub mod swap_barrier;

pub use barrier::Barrier;
pub use latch::Latch;
pub use latch_events::UniqueLatchEvents;
pub use mr_spin_lock::{MrReadGuard, MrSpinLock, MrWriteGuard};
pub use semaphore::Semaphore;
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use spin_value_lock::{SpinValueGuard, SpinValueLock};
pub use swap_barrier::{SwapBarrier, SwapBarrierGuard};
