#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Thread primitives and thread management on top of OS threads.
//!
//! # Features
//!
//! - `enable-assert`: contract checks become `debug_assert!` (default)
//! - `testing`: contract checks always run, `config::TESTING` is set and the
//!   `test-threading` grind binary is built
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use threading::AsyncPipe;
//!
//! let pipe = AsyncPipe::new();
//! std::thread::scope(|s| {
//!     s.spawn(|| pipe.consume_loop_or_wait(|job: u32| assert!(job < 8)));
//!     for job in 0..8 {
//!         pipe.push(job);
//!     }
//!     pipe.wait_for_empty();
//!     pipe.evict(Duration::from_millis(1));
//! });
//! ```
//!
//! # Architecture
//!
//! - `sync`: spin locks, semaphore, latch, barriers and keyed latch events
//! - `pipe`: the async pipe and the sleep/wake helper it is built on
//! - `thread`: thread groups running contexts, plus plain worker groups
//! - `platform`: sleeping, CPU pinning and thread spawning

pub mod config;
pub mod errors;
pub mod pipe;
pub mod platform;
pub mod sync;
pub mod thread;

#[cfg(test)]
mod tests;

// ============================================================================
// Public API
// ============================================================================

// Primitives
pub use sync::{
    Barrier, Latch, MrSpinLock, Semaphore, SpinLock, SpinLockGuard, SpinValueLock, SwapBarrier,
    UniqueLatchEvents,
};

// Hand-off
pub use pipe::{AsyncPipe, LockedWait};

// Threads
pub use thread::{ContextHandle, CpuPinning, ThreadContext, ThreadGroup, ThreadGroupBuilder, WorkerGroup};

// Platform
pub use platform::{available_cores, lock_current_thread_to_core, sleep_thread};

// Errors
pub use errors::{AffinityError, JoinError, SpawnError, ThreadingError, ThreadingResult};
