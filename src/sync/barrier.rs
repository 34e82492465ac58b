//! Reusable barrier.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct BarrierState {
    count: u32,
    group_size: u32,
    generation: u64,
}

/// Similar to a [`Latch`](super::Latch), but resets after every
/// completed `arrive_and_wait` round.
pub struct Barrier {
    state: Mutex<BarrierState>,
    cv: Condvar,
}

impl Barrier {
    pub fn new(group_size: u32) -> Self {
        crate::threading_assert!(group_size > 0, "barrier group size must be positive");
        Self {
            state: Mutex::new(BarrierState {
                count: 0,
                group_size,
                generation: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Blocks until `group_size` threads have arrived in this generation.
    ///
    /// Returns `true` for the thread whose arrival completed the generation.
    pub fn arrive_and_wait(&self) -> bool {
        let mut state = self.lock();
        let generation = state.generation;
        state.count += 1;
        if state.count >= state.group_size {
            state.count = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cv.notify_all();
            return true;
        }
        drop(
            self.cv
                .wait_while(state, |state| state.generation == generation)
                .unwrap_or_else(PoisonError::into_inner),
        );
        false
    }

    /// Changes the group size and forgets pending arrivals.
    pub fn reset_group_size(&self, group_size: u32) {
        crate::threading_assert!(group_size > 0, "barrier group size must be positive");
        let mut state = self.lock();
        state.count = 0;
        state.group_size = group_size;
    }

    pub fn group_size(&self) -> u32 {
        self.lock().group_size
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    fn test_single_leader_per_generation(#[case] threads: u32) {
        let barrier = Barrier::new(threads);
        let leaders = AtomicU32::new(0);
        let rounds = 25;
        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for _ in 0..rounds {
                        if barrier.arrive_and_wait() {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });
        assert_eq!(leaders.load(Ordering::SeqCst), rounds);
    }

    #[test]
    fn test_no_thread_runs_ahead() {
        let threads = 6;
        let barrier = Barrier::new(threads);
        let phase = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];
        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for (i, counter) in phase.iter().enumerate() {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.arrive_and_wait();
                        assert_eq!(counter.load(Ordering::SeqCst), threads, "phase {i}");
                    }
                });
            }
        });
    }

    #[test]
    fn test_reset_group_size() {
        let barrier = Barrier::new(3);
        barrier.reset_group_size(1);
        assert_eq!(barrier.group_size(), 1);
        assert!(barrier.arrive_and_wait());
    }
}
