//! Multi-producer/multi-consumer hand-off with sleeping consumers.

use super::LockedWait;
use crate::platform::sleep_thread;
use crate::sync::{SpinLock, SpinLockGuard};
use std::sync::Mutex;
use std::time::Duration;

struct PipeState<T> {
    items: Vec<T>,
    active_consumers: usize,
    evicted: bool,
}

impl<T> PipeState<T> {
    #[inline]
    fn drained(&self) -> bool {
        self.items.is_empty() && self.active_consumers == 0
    }
}

/// For multiple producers and consumers of `T` plus threads waiting for the
/// pipe to drain.
///
/// Pushing and popping only touch a spin lock. Idle consumers go to sleep
/// and are woken by producers. Items are handed out most recent first.
/// Consumer callbacks run without the lock held, so a callback may push
/// follow-up work into the same pipe.
///
/// Once [`evict`](Self::evict) has been called the pipe is dead: consumers
/// return, producers are told to stop and waiters are released.
pub struct AsyncPipe<T> {
    state: SpinLock<PipeState<T>>,
    sleep_lock: Mutex<()>,
    sleeping: LockedWait,
    waiting: LockedWait,
}

impl<T> AsyncPipe<T> {
    pub fn new() -> Self {
        Self {
            state: SpinLock::new(PipeState {
                items: Vec::new(),
                active_consumers: 0,
                evicted: false,
            }),
            sleep_lock: Mutex::new(()),
            sleeping: LockedWait::new(),
            waiting: LockedWait::new(),
        }
    }

    // ---- consumers ----

    /// Consumes items, sleeping whenever the pipe is empty. Returns only
    /// once the pipe is evicted.
    pub fn consume_loop_or_wait<F>(&self, mut f: F)
    where
        F: FnMut(T),
    {
        let mut state = self.state.lock();
        loop {
            self.consume_locked(&mut state, |item| {
                f(item);
                false
            });
            if state.evicted {
                return;
            }
            self.sleeping.wait(&mut state, &self.sleep_lock);
        }
    }

    /// Consumes what is available and returns when the pipe is empty.
    /// Returns `false` when the pipe is evicted.
    pub fn consume_loop<F>(&self, mut f: F) -> bool
    where
        F: FnMut(T),
    {
        let mut state = self.state.lock();
        self.consume_locked(&mut state, |item| {
            f(item);
            false
        });
        !state.evicted
    }

    /// Like [`consume_loop`](Self::consume_loop), but stops right after the
    /// first item for which `f` returns `true`.
    pub fn consume_until<F>(&self, f: F) -> bool
    where
        F: FnMut(T) -> bool,
    {
        let mut state = self.state.lock();
        self.consume_locked(&mut state, f);
        !state.evicted
    }

    // ---- producers ----

    /// Hands `item` to the consumers. Returns `false` if the pipe was
    /// evicted and producers should stop; the item is dropped in that case.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.evicted {
            return false;
        }
        state.items.push(item);
        self.sleeping.awake_one(&self.sleep_lock);
        true
    }

    // ---- others ----

    /// Blocks until every item has been consumed and no callback is
    /// running. Returns `false` if the wait ended because of eviction.
    pub fn wait_for_empty(&self) -> bool {
        let mut state = self.state.lock();
        while !state.drained() && !state.evicted {
            self.waiting.wait(&mut state, &self.sleep_lock);
        }
        !state.evicted
    }

    /// True when nothing is queued or being consumed, or the pipe is evicted.
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.drained() || state.evicted
    }

    /// Items queued and not yet picked up by a consumer.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_evicted(&self) -> bool {
        self.state.lock().evicted
    }

    /// Shuts the pipe down.
    ///
    /// Keeps waking sleeping consumers and `wait_for_empty` callers,
    /// pausing `sleep_interval` between rounds, until no callback is
    /// running and nobody is asleep on the pipe.
    pub fn evict(&self, sleep_interval: Duration) {
        let mut state = self.state.lock();
        state.evicted = true;
        let dropped = state.items.len();
        state.items.clear();
        tracing::debug!(dropped, "evicting async pipe");

        loop {
            let consumers = state.active_consumers > 0;
            let sleepers = self.sleeping.awake_all(&self.sleep_lock) > 0;
            let waiters = self.waiting.awake_all(&self.sleep_lock) > 0;
            if !(consumers || sleepers || waiters) {
                break;
            }
            SpinLockGuard::unlocked(&mut state, || sleep_thread(sleep_interval));
        }
    }

    /// Runs `f` on items until the pipe is empty, evicted, or `f` asks to
    /// stop. Called and returns with the lock held.
    fn consume_locked<F>(&self, state: &mut SpinLockGuard<'_, PipeState<T>>, mut f: F)
    where
        F: FnMut(T) -> bool,
    {
        while !state.evicted {
            let Some(item) = state.items.pop() else {
                break;
            };
            let stop = {
                let active = ActiveConsumer::enter(&mut *state, self);
                SpinLockGuard::unlocked(&mut *active.state, || f(item))
            };
            if stop || state.drained() {
                break;
            }
        }
    }
}

/// Counts a running consumer callback. Leaving, also by unwinding, wakes
/// the drain waiters once nothing is left.
struct ActiveConsumer<'a, 'g, T> {
    state: &'a mut SpinLockGuard<'g, PipeState<T>>,
    pipe: &'a AsyncPipe<T>,
}

impl<'a, 'g, T> ActiveConsumer<'a, 'g, T> {
    fn enter(state: &'a mut SpinLockGuard<'g, PipeState<T>>, pipe: &'a AsyncPipe<T>) -> Self {
        state.active_consumers += 1;
        Self { state, pipe }
    }
}

impl<T> Drop for ActiveConsumer<'_, '_, T> {
    fn drop(&mut self) {
        self.state.active_consumers -= 1;
        if self.state.drained() {
            self.pipe.waiting.awake_all(&self.pipe.sleep_lock);
        }
    }
}

impl<T> Default for AsyncPipe<T> {
    fn default() -> Self {
        Self::new()
    }
}
