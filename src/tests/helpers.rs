//! Test helper utilities and common functionality.

use crate::thread::{ThreadContext, ThreadGroup};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Thread counts used by the cross-module tests.
pub(crate) struct TestConfig {
    pub(crate) stress_thread_count: usize,
    pub(crate) stress_iterations: usize,
}

pub(crate) const TEST_CONFIG: TestConfig = TestConfig {
    stress_thread_count: 16,
    stress_iterations: 2_000,
};

/// Holds a set of threads at a start line until `open` is called, so that
/// all of them hit the code under test at the same time.
#[derive(Default)]
pub(crate) struct StartGate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl StartGate {
    pub(crate) fn wait(&self) {
        let open = self.open.lock().unwrap();
        drop(self.cv.wait_while(open, |open| !*open).unwrap());
    }

    pub(crate) fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }
}

/// Spins until `condition` holds or `timeout` elapses.
pub(crate) fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::yield_now();
    }
    condition()
}

/// Context that records the order in which init and execute ran across a
/// group of threads.
pub(crate) struct OrderProbe {
    pub(crate) inits: Arc<AtomicUsize>,
    pub(crate) saw_all_inits: bool,
    pub(crate) expected: usize,
    pub(crate) release: Arc<AtomicBool>,
}

impl OrderProbe {
    pub(crate) fn batch(count: usize) -> (Vec<OrderProbe>, Arc<AtomicBool>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(AtomicBool::new(false));
        let probes = (0..count)
            .map(|_| OrderProbe {
                inits: inits.clone(),
                saw_all_inits: false,
                expected: count,
                release: release.clone(),
            })
            .collect();
        (probes, release)
    }
}

impl ThreadContext for OrderProbe {
    fn init(&mut self, _group: &ThreadGroup, _index: u32) {
        std::thread::sleep(Duration::from_millis(5));
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn execute(&mut self, _group: &ThreadGroup, _index: u32) {
        self.saw_all_inits = self.inits.load(Ordering::SeqCst) == self.expected;
        while !self.release.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
    }
}
