//! Thread grind: several threads walk one shared sequence while the later
//! runs pin thread 0 to core 0 and everyone else to core 1.
//!
//! Usage: `test-threading [sequence-length]` (defaults to 32M entries).
//! Set `RUST_LOG=warn` to keep only failures.

use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use threading::{lock_current_thread_to_core, ThreadContext, ThreadGroup, ThreadingResult};
use tracing_subscriber::EnvFilter;

const THREAD_COUNT: u32 = 3;
const RUN_COUNT: u32 = 5;
const DEFAULT_SEQUENCE_LEN: u32 = 32 * 1024 * 1024;

struct Grinder {
    sequence: Arc<Vec<u32>>,
    print_lock: Arc<Mutex<()>>,
    runs: Vec<Duration>,
    checksum: Option<u32>,
    consistent: bool,
}

impl Grinder {
    fn walk(&self, index: usize, stride: usize) -> u32 {
        let len = self.sequence.len();
        let mut read_index = 1usize;
        let mut xv = 0u32;
        for (step, i) in (index..len).step_by(stride).enumerate() {
            read_index = read_index.wrapping_add(i).wrapping_mul(1_106_531);
            xv ^= self.sequence[read_index % len];
            if step % 1024 == 1023 {
                std::thread::yield_now();
            }
        }
        xv
    }

    fn average(&self) -> Duration {
        let total: Duration = self.runs.iter().sum();
        total / self.runs.len().max(1) as u32
    }
}

impl ThreadContext for Grinder {
    fn execute(&mut self, _group: &ThreadGroup, index: u32) {
        for run in 0..RUN_COUNT {
            if run > 1 {
                let core = if index == 0 { 0 } else { 1 };
                if let Err(err) = lock_current_thread_to_core(core) {
                    tracing::warn!(index, core, error = %err, "pinning failed");
                }
            }
            // line the threads up behind the print lock
            drop(self.print_lock.lock());

            let start = Instant::now();
            let xv = self.walk(index as usize, THREAD_COUNT as usize);
            let elapsed = start.elapsed();

            match self.checksum {
                None => self.checksum = Some(xv),
                Some(expected) if expected != xv => self.consistent = false,
                Some(_) => {}
            }

            let _print = self.print_lock.lock();
            tracing::info!(index, run, ?elapsed, "run finished");
            self.runs.push(elapsed);
        }
    }
}

fn run(sequence_len: u32) -> ThreadingResult<bool> {
    let sequence = Arc::new((0..sequence_len).collect::<Vec<u32>>());
    let print_lock = Arc::new(Mutex::new(()));

    let group = ThreadGroup::builder().name("grind").build();
    let grinders = (0..THREAD_COUNT).map(|_| Grinder {
        sequence: sequence.clone(),
        print_lock: print_lock.clone(),
        runs: Vec::with_capacity(RUN_COUNT as usize),
        checksum: None,
        consistent: true,
    });
    let handles = group.start_wall(grinders, 0)?;
    let grinders = group.join_all(handles)?;

    let mut ok = true;
    for (index, grinder) in grinders.iter().enumerate() {
        tracing::info!(index, average = ?grinder.average(), "average run duration");
        if !grinder.consistent {
            tracing::error!(index, "thread saw different results across runs");
            ok = false;
        }
    }
    let pinned_first = grinders[0].average();
    for (index, grinder) in grinders.iter().enumerate().skip(1) {
        if grinder.average() <= pinned_first {
            tracing::info!(index, "shared-core thread was not slower than the thread on core 0");
        }
    }
    Ok(ok)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let sequence_len = match std::env::args().nth(1).map(|arg| arg.parse::<u32>()) {
        None => DEFAULT_SEQUENCE_LEN,
        Some(Ok(len)) if len > 0 => len,
        Some(_) => {
            eprintln!("usage: test-threading [sequence-length > 0]");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(testing = threading::config::TESTING, sequence_len, "starting thread grind");

    match run(sequence_len) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %err, "thread grind failed");
            ExitCode::FAILURE
        }
    }
}
