//! Operating system facing helpers: sleeping, CPU pinning and spawning.

use crate::errors::{AffinityError, SpawnError, ThreadingResult};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Gives up the time slice, then sleeps for `duration` if it is non-zero.
pub fn sleep_thread(duration: Duration) {
    thread::yield_now();
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Number of cores the process may run on, at least 1.
pub fn available_cores() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Pins the calling thread to a single core.
#[cfg(target_os = "linux")]
pub fn lock_current_thread_to_core(core_index: usize) -> ThreadingResult<()> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    if core_index >= CpuSet::count() {
        return Err(AffinityError::CoreOutOfRange(core_index).into());
    }
    let mut cpu_set = CpuSet::new();
    cpu_set
        .set(core_index)
        .map_err(|_| AffinityError::CoreOutOfRange(core_index))?;
    // pid 0 is the calling thread
    sched_setaffinity(Pid::from_raw(0), &cpu_set).map_err(|errno| AffinityError::Os {
        core: core_index,
        reason: errno.desc().to_string(),
    })?;
    tracing::trace!(core = core_index, "pinned thread");
    Ok(())
}

/// Pins the calling thread to a single core.
#[cfg(not(target_os = "linux"))]
pub fn lock_current_thread_to_core(core_index: usize) -> ThreadingResult<()> {
    let _ = core_index;
    Err(AffinityError::Unsupported.into())
}

/// Spawns a named OS thread, turning spawn failure into an error value.
pub fn start_native<F, T>(name: Option<String>, stack_size: Option<usize>, f: F) -> ThreadingResult<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut builder = thread::Builder::new();
    if let Some(name) = name {
        builder = builder.name(name);
    }
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    builder.spawn(f).map_err(|e| SpawnError::Os(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_sleep_thread_waits() {
        let start = Instant::now();
        sleep_thread(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
        sleep_thread(Duration::ZERO);
    }

    #[test]
    fn test_available_cores_positive() {
        assert!(available_cores() >= 1);
    }

    #[test]
    fn test_start_native_names_thread() {
        let handle = start_native(Some("native-7".into()), Some(256 * 1024), || {
            thread::current().name().map(str::to_owned)
        })
        .unwrap();
        assert_eq!(handle.join().unwrap().as_deref(), Some("native-7"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_to_first_core() {
        use crate::errors::ThreadingError;

        // the sandbox may forbid core 0, but the request itself is valid
        let result = start_native(None, None, || lock_current_thread_to_core(0))
            .unwrap()
            .join()
            .unwrap();
        assert!(matches!(
            result,
            Ok(()) | Err(ThreadingError::Affinity(AffinityError::Os { core: 0, .. }))
        ));
    }

    #[test]
    fn test_pin_out_of_range_fails() {
        assert!(lock_current_thread_to_core(1 << 20).is_err());
    }
}
