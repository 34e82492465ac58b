use crate::errors::{JoinError, ThreadingResult};
use crate::platform::start_native;
use std::thread::JoinHandle;

/// A bag of plain worker threads, all joined when the group is dropped.
#[derive(Default)]
pub struct WorkerGroup {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `count` threads, each running its own clone of `f`.
    pub fn spawn<F>(&mut self, count: usize, f: F) -> ThreadingResult<()>
    where
        F: FnOnce() + Clone + Send + 'static,
    {
        self.handles.reserve(count);
        for _ in 0..count {
            let name = format!("worker-{}", self.handles.len());
            self.handles.push(start_native(Some(name), None, f.clone())?);
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn swap(&mut self, other: &mut WorkerGroup) {
        std::mem::swap(&mut self.handles, &mut other.handles);
    }

    /// Joins every thread. All threads are joined even if some panicked;
    /// the first panic is reported.
    pub fn join_all(&mut self) -> ThreadingResult<()> {
        let mut result = Ok(());
        for (index, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() && result.is_ok() {
                result = Err(JoinError::Panicked { index: index as u32 }.into());
            }
        }
        result
    }
}

impl Drop for WorkerGroup {
    fn drop(&mut self) {
        if let Err(err) = self.join_all() {
            tracing::warn!(error = %err, "worker panicked before group was dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_spawn_runs_every_clone() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut workers = WorkerGroup::new();
        let c = counter.clone();
        workers
            .spawn(4, move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(workers.size(), 4);
        workers.join_all().unwrap();
        assert_eq!(workers.size(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_drop_joins() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut workers = WorkerGroup::new();
            let c = counter.clone();
            workers
                .spawn(3, move || {
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_swap_moves_threads() {
        let mut a = WorkerGroup::new();
        let mut b = WorkerGroup::new();
        a.spawn(2, || {}).unwrap();
        a.swap(&mut b);
        assert_eq!(a.size(), 0);
        assert_eq!(b.size(), 2);
    }

    #[test]
    fn test_join_all_reports_panic() {
        let mut workers = WorkerGroup::new();
        workers.spawn(1, || panic!("worker failure")).unwrap();
        let err = workers.join_all().unwrap_err();
        assert!(err.is_panic());
    }
}
