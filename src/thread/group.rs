//! Thread groups running user supplied contexts.

use super::builder::{CpuPinning, ThreadGroupBuilder};
use super::handle::ContextHandle;
use crate::errors::{SpawnError, ThreadingResult};
use crate::platform::{available_cores, lock_current_thread_to_core, start_native};
use crate::sync::Latch;
use portable_atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Code that is executed on a thread of a [`ThreadGroup`].
pub trait ThreadContext: Send + 'static {
    /// Runs first on the new thread, before the group's init latch.
    fn init(&mut self, group: &ThreadGroup, index: u32) {
        let _ = (group, index);
    }

    /// The thread body.
    fn execute(&mut self, group: &ThreadGroup, index: u32);
}

pub(super) struct GroupInner {
    pub(super) name: String,
    pub(super) stack_size: Option<usize>,
    pub(super) pinning: CpuPinning,
    pub(super) joined: AtomicU32,
}

/// Starts and joins threads running [`ThreadContext`]s.
///
/// Cloning is cheap and every clone refers to the same group.
#[derive(Clone)]
pub struct ThreadGroup {
    pub(super) inner: Arc<GroupInner>,
}

/// Keeps the joined count honest even if `execute` unwinds.
struct JoinedScope<'a>(&'a AtomicU32);

impl<'a> JoinedScope<'a> {
    fn enter(joined: &'a AtomicU32) -> Self {
        joined.fetch_add(1, Ordering::AcqRel);
        Self(joined)
    }
}

impl Drop for JoinedScope<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A thread's slot on the init latch. A thread whose `init` unwinds still
/// arrives, so the rest of the wall is not held forever.
struct InitArrival(Option<Arc<Latch>>);

impl InitArrival {
    fn wait(mut self) {
        if let Some(latch) = self.0.take() {
            latch.arrive_and_wait();
        }
    }
}

impl Drop for InitArrival {
    fn drop(&mut self) {
        if let Some(latch) = self.0.take() {
            latch.arrive();
        }
    }
}

impl ThreadGroup {
    pub fn new() -> Self {
        ThreadGroupBuilder::new().build()
    }

    pub fn builder() -> ThreadGroupBuilder {
        ThreadGroupBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of threads currently inside `execute`.
    pub fn size(&self) -> u32 {
        self.inner.joined.load(Ordering::Acquire)
    }

    /// Starts one thread running `context`.
    ///
    /// The thread runs `init`, arrives on `init_latch` if one is given, and
    /// then runs `execute`.
    pub fn start_one<C>(&self, index: u32, mut context: C, init_latch: Option<Arc<Latch>>) -> ThreadingResult<ContextHandle<C>>
    where
        C: ThreadContext,
    {
        let group = self.clone();
        let name = format!("{}-{}", self.inner.name, index);
        let handle = start_native(Some(name), self.inner.stack_size, move || {
            let arrival = InitArrival(init_latch);
            group.pin(index);
            context.init(&group, index);
            arrival.wait();

            let joined = JoinedScope::enter(&group.inner.joined);
            context.execute(&group, index);
            drop(joined);
            context
        })?;

        tracing::debug!(group = %self.inner.name, index, "started thread");
        Ok(ContextHandle {
            index,
            handle: Some(handle),
        })
    }

    /// Starts every context with consecutive indices from `base_index`.
    ///
    /// Returns once all threads have finished `init`; none of them enters
    /// `execute` before that. A thread whose `init` panicked still counts as
    /// finished and reports the panic when joined.
    pub fn start_wall<C, I>(&self, contexts: I, base_index: u32) -> ThreadingResult<Vec<ContextHandle<C>>>
    where
        C: ThreadContext,
        I: IntoIterator<Item = C>,
    {
        let contexts: Vec<C> = contexts.into_iter().collect();
        if contexts.is_empty() {
            return Err(SpawnError::EmptyWall.into());
        }

        let count = contexts.len() as u32;
        let latch = Arc::new(Latch::new(count));
        let mut handles = Vec::with_capacity(contexts.len());
        for (offset, context) in contexts.into_iter().enumerate() {
            match self.start_one(base_index + offset as u32, context, Some(latch.clone())) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // let the started threads through, then join them via drop
                    for _ in offset as u32..count {
                        latch.arrive();
                    }
                    tracing::error!(group = %self.inner.name, error = %err, "failed to start wall");
                    return Err(err);
                }
            }
        }

        latch.wait();
        tracing::debug!(group = %self.inner.name, threads = count, "wall initialized");
        Ok(handles)
    }

    /// Waits for one context and hands it back.
    pub fn join_one<C>(&self, handle: ContextHandle<C>) -> ThreadingResult<C> {
        handle.join()
    }

    /// Waits for all contexts. Every thread is joined even if one of them
    /// panicked; the first failure is reported.
    pub fn join_all<C, I>(&self, handles: I) -> ThreadingResult<Vec<C>>
    where
        I: IntoIterator<Item = ContextHandle<C>>,
    {
        let mut contexts = Vec::new();
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(context) => contexts.push(context),
                Err(err) => {
                    tracing::warn!(group = %self.inner.name, error = %err, "thread failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(contexts),
        }
    }

    fn pin(&self, index: u32) {
        if self.inner.pinning == CpuPinning::Disabled {
            return;
        }
        let core = index as usize % available_cores();
        if let Err(err) = lock_current_thread_to_core(core) {
            tracing::warn!(group = %self.inner.name, index, core, error = %err, "running unpinned");
        }
    }
}

impl Default for ThreadGroup {
    fn default() -> Self {
        Self::new()
    }
}
