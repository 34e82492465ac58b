use crate::errors::{JoinError, ThreadingResult};
use std::thread::JoinHandle;

/// Owner's side of a context started on a [`ThreadGroup`](super::ThreadGroup).
///
/// Joining hands the context back. A handle dropped without joining waits
/// for its thread, so a context never outlives the code that started it.
pub struct ContextHandle<C> {
    pub(super) index: u32,
    pub(super) handle: Option<JoinHandle<C>>,
}

impl<C> ContextHandle<C> {
    /// Index the context was started with.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the thread and returns its context.
    pub fn join(mut self) -> ThreadingResult<C> {
        let index = self.index;
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| JoinError::Panicked { index }.into()),
            None => Err(JoinError::Panicked { index }.into()),
        }
    }
}

impl<C> Drop for ContextHandle<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(index = self.index, "dropped thread context panicked");
            }
        }
    }
}
