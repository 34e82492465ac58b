use super::group::{GroupInner, ThreadGroup};
use portable_atomic::AtomicU32;
use std::sync::Arc;

/// Whether threads of a group get pinned to cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuPinning {
    /// Leave placement to the OS scheduler.
    #[default]
    Disabled,
    /// Pin thread `index` to core `index % cores`. Failures are logged and
    /// the thread runs unpinned.
    BestEffort,
}

/// Configuration for a [`ThreadGroup`].
pub struct ThreadGroupBuilder {
    name: String,
    stack_size: Option<usize>,
    pinning: CpuPinning,
}

impl ThreadGroupBuilder {
    pub fn new() -> Self {
        Self {
            name: String::from("threading"),
            stack_size: None,
            pinning: CpuPinning::Disabled,
        }
    }

    /// Prefix of thread names, which are `{name}-{index}`.
    pub fn name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn pinning(mut self, pinning: CpuPinning) -> Self {
        self.pinning = pinning;
        self
    }

    pub fn build(self) -> ThreadGroup {
        ThreadGroup {
            inner: Arc::new(GroupInner {
                name: self.name,
                stack_size: self.stack_size,
                pinning: self.pinning,
                joined: AtomicU32::new(0),
            }),
        }
    }
}

impl Default for ThreadGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
