//! Thread management: context based thread groups and plain worker groups.

pub mod builder;
pub mod group;
pub mod handle;
pub mod workers;

pub use builder::{CpuPinning, ThreadGroupBuilder};
pub use group::{ThreadContext, ThreadGroup};
pub use handle::ContextHandle;
pub use workers::WorkerGroup;
