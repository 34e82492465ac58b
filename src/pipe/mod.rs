//! Work hand-off between producer and consumer threads.

pub mod async_pipe;
pub mod locked_wait;

pub use async_pipe::AsyncPipe;
pub use locked_wait::LockedWait;
