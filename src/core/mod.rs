//! Core scheduling abstractions: the task queue, its backlog, retry wrapper,
//! drain notification, and error types.

pub mod error;
pub mod notify;
pub mod stats;
pub mod task;
pub mod task_queue;

mod backlog;
mod retry;
mod state;

pub use error::{AppResult, QueueError, TaskError};
pub use notify::{DrainCallback, Drained, FlushHandle};
pub use stats::QueueStats;
pub use task::{from_sync, SubmissionId, SyncTask, Task, TaskHandle, TaskOptions};
pub use task_queue::{Spawn, TaskQueue};
