//! Error types for queue operations and task outcomes.

use thiserror::Error;

/// Errors produced synchronously by queue operations.
///
/// None of these ever reach a submission's outcome; they are returned to the
/// caller of the operation that was misused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// An argument passed to the queue was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The queue is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Queue configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure delivered to a single submission's outcome.
///
/// Task failures are isolated per submission: they never abort the queue or
/// other tasks.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task's own error from its last attempt.
    #[error("{0}")]
    Failed(E),
    /// The task panicked on its last attempt with the given message.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task failed without carrying any error value.
    #[error("Unknown Error")]
    Unknown,
    /// The outcome was dropped before it could be delivered, e.g. because the
    /// runtime shut down while the task was queued or running.
    #[error("task outcome abandoned before it settled")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// Returns the task's own error, if this failure carries one.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure came from the task itself rather than the queue.
    pub const fn is_task_failure(&self) -> bool {
        !matches!(self, Self::Abandoned)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
