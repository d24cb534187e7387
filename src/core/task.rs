//! Task abstraction, per-submission options, and outcome handles.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{QueueError, TaskError};

/// A unit of work the queue can run, possibly more than once.
///
/// Any `FnMut() -> impl Future<Output = Result<T, E>>` closure is a task.
/// Implement the trait directly for tasks that carry their own state.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_queue::core::Task;
///
/// struct Fetch {
///     url: String,
///     tries: u32,
/// }
///
/// #[async_trait]
/// impl Task<String, std::io::Error> for Fetch {
///     async fn run(&mut self) -> Result<String, std::io::Error> {
///         self.tries += 1;
///         download(&self.url).await
///     }
/// }
/// ```
#[async_trait]
pub trait Task<T, E>: Send + 'static {
    /// Run one attempt of the task.
    ///
    /// Called again for every retry, so tasks that are not idempotent should
    /// only be submitted with a single attempt.
    async fn run(&mut self) -> Result<T, E>;
}

#[async_trait]
impl<F, Fut, T, E> Task<T, E> for F
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&mut self) -> Result<T, E> {
        (self)().await
    }
}

/// Task wrapping a synchronous function.
///
/// Created by [`from_sync`].
pub struct SyncTask<F> {
    f: F,
}

/// Adapt a synchronous function into a [`Task`].
///
/// The function runs inline on the slot's executor thread, so it should be
/// short.
pub const fn from_sync<F, T, E>(f: F) -> SyncTask<F>
where
    F: FnMut() -> Result<T, E> + Send + 'static,
{
    SyncTask { f }
}

#[async_trait]
impl<F, T, E> Task<T, E> for SyncTask<F>
where
    F: FnMut() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&mut self) -> Result<T, E> {
        (self.f)()
    }
}

/// Per-submission options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    /// Maximum number of times the task is invoked before its outcome fails.
    pub attempts: u32,
    /// Backlog priority. 0 (the default) means unprioritized: appended to the
    /// backlog in FIFO order. Any nonzero value runs ahead of unprioritized
    /// entries, higher values first.
    pub priority: i32,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            attempts: 1,
            priority: 0,
        }
    }
}

impl TaskOptions {
    /// Options with one attempt and default priority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the backlog priority.
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.attempts == 0 {
            return Err(QueueError::InvalidArgument(
                "attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Identifier attached to every submission for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Awaitable bound to one submission's outcome.
///
/// Dropping the handle does not cancel the task; the queue still runs it.
pub struct TaskHandle<T, E> {
    id: SubmissionId,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) const fn new(id: SubmissionId, rx: oneshot::Receiver<Result<T, TaskError<E>>>) -> Self {
        Self { id, rx }
    }

    /// Identifier of the submission this handle belongs to.
    pub const fn id(&self) -> SubmissionId {
        self.id
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(TaskError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}
