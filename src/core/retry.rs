//! Retry wrapper applied to every task execution.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::stats::QueueCounters;
use super::{SubmissionId, Task, TaskError};

/// Run `task` until it succeeds or `max_attempts` invocations have failed.
///
/// Retries are immediate. A panic inside the task counts as a failed attempt.
/// The returned error is always the one observed on the last attempt.
pub(crate) async fn run_with_retry<K, T, E>(
    task: &mut K,
    max_attempts: u32,
    id: SubmissionId,
    counters: &QueueCounters,
) -> Result<T, TaskError<E>>
where
    K: Task<T, E>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let failure = match AssertUnwindSafe(task.run()).catch_unwind().await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => TaskError::Failed(e),
            Err(payload) => panic_failure(payload.as_ref()),
        };

        if attempt >= max_attempts {
            if max_attempts > 1 {
                tracing::warn!("submission {} failed after {} attempts", id, attempt);
            }
            return Err(failure);
        }

        tracing::debug!(
            "submission {} attempt {}/{} failed, retrying",
            id,
            attempt,
            max_attempts
        );
        QueueCounters::bump(&counters.retried);
        attempt += 1;
    }
}

/// Convert a panic payload into a task failure.
fn panic_failure<E>(payload: &(dyn Any + Send)) -> TaskError<E> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        TaskError::Panicked((*msg).to_string())
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        TaskError::Panicked(msg.clone())
    } else {
        TaskError::Unknown
    }
}
