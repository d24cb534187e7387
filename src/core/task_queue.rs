//! Concurrency-limited task queue.
//!
//! Runs at most `concurrency` tasks at once. Excess submissions wait in a
//! priority-ordered backlog. Each running task occupies a slot; when its
//! outcome settles the slot either picks up the backlog head or is released,
//! and the queue reports a drain when the last slot retires with nothing left
//! in the backlog.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

use super::notify::{DrainCallback, DrainNotifier, Drained, FlushHandle};
use super::retry::run_with_retry;
use super::state::{Admission, Advance, Effects, QueueState, SlotId, Start};
use super::stats::{QueueCounters, QueueStats};
use super::{QueueError, SubmissionId, Task, TaskHandle, TaskOptions};
use crate::config::QueueConfig;

/// Abstraction for spawning task execution on a runtime.
///
/// This is the asynchronous execution primitive the queue is parameterized
/// over. Every slot and every flushed task runs as one spawned future.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Type-erased submission: the retry wrapper plus outcome delivery.
type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Inner<S> {
    spawner: S,
    /// Slot registry and backlog. Never held across an await or while user
    /// code runs.
    state: Mutex<QueueState<Job>>,
    counters: Arc<QueueCounters>,
}

/// Concurrency-limited, priority-ordered task queue with retries.
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_task_queue::config::QueueConfig;
/// use prometheus_task_queue::core::{TaskOptions, TaskQueue};
/// use prometheus_task_queue::runtime::TokioSpawner;
///
/// let queue = TaskQueue::new(&QueueConfig::new().with_concurrency(2), TokioSpawner::current())?;
///
/// let handle = queue.add_with(
///     || async { fetch_page("https://example.com").await },
///     TaskOptions::new().with_attempts(3).with_priority(5),
/// )?;
///
/// let page = handle.await?;
/// queue.drained()?.await;
/// ```
pub struct TaskQueue<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TaskQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> TaskQueue<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Create a queue whose drains are observed through [`TaskQueue::drained`].
    pub fn new(config: &QueueConfig, spawner: S) -> Result<Self, QueueError> {
        Self::with_notifier(config, spawner, DrainNotifier::awaitable())
    }

    /// Create a queue that invokes `on_drain` every time it drains.
    ///
    /// The awaitable accessors are disabled on such a queue.
    pub fn with_drain_callback<F>(
        config: &QueueConfig,
        spawner: S,
        on_drain: F,
    ) -> Result<Self, QueueError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: DrainCallback = Arc::new(on_drain);
        Self::with_notifier(config, spawner, DrainNotifier::Callback(callback))
    }

    pub(crate) fn with_notifier(
        config: &QueueConfig,
        spawner: S,
        notifier: DrainNotifier,
    ) -> Result<Self, QueueError> {
        config.validate().map_err(QueueError::InvalidConfig)?;
        Ok(Self {
            inner: Arc::new(Inner {
                spawner,
                state: Mutex::new(QueueState::new(config.concurrency, notifier)),
                counters: Arc::new(QueueCounters::default()),
            }),
        })
    }

    /// Submit a task with one attempt and default priority.
    pub fn add<K, T, E>(&self, task: K) -> Result<TaskHandle<T, E>, QueueError>
    where
        K: Task<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.add_with(task, TaskOptions::default())
    }

    /// Submit a task.
    ///
    /// Starts it immediately when a slot is free, otherwise places it in the
    /// backlog. Never blocks; the returned handle settles once the task has
    /// succeeded or exhausted its attempts.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidArgument`] if `options` are invalid. No
    /// submission is created in that case. Zero attempts is rejected here
    /// rather than silently coerced to a single attempt.
    pub fn add_with<K, T, E>(
        &self,
        task: K,
        options: TaskOptions,
    ) -> Result<TaskHandle<T, E>, QueueError>
    where
        K: Task<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        options.validate()?;

        let id = SubmissionId::new();
        let (tx, rx) = oneshot::channel();
        let counters = Arc::clone(&self.inner.counters);
        let mut task = task;
        let job: Job = Box::pin(async move {
            QueueCounters::bump(&counters.started);
            let outcome = run_with_retry(&mut task, options.attempts, id, &counters).await;
            if outcome.is_ok() {
                QueueCounters::bump(&counters.succeeded);
            } else {
                QueueCounters::bump(&counters.failed);
            }
            if tx.send(outcome).is_err() {
                tracing::debug!("submission {} settled with no handle waiting", id);
            }
        });

        QueueCounters::bump(&self.inner.counters.submitted);
        let admission = self.inner.state.lock().admit(options.priority, job);
        match admission {
            Admission::Start(Start { slot, job }) => {
                tracing::debug!("submission {} started in slot {}", id, slot);
                Inner::spawn_slot(&self.inner, slot, job);
            }
            Admission::Queued { position } => {
                tracing::debug!(
                    "submission {} queued at position {} (priority {})",
                    id,
                    position,
                    options.priority
                );
            }
        }

        Ok(TaskHandle::new(id, rx))
    }

    /// Start every backlogged task now, ignoring the concurrency limit.
    ///
    /// The returned handle settles once every task that was active or
    /// backlogged at this point has settled, whether it failed or not.
    /// Tasks added while the flush is outstanding wait in the backlog and run
    /// under the normal limit afterwards. Once the flush settles, every free
    /// slot is refilled from the backlog up to the limit, not just one.
    ///
    /// Calling `flush` again before the previous flush settled is not
    /// supported; the later call joins the outstanding flush.
    pub fn flush(&self) -> FlushHandle {
        let (tx, rx) = oneshot::channel();
        QueueCounters::bump(&self.inner.counters.flushes);
        let effects = self.inner.state.lock().begin_flush(tx);
        tracing::info!("flushing {} backlog entries", effects.flush_runs.len());
        Inner::apply(&self.inner, effects);
        FlushHandle::new(rx)
    }

    /// Awaitable that settles on the next drain.
    ///
    /// Each drain settles all awaitables handed out before it; later calls
    /// return fresh ones, so the queue can be awaited again after reuse.
    /// Settles immediately if the queue is idle.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidState`] if the queue was built with a
    /// drain callback.
    pub fn drained(&self) -> Result<Drained, QueueError> {
        self.inner.state.lock().register_drain()
    }

    /// Number of backlogged submissions. Running tasks are not counted.
    pub fn len(&self) -> usize {
        self.inner.state.lock().backlog_len()
    }

    /// Whether the backlog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots currently running a task.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active_count()
    }

    /// No running task, no backlog and no outstanding flush.
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().is_idle()
    }

    /// Whether a flush is outstanding.
    pub fn is_flushing(&self) -> bool {
        self.inner.state.lock().is_flushing()
    }

    /// Configured maximum number of active slots.
    pub fn concurrency(&self) -> usize {
        self.inner.state.lock().concurrency()
    }

    /// Snapshot of utilization and lifetime counters.
    pub fn stats(&self) -> QueueStats {
        let (concurrency, active, queued, flushing) = {
            let state = self.inner.state.lock();
            (
                state.concurrency(),
                state.active_count(),
                state.backlog_len(),
                state.is_flushing(),
            )
        };
        self.inner
            .counters
            .snapshot(concurrency, active, queued, flushing)
    }
}

impl<S> IntoFuture for &TaskQueue<S>
where
    S: Spawn + Send + Sync + 'static,
{
    type Output = Result<(), QueueError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'static>>;

    /// Await the queue itself: resolves on the next drain.
    fn into_future(self) -> Self::IntoFuture {
        let drained = self.drained();
        Box::pin(async move {
            drained?.await;
            Ok(())
        })
    }
}

impl<S> Inner<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn spawn_slot(inner: &Arc<Self>, slot: SlotId, job: Job) {
        inner
            .spawner
            .spawn(Self::run_slot(Arc::clone(inner), slot, job));
    }

    /// Run jobs in one slot until the backlog has nothing left for it.
    fn run_slot(
        inner: Arc<Self>,
        slot: SlotId,
        job: Job,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(async move {
            let mut job = job;
            loop {
                job.await;
                let step = inner.state.lock().advance(slot);
                match step {
                    Advance::Continue(next) => {
                        tracing::debug!("slot {} picked up the next backlog entry", slot);
                        job = next;
                    }
                    Advance::Retire(effects) => {
                        tracing::debug!("slot {} released", slot);
                        Self::apply(&inner, effects);
                        break;
                    }
                }
            }
        })
    }

    fn spawn_flush_run(inner: &Arc<Self>, job: Job) {
        let inner_clone = Arc::clone(inner);
        inner.spawner.spawn(async move {
            job.await;
            let effects = inner_clone.state.lock().settle_flush_run();
            Self::apply(&inner_clone, effects);
        });
    }

    /// Apply the effects of a transition. Must be called without the state
    /// lock held: drain callbacks may submit new work.
    fn apply(inner: &Arc<Self>, effects: Effects<Job>) {
        let Effects {
            starts,
            flush_runs,
            flush_done,
            drain,
        } = effects;

        for job in flush_runs {
            Self::spawn_flush_run(inner, job);
        }
        if !flush_done.is_empty() {
            tracing::info!("flush settled");
            for waiter in flush_done {
                // The flush handle may have been dropped.
                let _ = waiter.send(());
            }
        }
        for Start { slot, job } in starts {
            tracing::debug!("slot {} started from backlog", slot);
            Self::spawn_slot(inner, slot, job);
        }
        if let Some(signal) = drain {
            QueueCounters::bump(&inner.counters.drains);
            tracing::info!("queue drained");
            signal.fire();
        }
    }
}
