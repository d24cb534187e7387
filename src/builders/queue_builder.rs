//! Builders to construct task queues from configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{QueueConfig, SchedulerConfig};
use crate::core::notify::DrainNotifier;
use crate::core::{DrainCallback, QueueError, Spawn, TaskQueue};

/// Step-by-step construction of a [`TaskQueue`].
///
/// ```rust,ignore
/// let queue = QueueBuilder::new()
///     .concurrency(4)
///     .on_drain(|| tracing::info!("uploads drained"))
///     .build(TokioSpawner::current())?;
/// ```
#[derive(Clone, Default)]
pub struct QueueBuilder {
    config: QueueConfig,
    on_drain: Option<DrainCallback>,
}

impl QueueBuilder {
    /// Builder with default configuration and awaitable drain notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder starting from an existing configuration.
    pub fn from_config(config: QueueConfig) -> Self {
        Self {
            config,
            on_drain: None,
        }
    }

    /// Set the maximum number of concurrently running tasks.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Report drains through a repeatable callback instead of awaitables.
    #[must_use]
    pub fn on_drain<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_drain = Some(Arc::new(callback));
        self
    }

    /// Configuration the queue will be built with.
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Build the queue on the given spawner.
    pub fn build<S>(self, spawner: S) -> Result<TaskQueue<S>, QueueError>
    where
        S: Spawn + Send + Sync + 'static,
    {
        let notifier = match self.on_drain {
            Some(callback) => DrainNotifier::Callback(callback),
            None => DrainNotifier::awaitable(),
        };
        TaskQueue::with_notifier(&self.config, spawner, notifier)
    }

    /// Build the queue on the current Tokio runtime.
    #[cfg(feature = "tokio-runtime")]
    pub fn build_tokio(self) -> Result<TaskQueue<crate::runtime::TokioSpawner>, QueueError> {
        let spawner = crate::runtime::TokioSpawner::try_current()?;
        self.build(spawner)
    }
}

impl fmt::Debug for QueueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("config", &self.config)
            .field("on_drain", &self.on_drain.is_some())
            .finish()
    }
}

/// Build one queue per configured name, all sharing a spawner.
pub fn build_queues<S>(
    cfg: &SchedulerConfig,
    spawner: &S,
) -> Result<HashMap<String, TaskQueue<S>>, QueueError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate()
        .map_err(|e| QueueError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut queues = HashMap::new();
    for (name, queue_cfg) in &cfg.queues {
        let queue = QueueBuilder::from_config(queue_cfg.clone()).build(spawner.clone())?;
        tracing::debug!("built queue `{}` with concurrency {}", name, queue_cfg.concurrency);
        queues.insert(name.clone(), queue);
    }

    Ok(queues)
}
