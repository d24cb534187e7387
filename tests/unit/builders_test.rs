//! Tests for builder modules

use std::collections::HashMap;
use std::future::Future;

use prometheus_task_queue::builders::{build_queues, QueueBuilder};
use prometheus_task_queue::config::{QueueConfig, SchedulerConfig};
use prometheus_task_queue::core::{QueueError, Spawn};

#[derive(Clone)]
struct TokioTestSpawner;

impl Spawn for TokioTestSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fut);
    }
}

#[test]
fn test_queue_builder_defaults() {
    let builder = QueueBuilder::new();
    assert_eq!(builder.config().concurrency, 1);

    let queue = builder.build(TokioTestSpawner).unwrap();
    assert_eq!(queue.concurrency(), 1);
    assert!(queue.drained().is_ok());
}

#[test]
fn test_queue_builder_from_config() {
    let builder = QueueBuilder::from_config(QueueConfig::new().with_concurrency(4));
    assert_eq!(builder.config().concurrency, 4);

    let builder = builder.concurrency(7);
    assert_eq!(builder.build(TokioTestSpawner).unwrap().concurrency(), 7);
}

#[test]
fn test_queue_builder_rejects_zero_concurrency() {
    let result = QueueBuilder::new().concurrency(0).build(TokioTestSpawner);
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}

#[test]
fn test_queue_builder_callback_disables_awaitables() {
    let queue = QueueBuilder::new()
        .on_drain(|| {})
        .build(TokioTestSpawner)
        .unwrap();
    assert!(matches!(queue.drained(), Err(QueueError::InvalidState(_))));
}

#[test]
fn test_build_tokio_outside_runtime_fails() {
    let result = QueueBuilder::new().build_tokio();
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_build_queues_from_scheduler_config() {
    let mut queues = HashMap::new();
    queues.insert("uploads".to_string(), QueueConfig::new().with_concurrency(3));
    queues.insert("emails".to_string(), QueueConfig::new());
    let config = SchedulerConfig { queues };

    let built = build_queues(&config, &TokioTestSpawner).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built["uploads"].concurrency(), 3);
    assert_eq!(built["emails"].concurrency(), 1);

    let value = built["uploads"]
        .add(|| async { Ok::<_, String>("uploaded") })
        .unwrap()
        .await
        .unwrap();
    assert_eq!(value, "uploaded");
}

#[test]
fn test_build_queues_rejects_empty_config() {
    let result = build_queues(&SchedulerConfig::default(), &TokioTestSpawner);
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}
