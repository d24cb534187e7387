//! Tests for error types

use prometheus_task_queue::core::{QueueError, TaskError};

#[test]
fn test_invalid_argument_error() {
    let err = QueueError::InvalidArgument("attempts must be at least 1".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid argument: attempts must be at least 1"
    );
}

#[test]
fn test_invalid_state_error() {
    let err = QueueError::InvalidState("drain callback configured".to_string());
    assert_eq!(format!("{}", err), "invalid state: drain callback configured");
}

#[test]
fn test_invalid_config_error() {
    let err = QueueError::InvalidConfig("concurrency must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: concurrency must be greater than 0"
    );
}

#[test]
fn test_task_failure_keeps_own_error() {
    let err: TaskError<std::io::Error> = TaskError::Failed(std::io::Error::other("disk full"));
    assert_eq!(format!("{}", err), "disk full");
    assert!(err.is_task_failure());
    assert_eq!(err.into_failed().map(|e| e.to_string()), Some("disk full".to_string()));
}

#[test]
fn test_unknown_and_abandoned_errors() {
    let unknown: TaskError<String> = TaskError::Unknown;
    assert_eq!(format!("{}", unknown), "Unknown Error");
    assert!(unknown.is_task_failure());
    assert!(unknown.into_failed().is_none());

    let abandoned: TaskError<String> = TaskError::Abandoned;
    assert!(!abandoned.is_task_failure());
}

#[test]
fn test_queue_error_into_anyhow() {
    fn submit() -> prometheus_task_queue::core::AppResult<()> {
        Err(QueueError::InvalidArgument("attempts must be at least 1".into()))?;
        Ok(())
    }
    let err = submit().unwrap_err();
    assert!(err.to_string().contains("attempts"));
    assert!(err.downcast_ref::<QueueError>().is_some());
}
