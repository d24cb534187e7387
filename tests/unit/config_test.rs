//! Tests for configuration structures

use prometheus_task_queue::config::{QueueConfig, SchedulerConfig, CONCURRENCY_ENV};

#[test]
fn test_queue_config_defaults() {
    let config = QueueConfig::default();
    assert_eq!(config.concurrency, 1);
    assert_eq!(config, QueueConfig::new());
}

#[test]
fn test_queue_config_serialization_roundtrip() {
    let config = QueueConfig::new().with_concurrency(6);
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(json, r#"{"concurrency":6}"#);

    let parsed = QueueConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_queue_config_rejects_zero_concurrency() {
    let err = QueueConfig::from_json_str(r#"{"concurrency":0}"#).unwrap_err();
    assert!(err.contains("greater than 0"));
}

#[test]
fn test_queue_config_from_lookup_reads_concurrency() {
    let config = QueueConfig::from_lookup(|key| {
        assert_eq!(key, CONCURRENCY_ENV);
        Some("3".to_string())
    })
    .unwrap();
    assert_eq!(config.concurrency, 3);
}

#[test]
fn test_scheduler_config_multiple_queues() {
    let json = r#"{
        "queues": {
            "thumbnails": { "concurrency": 8 },
            "webhooks": { "concurrency": 2 },
            "reports": {}
        }
    }"#;
    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.queues.len(), 3);
    assert_eq!(config.queues["thumbnails"].concurrency, 8);
    assert_eq!(config.queues["webhooks"].concurrency, 2);
    assert_eq!(config.queues["reports"].concurrency, 1);
}

#[test]
fn test_scheduler_config_names_invalid_queue() {
    let json = r#"{ "queues": { "webhooks": { "concurrency": 0 } } }"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("webhooks"));

    assert!(SchedulerConfig::from_json_str(r#"{ "queues": {} }"#).is_err());
}
