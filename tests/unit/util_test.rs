//! Tests for utility functions

use prometheus_task_queue::util::{init_tracing, init_tracing_with_default};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with_default("prometheus_task_queue=debug");
    // A subscriber is already installed; these must not panic.
    init_tracing();
    init_tracing_with_default("warn");
    tracing::debug!("tracing initialized");
}
