//! # Prometheus Task Queue
//!
//! A concurrency-limited, priority-ordered async task queue with retries and
//! drain notification.
//!
//! Callers submit units of asynchronous work; the queue runs at most N of them
//! concurrently, holds the rest in a priority-ordered backlog, retries failing
//! tasks up to a per-submission attempt count, and reports every time it
//! drains to empty.
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: At most `concurrency` tasks occupy a slot at once
//! - **Priority backlog**: Higher priority runs sooner, FIFO within a priority
//! - **Immediate retries**: Failed attempts (errors or panics) are re-run with no delay
//! - **Flush**: Release the whole backlog at once, bypassing the limit
//! - **Drain notification**: A repeatable callback, or awaitables that can be reused
//! - **Runtime-agnostic**: Generic over a [`core::Spawn`] implementation; Tokio by default
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_task_queue::builders::QueueBuilder;
//! use prometheus_task_queue::core::TaskOptions;
//!
//! let queue = QueueBuilder::new().concurrency(2).build_tokio()?;
//!
//! let report = queue.add_with(
//!     || async { render_report().await },
//!     TaskOptions::new().with_priority(10).with_attempts(3),
//! )?;
//! queue.add(|| async { send_digest().await })?;
//!
//! let rendered = report.await?;
//!
//! // The queue itself can be awaited until it drains.
//! (&queue).await?;
//! ```
//!
//! For complete examples, see `tests/task_queue_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task queue, backlog ordering, retry wrapper and drain notification.
pub mod core;
/// Configuration models for queues.
pub mod config;
/// Builders to construct queues from configuration.
pub mod builders;
/// Runtime adapters implementing the spawn primitive.
pub mod runtime;
/// Shared utilities.
pub mod util;
