//! In-process priority job queue for Lectern.
//!
//! Decouples request handling from slow, failure-prone deliveries such as
//! outbound email. Callers [`enqueue`](JobQueue::enqueue) a payload and return
//! immediately; a single background drain loop hands jobs to a
//! [`JobHandler`] one at a time.
//!
//! # Semantics
//!
//! - `High` jobs go before `Normal`, `Normal` before `Low`; FIFO within a tier.
//! - At most one job is processing at any moment.
//! - A failed attempt is retried after `retry_delay * attempts` (linear
//!   backoff) at the job's original priority, until `max_attempts` is spent.
//!   The job is then `Failed` and kept for inspection.
//! - Nothing is persisted. Jobs still queued when the process exits are lost.
//! - A [`Janitor`] periodically removes completed jobs.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lectern_queue::prelude::*;
//!
//! struct Notifier;
//!
//! #[async_trait]
//! impl JobHandler<String> for Notifier {
//!     async fn handle(&self, to: &String) -> Result<(), HandlerError> {
//!         tracing::info!(%to, "Notified");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> QueueResult<()> {
//! let queue = JobQueue::new(Notifier, QueueConfig::default())?;
//! Janitor::new(queue.clone(), JanitorConfig::default()).spawn()?;
//!
//! queue.enqueue("chair@iccict.org".to_string(), JobPriority::High);
//! println!("{:?}", queue.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod janitor;
pub mod job;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod status;

mod store;

pub use config::{JanitorConfig, QueueConfig};
pub use error::{HandlerError, QueueError, QueueResult};
pub use handler::JobHandler;
pub use janitor::Janitor;
pub use job::{Job, JobId, JobPriority, JobSnapshot, JobState};
pub use processor::JobQueue;
pub use queue::PriorityQueue;
pub use scheduler::RetryScheduler;
pub use status::QueueStatus;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::{JanitorConfig, QueueConfig};
    pub use crate::error::{HandlerError, QueueError, QueueResult};
    pub use crate::handler::JobHandler;
    pub use crate::janitor::Janitor;
    pub use crate::job::{JobId, JobPriority, JobSnapshot, JobState};
    pub use crate::processor::JobQueue;
    pub use crate::status::QueueStatus;
}
