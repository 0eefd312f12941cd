//! Job definition and state management.

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Job unique identifier.
///
/// Version 7 UUIDs: time-ordered with a random tail, so identifiers minted in
/// the same millisecond never collide and sort by creation time.
pub type JobId = Uuid;

/// Job priority levels.
///
/// The discriminants define the dequeue order: a higher value is served first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    /// Lowest priority
    Low = 0,
    /// Normal priority (default)
    #[default]
    Normal = 1,
    /// High priority
    High = 2,
}

impl JobPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Low => "low",
            JobPriority::Normal => "normal",
            JobPriority::High => "high",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(JobPriority::Low),
            "normal" => Ok(JobPriority::Normal),
            "high" => Ok(JobPriority::High),
            _ => Err(QueueError::InvalidPriority(s.to_string())),
        }
    }
}

/// Job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting in the ready queue, or waiting for its retry timer
    Pending,
    /// Handed to the handler
    Processing,
    /// Delivered
    Completed,
    /// Every attempt failed
    Failed,
}

impl JobState {
    /// Completed and failed jobs are never attempted again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A unit of queued work.
#[derive(Debug)]
pub struct Job<P> {
    /// Unique job identifier
    pub id: JobId,

    /// Job payload, opaque to the queue
    pub payload: Arc<P>,

    /// Job priority
    pub priority: JobPriority,

    /// Current state
    pub state: JobState,

    /// Number of attempts started so far
    pub attempts: u32,

    /// Attempt ceiling
    pub max_attempts: u32,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// `created_at` on the runtime clock that drives retry timers
    pub created_instant: Instant,

    /// When the pending retry fires, on the runtime clock
    pub retry_deadline: Option<Instant>,

    /// `retry_deadline` as a timestamp, offset from `created_at`
    pub retry_at: Option<DateTime<Utc>>,

    /// Insertion sequence of the job's latest entry into the ready queue
    pub seq: u64,

    /// Message of the most recent failure
    pub last_error: Option<String>,
}

impl<P> Job<P> {
    /// Create a new pending job.
    pub fn new(id: JobId, payload: P, priority: JobPriority, max_attempts: u32) -> Self {
        Self {
            id,
            payload: Arc::new(payload),
            priority,
            state: JobState::Pending,
            attempts: 0,
            max_attempts,
            created_at: Utc::now(),
            created_instant: Instant::now(),
            retry_deadline: None,
            retry_at: None,
            seq: 0,
            last_error: None,
        }
    }

    /// Check if another attempt is allowed.
    pub fn can_retry(&self) -> bool {
        !self.state.is_terminal() && self.attempts < self.max_attempts
    }

    /// Mark job as processing.
    pub fn start_processing(&mut self) {
        self.state = JobState::Processing;
        self.retry_deadline = None;
        self.retry_at = None;
        self.attempts += 1;
    }

    /// Mark job as completed.
    pub fn complete(&mut self) {
        self.state = JobState::Completed;
    }

    /// Record a failed attempt.
    ///
    /// Returns the deadline of the next attempt, or `None` when every
    /// attempt is spent and the job is now failed.
    pub fn fail(&mut self, error: String, retry_delay: Duration) -> Option<Instant> {
        self.last_error = Some(error);

        if self.attempts < self.max_attempts {
            let deadline = Instant::now() + self.backoff_delay(retry_delay);
            self.state = JobState::Pending;
            self.retry_deadline = Some(deadline);
            self.retry_at = self.timestamp(deadline);
            Some(deadline)
        } else {
            self.state = JobState::Failed;
            self.retry_deadline = None;
            self.retry_at = None;
            None
        }
    }

    // Wall-clock rendering of a runtime instant, anchored at creation.
    fn timestamp(&self, at: Instant) -> Option<DateTime<Utc>> {
        let since_created = chrono::Duration::from_std(at.saturating_duration_since(self.created_instant)).ok()?;
        self.created_at.checked_add_signed(since_created)
    }

    /// Linear backoff: `retry_delay * attempts`.
    pub fn backoff_delay(&self, retry_delay: Duration) -> Duration {
        retry_delay.saturating_mul(self.attempts.max(1))
    }

    /// Payload-free view of the job.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            priority: self.priority,
            state: self.state,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            created_at: self.created_at,
            retry_at: self.retry_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only copy of a job record without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub priority: JobPriority,
    pub state: JobState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
