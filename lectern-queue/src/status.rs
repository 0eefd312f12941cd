//! Point-in-time counts of the queue's jobs.

use serde::{Deserialize, Serialize};

/// Snapshot returned by [`JobQueue::status`](crate::JobQueue::status).
///
/// All counts are taken under one lock, so they are mutually consistent:
/// `queue_length == pending + processing` always holds. A job waiting on a
/// retry timer is out of the queue until the timer fires: it is counted in
/// `scheduled` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Jobs in the queue: pending plus processing
    pub queue_length: usize,
    /// Jobs ready for an attempt
    pub pending: usize,
    /// Jobs currently handed to the handler (0 or 1)
    pub processing: usize,
    /// Jobs that exhausted their attempts
    pub failed: usize,
    /// Delivered jobs awaiting the janitor
    pub completed: usize,
    /// Jobs held out of the queue by a retry timer
    pub scheduled: usize,
}

impl QueueStatus {
    /// Nothing is queued, processing, or waiting to be retried.
    pub fn is_idle(&self) -> bool {
        self.queue_length == 0 && self.scheduled == 0
    }
}
