//! Job registry plus ready queue, always mutated under one lock.

use crate::job::{Job, JobId, JobPriority, JobSnapshot, JobState};
use crate::queue::PriorityQueue;
use crate::status::QueueStatus;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A job handed out for one attempt.
pub(crate) struct Attempt<P> {
    pub id: JobId,
    pub payload: Arc<P>,
    pub priority: JobPriority,
    pub attempt: u32,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureOutcome {
    Retry { attempt: u32, deadline: Instant },
    Failed { attempts: u32 },
}

pub(crate) struct Store<P> {
    jobs: BTreeMap<JobId, Job<P>>,
    ready: PriorityQueue<JobId>,
    // Pending jobs held out of `ready` until their retry timer fires.
    waiting: HashSet<JobId>,
}

impl<P> Store<P> {
    pub fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
            ready: PriorityQueue::new(),
            waiting: HashSet::new(),
        }
    }

    /// Register a new job and make it ready.
    pub fn insert(&mut self, mut job: Job<P>) {
        job.seq = self.ready.enqueue(job.priority, job.id);
        self.jobs.insert(job.id, job);
    }

    /// Pop the next ready job and mark it processing.
    pub fn next_ready(&mut self) -> Option<Attempt<P>> {
        while let Some(id) = self.ready.dequeue_next() {
            let Some(job) = self.jobs.get_mut(&id) else {
                continue;
            };
            if job.state != JobState::Pending {
                continue;
            }
            job.start_processing();
            return Some(Attempt {
                id,
                payload: Arc::clone(&job.payload),
                priority: job.priority,
                attempt: job.attempts,
            });
        }
        None
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Record a successful attempt; returns the attempts used.
    pub fn complete(&mut self, id: JobId) -> Option<u32> {
        let job = self.jobs.get_mut(&id)?;
        job.complete();
        Some(job.attempts)
    }

    /// Record a failed attempt and decide the job's fate.
    pub fn fail(&mut self, id: JobId, error: String, retry_delay: Duration) -> Option<FailureOutcome> {
        let job = self.jobs.get_mut(&id)?;
        let outcome = match job.fail(error, retry_delay) {
            Some(deadline) => FailureOutcome::Retry {
                attempt: job.attempts,
                deadline,
            },
            None => FailureOutcome::Failed {
                attempts: job.attempts,
            },
        };
        if matches!(outcome, FailureOutcome::Retry { .. }) {
            self.waiting.insert(id);
        }
        Some(outcome)
    }

    /// Move a job whose retry delay elapsed back into the ready queue.
    ///
    /// It keeps its priority and goes to the back of its tier.
    pub fn requeue(&mut self, id: JobId) -> bool {
        if !self.waiting.remove(&id) {
            return false;
        }
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if job.state != JobState::Pending {
            return false;
        }
        job.seq = self.ready.enqueue(job.priority, id);
        true
    }

    /// Jobs waiting out a retry delay are not in the queue; they only show
    /// up in `scheduled` until their timer puts them back.
    pub fn status(&self) -> QueueStatus {
        let mut status = QueueStatus {
            scheduled: self.waiting.len(),
            ..QueueStatus::default()
        };
        for (id, job) in &self.jobs {
            match job.state {
                JobState::Pending if self.waiting.contains(id) => {}
                JobState::Pending => status.pending += 1,
                JobState::Processing => status.processing += 1,
                JobState::Completed => status.completed += 1,
                JobState::Failed => status.failed += 1,
            }
        }
        status.queue_length = status.pending + status.processing;
        status
    }

    /// Remove completed jobs, and failed ones too when asked.
    ///
    /// Pending and processing jobs are never touched.
    pub fn sweep(&mut self, include_failed: bool) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.state {
            JobState::Completed => false,
            JobState::Failed => !include_failed,
            JobState::Pending | JobState::Processing => true,
        });
        before - self.jobs.len()
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.get(id).map(Job::snapshot)
    }

    /// Every tracked job, oldest first.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.jobs.values().map(Job::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn add(store: &mut Store<u32>, payload: u32, priority: JobPriority) -> JobId {
        let id = Uuid::now_v7();
        store.insert(Job::new(id, payload, priority, 3));
        id
    }

    fn force_state(store: &mut Store<u32>, id: JobId, state: JobState) {
        if let Some(job) = store.jobs.get_mut(&id) {
            job.state = state;
        }
    }

    #[test]
    fn test_next_ready_marks_processing() {
        let mut store = Store::new();
        let id = add(&mut store, 7, JobPriority::Normal);

        let attempt = store.next_ready().unwrap();
        assert_eq!(attempt.id, id);
        assert_eq!(*attempt.payload, 7);
        assert_eq!(attempt.attempt, 1);
        assert_eq!(store.get(&id).unwrap().state, JobState::Processing);
        assert!(store.next_ready().is_none());
    }

    #[test]
    fn test_sweep_keeps_unfinished_and_failed() {
        let mut store = Store::new();
        let states = [
            JobState::Completed,
            JobState::Completed,
            JobState::Pending,
            JobState::Failed,
            JobState::Processing,
        ];
        for (n, state) in states.into_iter().enumerate() {
            let id = add(&mut store, n as u32, JobPriority::Normal);
            force_state(&mut store, id, state);
        }

        assert_eq!(store.sweep(false), 2);

        let remaining: Vec<JobState> = store.snapshots().into_iter().map(|j| j.state).collect();
        assert_eq!(
            remaining,
            vec![JobState::Pending, JobState::Failed, JobState::Processing]
        );

        assert_eq!(store.sweep(true), 1);
        assert_eq!(store.snapshots().len(), 2);
    }

    #[test]
    fn test_retry_is_held_out_until_requeued() {
        let mut store = Store::new();
        let id = add(&mut store, 1, JobPriority::High);
        let other = add(&mut store, 2, JobPriority::Low);

        store.next_ready().unwrap();
        let outcome = store.fail(id, "smtp down".to_string(), Duration::from_secs(5));
        let Some(FailureOutcome::Retry { attempt: 1, deadline }) = outcome else {
            panic!("expected a retry, got {outcome:?}");
        };
        assert_eq!(store.jobs[&id].retry_deadline, Some(deadline));

        let status = store.status();
        assert_eq!(status.pending, 1);
        assert_eq!(status.queue_length, 1);
        assert_eq!(status.scheduled, 1);
        assert!(!status.is_idle());
        assert_eq!(store.ready_len(), 1);

        // Only the low job is ready while the high one waits.
        assert_eq!(store.next_ready().unwrap().id, other);
        assert!(store.next_ready().is_none());

        assert!(store.requeue(id));
        assert!(!store.requeue(id));
        let status = store.status();
        assert_eq!(status.scheduled, 0);
        assert_eq!(status.pending, 1);
        let attempt = store.next_ready().unwrap();
        assert_eq!(attempt.id, id);
        assert_eq!(attempt.priority, JobPriority::High);
        assert_eq!(attempt.attempt, 2);
        assert!(store.get(&id).unwrap().retry_at.is_none());
    }

    #[test]
    fn test_exhausted_job_fails() {
        let mut store = Store::new();
        let id = add(&mut store, 1, JobPriority::Normal);

        for expected in 1..=3 {
            let attempt = store.next_ready().unwrap();
            assert_eq!(attempt.attempt, expected);
            let outcome = store.fail(id, "boom".to_string(), Duration::from_millis(10));
            if expected < 3 {
                assert!(store.requeue(id));
            } else {
                assert_eq!(outcome, Some(FailureOutcome::Failed { attempts: 3 }));
            }
        }

        let status = store.status();
        assert_eq!(status.failed, 1);
        assert_eq!(status.queue_length, 0);
        assert!(!store.requeue(id));
    }

    #[test]
    fn test_status_invariant() {
        let mut store = Store::new();
        for n in 0..5 {
            add(&mut store, n, JobPriority::Normal);
        }
        let first = store.next_ready().unwrap();
        store.complete(first.id);
        store.next_ready().unwrap();

        let status = store.status();
        assert_eq!(status.completed, 1);
        assert_eq!(status.processing, 1);
        assert_eq!(status.pending, 3);
        assert_eq!(status.queue_length, status.pending + status.processing);
    }
}
