//! The queue processor: one drain loop delivering jobs through a handler.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::handler::JobHandler;
use crate::job::{Job, JobId, JobPriority, JobSnapshot};
use crate::scheduler::RetryScheduler;
use crate::status::QueueStatus;
use crate::store::{Attempt, FailureOutcome, Store};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// In-process priority job queue with retries.
///
/// Cloning is cheap; clones share the same jobs. Build one at startup and
/// hand clones to whoever needs to enqueue.
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use lectern_queue::{HandlerError, JobHandler, JobPriority, JobQueue, QueueConfig};
///
/// struct Printer;
///
/// #[async_trait]
/// impl JobHandler<String> for Printer {
///     async fn handle(&self, payload: &String) -> Result<(), HandlerError> {
///         println!("{payload}");
///         Ok(())
///     }
/// }
///
/// # async fn example() -> lectern_queue::QueueResult<()> {
/// let queue = JobQueue::new(Printer, QueueConfig::default())?;
/// queue.enqueue("hello".to_string(), JobPriority::High);
/// queue.wait_idle().await;
/// # Ok(())
/// # }
/// ```
pub struct JobQueue<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for JobQueue<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    store: Mutex<Store<P>>,
    // Set while a drain task is running. Cleared only under the store lock,
    // after the drain observed an empty ready queue.
    draining: AtomicBool,
    handler: Arc<dyn JobHandler<P>>,
    config: QueueConfig,
    scheduler: RetryScheduler,
    idle: Notify,
}

impl<P> JobQueue<P>
where
    P: Send + Sync + 'static,
{
    /// Create a queue driven by the current Tokio runtime.
    pub fn new<H>(handler: H, config: QueueConfig) -> QueueResult<Self>
    where
        H: JobHandler<P>,
    {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Self::with_runtime(handler, config, runtime)
    }

    /// Create a queue driven by an explicit runtime.
    pub fn with_runtime<H>(handler: H, config: QueueConfig, runtime: Handle) -> QueueResult<Self>
    where
        H: JobHandler<P>,
    {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::new()),
                draining: AtomicBool::new(false),
                handler: Arc::new(handler),
                config,
                scheduler: RetryScheduler::new(runtime),
                idle: Notify::new(),
            }),
        })
    }

    /// Add a job and wake the processor if it is idle.
    ///
    /// Never fails and never waits for delivery; delivery errors are only
    /// visible through [`status`](Self::status), [`job`](Self::job) and logs.
    pub fn enqueue(&self, payload: P, priority: JobPriority) -> JobId {
        let id = Uuid::now_v7();
        let job = Job::new(id, payload, priority, self.inner.config.max_attempts);

        let ready = {
            let mut store = self.inner.store.lock();
            store.insert(job);
            store.ready_len()
        };
        debug!(job_id = %id, priority = %priority, ready, "Job enqueued");

        self.inner.kick();
        id
    }

    /// Counts by state.
    pub fn status(&self) -> QueueStatus {
        self.inner.store.lock().status()
    }

    /// Look up one job.
    pub fn job(&self, id: &JobId) -> Option<JobSnapshot> {
        self.inner.store.lock().get(id)
    }

    /// Every tracked job, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.inner.store.lock().snapshots()
    }

    /// Remove completed jobs; returns how many were removed.
    pub fn sweep_completed(&self) -> usize {
        self.sweep(false)
    }

    pub(crate) fn sweep(&self, include_failed: bool) -> usize {
        self.inner.store.lock().sweep(include_failed)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Whether a drain loop is currently running.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Resolve once no job is pending, processing, or waiting on a retry
    /// timer.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.status().is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn runtime(&self) -> &Handle {
        self.inner.scheduler.runtime()
    }
}

impl<P> Inner<P>
where
    P: Send + Sync + 'static,
{
    /// Start a drain unless one is already running.
    fn kick(self: &Arc<Self>) {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let inner = Arc::clone(self);
            self.scheduler.runtime().spawn(inner.drain());
        }
    }

    async fn drain(self: Arc<Self>) {
        debug!("Drain started");
        loop {
            let next = {
                let mut store = self.store.lock();
                let next = store.next_ready();
                if next.is_none() {
                    self.draining.store(false, Ordering::Release);
                }
                next
            };

            let Some(attempt) = next else {
                debug!("Drain finished");
                self.idle.notify_waiters();
                return;
            };

            debug!(
                job_id = %attempt.id,
                priority = %attempt.priority,
                attempt = attempt.attempt,
                "Processing job"
            );
            let result = self.deliver(&attempt).await;
            self.settle(&attempt, result);
            self.idle.notify_waiters();
        }
    }

    // Runs the handler in its own task; a panic becomes a failed attempt.
    async fn deliver(&self, attempt: &Attempt<P>) -> Result<(), String> {
        let handler = Arc::clone(&self.handler);
        let payload = Arc::clone(&attempt.payload);

        let task = self.scheduler.runtime().spawn(async move {
            handler.handle(&payload).await.map_err(|e| e.to_string())
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err("handler panicked".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn settle(self: &Arc<Self>, attempt: &Attempt<P>, result: Result<(), String>) {
        let id = attempt.id;

        let error = match result {
            Ok(()) => {
                let attempts = self.store.lock().complete(id);
                info!(job_id = %id, attempts = attempts.unwrap_or(attempt.attempt), "Job completed");
                return;
            }
            Err(error) => error,
        };

        let outcome = self
            .store
            .lock()
            .fail(id, error.clone(), self.config.retry_delay);

        match outcome {
            Some(FailureOutcome::Retry { attempt: failed, deadline }) => {
                warn!(
                    job_id = %id,
                    attempt = failed,
                    max_attempts = self.config.max_attempts,
                    retry_in_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
                    error = %error,
                    "Job attempt failed, retry scheduled"
                );
                let weak: Weak<Self> = Arc::downgrade(self);
                self.scheduler.schedule_at(deadline, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.requeue(id);
                    }
                });
            }
            Some(FailureOutcome::Failed { attempts }) => {
                error!(job_id = %id, attempts, error = %error, "Job failed permanently");
            }
            None => {}
        }
    }

    fn requeue(self: &Arc<Self>, id: JobId) {
        let requeued = self.store.lock().requeue(id);
        if requeued {
            debug!(job_id = %id, "Retry re-enqueued");
            self.kick();
        }
    }
}
