//! Deferred tasks on the queue's runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs callbacks after a delay on a captured Tokio runtime.
///
/// Timers use `tokio::time`, so a runtime with a paused clock
/// (`#[tokio::test(start_paused = true)]`) drives them in virtual time.
#[derive(Clone)]
pub struct RetryScheduler {
    runtime: Handle,
    armed: Arc<AtomicUsize>,
}

impl RetryScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            armed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `task` once `delay` has elapsed.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(Instant::now() + delay, task)
    }

    /// Run `task` at `deadline` on the runtime clock.
    pub fn schedule_at<F>(&self, deadline: Instant, task: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let armed = Arc::clone(&self.armed);
        armed.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            armed.fetch_sub(1, Ordering::AcqRel);
            task();
        })
    }

    /// Timers that have not fired yet.
    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let scheduler = RetryScheduler::new(Handle::current());
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        let handle = scheduler.schedule(Duration::from_secs(10), move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scheduler.armed(), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(!fired.load(Ordering::SeqCst));

        handle.await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(scheduler.armed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline() {
        let scheduler = RetryScheduler::new(Handle::current());
        let deadline = Instant::now() + Duration::from_secs(3);

        let handle = scheduler.schedule_at(deadline, || {});
        handle.await.unwrap();
        assert_eq!(Instant::now(), deadline);
    }
}
