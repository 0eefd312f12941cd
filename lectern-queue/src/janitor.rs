//! Periodic removal of finished jobs.

use crate::config::JanitorConfig;
use crate::error::QueueResult;
use crate::processor::JobQueue;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Sweeps completed jobs out of a queue on a fixed interval.
///
/// Pending and processing jobs are never touched. Failed jobs are kept
/// unless [`JanitorConfig::sweep_failed`] is set.
pub struct Janitor<P> {
    queue: JobQueue<P>,
    config: JanitorConfig,
}

impl<P> Janitor<P>
where
    P: Send + Sync + 'static,
{
    pub fn new(queue: JobQueue<P>, config: JanitorConfig) -> Self {
        Self { queue, config }
    }

    /// Run a single sweep now; returns the number of jobs removed.
    pub fn run_once(&self) -> usize {
        let removed = self.queue.sweep(self.config.sweep_failed);
        if removed > 0 {
            info!(removed, "Cleaned up finished jobs");
        } else {
            debug!("Nothing to clean up");
        }
        removed
    }

    /// Sweep every `interval` on the queue's runtime, starting one interval
    /// from now.
    pub fn spawn(self) -> QueueResult<JoinHandle<()>> {
        self.config.validate()?;

        let period = self.config.interval;
        let runtime = self.queue.runtime().clone();

        Ok(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once();
            }
        }))
    }
}
