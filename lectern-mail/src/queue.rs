//! Queued, retrying email delivery.

use lectern_queue::{JobId, JobPriority, JobQueue, QueueConfig, QueueResult};
use tracing::info;

use crate::{Email, Mailer};

/// The notification queue: jobs are emails, the [`Mailer`] delivers them.
pub type EmailQueue = JobQueue<Email>;

/// Build an [`EmailQueue`] around a mailer.
pub trait MailerQueueExt {
    /// Create a queue on the current Tokio runtime that delivers through
    /// this mailer.
    fn into_queue(self, config: QueueConfig) -> QueueResult<EmailQueue>;
}

impl MailerQueueExt for Mailer {
    fn into_queue(self, config: QueueConfig) -> QueueResult<EmailQueue> {
        info!(
            transport = self.transport_name(),
            max_attempts = config.max_attempts,
            retry_delay_ms = config.retry_delay.as_millis() as u64,
            "Email queue initialized"
        );
        JobQueue::new(self, config)
    }
}

/// Enqueue helpers that log the recipients of each email.
pub trait EnqueueEmail {
    /// Queue `email` and return immediately.
    fn send_later(&self, email: Email, priority: JobPriority) -> JobId;
}

impl EnqueueEmail for EmailQueue {
    fn send_later(&self, email: Email, priority: JobPriority) -> JobId {
        let to: Vec<String> = email.to.iter().map(|a| a.email.clone()).collect();
        let subject = email.subject.clone();
        let id = self.enqueue(email, priority);
        info!(job_id = %id, to = ?to, subject = ?subject, priority = %priority, "Email queued");
        id
    }
}
