//! Integration tests for common Lectern workflows.
//!
//! Each test drives a notification from builder to delivery through the
//! queue, using an in-memory transport.

use async_trait::async_trait;
use lectern::mail::notifications::{self, ExpressionStatus, Registration, ReviewerExpression, RolePreference};
use lectern::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// =============================================================================
// Test transports
// =============================================================================

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<Email>>,
    failures_left: AtomicU32,
}

impl Outbox {
    fn failing(times: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(times),
            ..Self::default()
        })
    }

    fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|e| e.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for Outbox {
    async fn send(&self, email: &Email) -> lectern::mail::Result<()> {
        tokio::time::sleep(Duration::from_millis(10)).await;

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(MailError::Provider {
                status: 502,
                message: "bad gateway".into(),
            });
        }

        self.sent.lock().push(email.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}

fn queue_for(outbox: &Arc<Outbox>) -> EmailQueue {
    let identity = tokio_test::assert_ok!(MailerConfig::default().from("noreply@iccict.org"));
    Mailer::new(outbox.clone())
        .with_config(identity)
        .into_queue(QueueConfig::default())
        .unwrap()
}

fn expression() -> ReviewerExpression {
    ReviewerExpression {
        name: "Dr. Ada Lovelace".into(),
        email: "ada@university.edu".into(),
        current_job_title: "Professor".into(),
        institution: "University of London".into(),
        subject_area: vec!["Networks".into(), "Security".into()],
        role_preference: RolePreference::normalize("session chair"),
        cv_url: None,
    }
}

fn registration(name: &str) -> Registration {
    Registration {
        name: name.into(),
        email: format!("{}@iccict.org", name.to_lowercase()),
        category: "Author".into(),
        payment_reference: "PAY-2026-001".into(),
        amount: Some("INR 8000".into()),
    }
}

// =============================================================================
// Workflows
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reviewer_expression_workflow() {
    let outbox = Arc::new(Outbox::default());
    let queue = queue_for(&outbox);

    notifications::reviewer_expression_received(&expression(), "committee@iccict.org").enqueue(&queue);
    notifications::reviewer_expression_status(&expression(), ExpressionStatus::Accepted).enqueue(&queue);
    queue.wait_idle().await;

    assert_eq!(
        outbox.subjects(),
        vec![
            "New Reviewer Expression: Dr. Ada Lovelace".to_string(),
            "Reviewer Expression Status Update - ACCEPTED".to_string(),
        ]
    );

    let sent = outbox.sent.lock();
    let from = sent[0].from.as_ref().unwrap();
    assert_eq!(from.email(), "noreply@iccict.org");
    assert_eq!(from.name(), Some("ICCICT 2026"));
    assert_eq!(sent[0].to[0].email(), "committee@iccict.org");
    assert_eq!(sent[1].to[0].email(), "ada@university.edu");
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let outbox = Outbox::failing(2);
    let queue = queue_for(&outbox);

    let id = notifications::registration_confirmation(&registration("Grace")).enqueue(&queue);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = queue.status();
    assert_eq!(status.queue_length, 0);
    assert_eq!(status.scheduled, 1);

    queue.wait_idle().await;

    let job = queue.job(&id).unwrap();
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.attempts, 3);
    assert_eq!(outbox.subjects(), vec!["ICCICT 2026 Registration Confirmed".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_job_stays_failed_through_janitor() {
    let outbox = Outbox::failing(u32::MAX);
    let queue = queue_for(&outbox);

    let failed = notifications::registration_confirmation(&registration("Alan")).enqueue(&queue);
    queue.wait_idle().await;

    let job = queue.job(&failed).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.attempts, 3);
    assert!(job.last_error.unwrap().contains("bad gateway"));

    outbox.failures_left.store(0, Ordering::SeqCst);
    let delivered = notifications::registration_confirmation(&registration("Barbara")).enqueue(&queue);
    queue.wait_idle().await;

    let janitor = Janitor::new(queue.clone(), JanitorConfig::default());
    assert_eq!(janitor.run_once(), 1);

    assert!(queue.job(&delivered).is_none());
    assert!(queue.job(&failed).is_some());
    assert_eq!(queue.status().failed, 1);
    assert_eq!(queue.status().completed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_high_priority_registration_overtakes_backlog() {
    let outbox = Arc::new(Outbox::default());
    let queue = queue_for(&outbox);

    for n in 0..3 {
        queue.send_later(
            Email::new()
                .to("bulk@iccict.org")
                .subject(format!("digest {n}"))
                .text("weekly digest"),
            JobPriority::Low,
        );
    }
    notifications::registration_confirmation(&registration("Grace")).enqueue(&queue);
    queue.wait_idle().await;

    let subjects = outbox.subjects();
    assert_eq!(subjects.len(), 4);
    assert_eq!(subjects[0], "ICCICT 2026 Registration Confirmed");
    assert_eq!(&subjects[1..], ["digest 0", "digest 1", "digest 2"]);
}
