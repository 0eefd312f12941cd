//! Transactional emails sent by the registration workflows.
//!
//! Builders return a [`Notification`]: the email plus the queue priority it
//! should travel at. The sender is left unset so the [`Mailer`](crate::Mailer)
//! fills in the configured identity.

use lectern_queue::{JobId, JobPriority};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::queue::{EmailQueue, EnqueueEmail};
use crate::{Email, MailError};

/// An email ready to be queued.
#[derive(Debug, Clone)]
pub struct Notification {
    pub email: Email,
    pub priority: JobPriority,
}

impl Notification {
    fn normal(email: Email) -> Self {
        Self {
            email,
            priority: JobPriority::Normal,
        }
    }

    /// Queue the email; returns immediately.
    pub fn enqueue(self, queue: &EmailQueue) -> JobId {
        queue.send_later(self.email, self.priority)
    }
}

/// Role a reviewer volunteers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RolePreference {
    #[default]
    Reviewer,
    SessionChair,
}

impl RolePreference {
    /// Lenient parse: `session chair` or `sessionchair` selects session
    /// chair, anything else is a reviewer.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "session chair" | "sessionchair" => Self::SessionChair,
            _ => Self::Reviewer,
        }
    }
}

impl fmt::Display for RolePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reviewer => "Reviewer",
            Self::SessionChair => "Session Chair",
        })
    }
}

/// Review state of a reviewer expression of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpressionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ExpressionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpressionStatus {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(MailError::Config(format!("Invalid status: {other}"))),
        }
    }
}

/// A committee member's expression of interest in reviewing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerExpression {
    pub name: String,
    pub email: String,
    pub current_job_title: String,
    pub institution: String,
    #[serde(default)]
    pub subject_area: Vec<String>,
    #[serde(default)]
    pub role_preference: RolePreference,
    #[serde(default)]
    pub cv_url: Option<String>,
}

/// A confirmed keynote speaker registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeynoteSpeaker {
    pub name: String,
    pub email: String,
    pub designation: String,
    pub institution_name: String,
    pub keynote_title: String,
}

/// A paid conference registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub category: String,
    pub payment_reference: String,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Tell the committee inbox that someone volunteered to review.
pub fn reviewer_expression_received(expression: &ReviewerExpression, committee: &str) -> Notification {
    let name = escape_html(&expression.name);
    let areas = if expression.subject_area.is_empty() {
        "Not specified".to_string()
    } else {
        escape_html(&expression.subject_area.join(", "))
    };
    let cv = expression
        .cv_url
        .as_deref()
        .map(|url| format!(r#"<p><a href="{}">View CV</a></p>"#, escape_html(url)))
        .unwrap_or_default();

    let email = Email::new()
        .to(committee)
        .reply_to(expression.email.as_str())
        .subject(format!("New Reviewer Expression: {}", expression.name))
        .html(format!(
            "<h2>New Reviewer Expression</h2>\
             <p><strong>Name:</strong> {name}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Position:</strong> {}, {}</p>\
             <p><strong>Role:</strong> {}</p>\
             <p><strong>Subject areas:</strong> {areas}</p>{cv}",
            escape_html(&expression.email),
            escape_html(&expression.current_job_title),
            escape_html(&expression.institution),
            expression.role_preference,
        ))
        .text(format!(
            "New reviewer expression from {} <{}>\nRole: {}\nSubject areas: {}",
            expression.name,
            expression.email,
            expression.role_preference,
            expression.subject_area.join(", ")
        ));

    Notification::normal(email)
}

/// Tell a volunteer their expression was accepted or rejected.
pub fn reviewer_expression_status(
    expression: &ReviewerExpression,
    status: ExpressionStatus,
) -> Notification {
    let outcome = match status {
        ExpressionStatus::Accepted => format!(
            "We are pleased to confirm you as a {} for ICCICT 2026. Login details follow separately.",
            expression.role_preference
        ),
        ExpressionStatus::Rejected => {
            "Thank you for your interest. We are unable to offer you a role this year.".to_string()
        }
        ExpressionStatus::Pending => "Your expression of interest is under review.".to_string(),
    };

    let email = Email::new()
        .to(expression.email.as_str())
        .subject(format!("Reviewer Expression Status Update - {status}"))
        .html(format!(
            "<p>Dear {},</p><p>{}</p><p>Status: <strong>{status}</strong></p>",
            escape_html(&expression.name),
            escape_html(&outcome)
        ))
        .text(format!("Dear {},\n\n{outcome}\n\nStatus: {status}", expression.name));

    Notification::normal(email)
}

/// Confirm a keynote speaker's registration.
pub fn keynote_speaker_confirmation(speaker: &KeynoteSpeaker) -> Notification {
    let email = Email::new()
        .to(speaker.email.as_str())
        .subject(format!("Keynote Speaker Registration Confirmed - {}", speaker.keynote_title))
        .html(format!(
            "<p>Dear {},</p>\
             <p>Thank you for registering as a keynote speaker at ICCICT 2026.</p>\
             <p><strong>Talk:</strong> {}</p>\
             <p><strong>Affiliation:</strong> {}, {}</p>",
            escape_html(&speaker.name),
            escape_html(&speaker.keynote_title),
            escape_html(&speaker.designation),
            escape_html(&speaker.institution_name),
        ))
        .text(format!(
            "Dear {},\n\nThank you for registering as a keynote speaker at ICCICT 2026.\nTalk: {}",
            speaker.name, speaker.keynote_title
        ));

    Notification::normal(email)
}

/// Confirm a registration and its payment. Sent at high priority.
pub fn registration_confirmation(registration: &Registration) -> Notification {
    let amount = registration.amount.as_deref().unwrap_or("as invoiced");

    let email = Email::new()
        .to(registration.email.as_str())
        .subject("ICCICT 2026 Registration Confirmed")
        .html(format!(
            "<p>Dear {},</p>\
             <p>Your registration ({}) is confirmed.</p>\
             <p><strong>Payment reference:</strong> {}</p>\
             <p><strong>Amount:</strong> {}</p>",
            escape_html(&registration.name),
            escape_html(&registration.category),
            escape_html(&registration.payment_reference),
            escape_html(amount),
        ))
        .text(format!(
            "Dear {},\n\nYour registration ({}) is confirmed.\nPayment reference: {}\nAmount: {amount}",
            registration.name, registration.category, registration.payment_reference
        ));

    Notification {
        email,
        priority: JobPriority::High,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expression() -> ReviewerExpression {
        ReviewerExpression {
            name: "Ada <Lovelace>".to_string(),
            email: "ada@example.com".to_string(),
            current_job_title: "Professor".to_string(),
            institution: "Analytical Engines".to_string(),
            subject_area: vec!["Networks".to_string(), "Security".to_string()],
            role_preference: RolePreference::normalize(" Session Chair "),
            cv_url: None,
        }
    }

    #[test]
    fn test_expression_received() {
        let n = reviewer_expression_received(&expression(), "committee@iccict.org");
        assert_eq!(n.priority, JobPriority::Normal);
        assert_eq!(
            n.email.subject.as_deref(),
            Some("New Reviewer Expression: Ada <Lovelace>")
        );
        assert_eq!(n.email.to[0].email(), "committee@iccict.org");
        assert_eq!(n.email.reply_to.as_ref().unwrap().email(), "ada@example.com");

        let html = n.email.html.unwrap();
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(html.contains("Session Chair"));
        assert!(html.contains("Networks, Security"));
    }

    #[test]
    fn test_status_update_subject() {
        let n = reviewer_expression_status(&expression(), ExpressionStatus::Accepted);
        assert_eq!(
            n.email.subject.as_deref(),
            Some("Reviewer Expression Status Update - ACCEPTED")
        );
        assert_eq!(n.email.to[0].email(), "ada@example.com");
    }

    #[test]
    fn test_registration_is_high_priority() {
        let n = registration_confirmation(&Registration {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            category: "Author".to_string(),
            payment_reference: "PAY-0042".to_string(),
            amount: None,
        });
        assert_eq!(n.priority, JobPriority::High);
        assert!(n.email.text.unwrap().contains("PAY-0042"));
    }

    #[test]
    fn test_keynote_confirmation() {
        let n = keynote_speaker_confirmation(&KeynoteSpeaker {
            name: "Alan".to_string(),
            email: "alan@example.com".to_string(),
            designation: "Fellow".to_string(),
            institution_name: "NPL".to_string(),
            keynote_title: "Computable Numbers".to_string(),
        });
        assert_eq!(
            n.email.subject.as_deref(),
            Some("Keynote Speaker Registration Confirmed - Computable Numbers")
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("REJECTED".parse::<ExpressionStatus>().unwrap(), ExpressionStatus::Rejected);
        tokio_test::assert_err!("maybe".parse::<ExpressionStatus>());
        assert_eq!(RolePreference::normalize("anything"), RolePreference::Reviewer);
    }

    #[test]
    fn test_expression_deserializes_camel_case() {
        let expression: ReviewerExpression = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "ada@example.com",
            "currentJobTitle": "Professor",
            "institution": "AE",
            "rolePreference": "SessionChair"
        }))
        .unwrap();
        assert_eq!(expression.role_preference, RolePreference::SessionChair);
        assert!(expression.subject_area.is_empty());
    }
}
