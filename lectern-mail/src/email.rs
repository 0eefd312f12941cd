//! Email message types.

use crate::{Address, Attachment, IntoAddress, MailError, Result};
use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};

/// An outbound email.
///
/// Builder methods never fail. An address that does not parse is remembered
/// and reported by [`validate`](Email::validate), so a bad recipient surfaces
/// as a delivery error rather than at the call site.
#[derive(Debug, Clone, Default)]
pub struct Email {
    pub from: Option<Address>,
    pub reply_to: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
    pub headers: Vec<(String, String)>,
    rejected: Vec<String>,
}

impl Email {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the from address.
    pub fn from(mut self, from: impl IntoAddress) -> Self {
        self.from = self.accept(from);
        self
    }

    /// Set the reply-to address.
    pub fn reply_to(mut self, reply_to: impl IntoAddress) -> Self {
        self.reply_to = self.accept(reply_to);
        self
    }

    /// Add a to recipient.
    pub fn to(mut self, to: impl IntoAddress) -> Self {
        if let Some(addr) = self.accept(to) {
            self.to.push(addr);
        }
        self
    }

    /// Add several to recipients.
    pub fn to_many<I, A>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoAddress,
    {
        for r in recipients {
            self = self.to(r);
        }
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, cc: impl IntoAddress) -> Self {
        if let Some(addr) = self.accept(cc) {
            self.cc.push(addr);
        }
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, bcc: impl IntoAddress) -> Self {
        if let Some(addr) = self.accept(bcc) {
            self.bcc.push(addr);
        }
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the HTML body.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Every recipient across to, cc and bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Check the email is complete enough to hand to a transport.
    pub fn validate(&self) -> Result<()> {
        if let Some(rejected) = self.rejected.first() {
            return Err(MailError::InvalidAddress(rejected.clone()));
        }
        if self.from.is_none() {
            return Err(MailError::MissingField("from"));
        }
        if self.recipients().next().is_none() {
            return Err(MailError::MissingField("to/cc/bcc"));
        }
        if self.subject.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(MailError::MissingField("subject"));
        }
        if self.text.is_none() && self.html.is_none() {
            return Err(MailError::MissingField("text/html body"));
        }
        Ok(())
    }

    fn accept(&mut self, address: impl IntoAddress) -> Option<Address> {
        match address.into_address() {
            Ok(addr) => Some(addr),
            Err(MailError::InvalidAddress(reason)) => {
                self.rejected.push(reason);
                None
            }
            Err(e) => {
                self.rejected.push(e.to_string());
                None
            }
        }
    }

    /// Build a lettre message for SMTP delivery.
    pub(crate) fn to_lettre(&self) -> Result<lettre::Message> {
        self.validate()?;

        let from = self.from.as_ref().ok_or(MailError::MissingField("from"))?;

        let mut builder = lettre::Message::builder()
            .from(from.to_mailbox()?)
            .subject(self.subject.as_deref().unwrap_or_default());

        for addr in &self.to {
            builder = builder.to(addr.to_mailbox()?);
        }
        for addr in &self.cc {
            builder = builder.cc(addr.to_mailbox()?);
        }
        for addr in &self.bcc {
            builder = builder.bcc(addr.to_mailbox()?);
        }
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.to_mailbox()?);
        }

        let body = match (&self.html, &self.text) {
            (Some(html), Some(text)) => MultiPart::alternative_plain_html(text.clone(), html.clone()),
            (Some(html), None) => MultiPart::mixed().singlepart(SinglePart::html(html.clone())),
            (None, Some(text)) => MultiPart::mixed().singlepart(SinglePart::plain(text.clone())),
            (None, None) => return Err(MailError::MissingField("text/html body")),
        };

        let body = if self.attachments.is_empty() {
            body
        } else {
            let mut mixed = MultiPart::mixed().multipart(body);
            for attachment in &self.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    MailError::Attachment(format!("{}: {e}", attachment.filename))
                })?;
                mixed = mixed.singlepart(
                    lettre::message::Attachment::new(attachment.filename.clone())
                        .body(attachment.data.clone(), content_type),
                );
            }
            mixed
        };

        Ok(builder.multipart(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Email {
        Email::new()
            .from("noreply@iccict.org")
            .to("author@example.com")
            .subject("Submission received")
            .text("Thank you.")
    }

    #[test]
    fn test_complete_email_validates() {
        tokio_test::assert_ok!(complete().validate());
    }

    #[test]
    fn test_missing_fields() {
        let email = Email::new().to("author@example.com").subject("s").text("t");
        assert!(matches!(email.validate(), Err(MailError::MissingField("from"))));

        let email = Email::new().from("noreply@iccict.org").subject("s").text("t");
        assert!(matches!(email.validate(), Err(MailError::MissingField("to/cc/bcc"))));

        let email = complete().subject("   ");
        assert!(matches!(email.validate(), Err(MailError::MissingField("subject"))));

        let mut email = complete();
        email.text = None;
        assert!(matches!(
            email.validate(),
            Err(MailError::MissingField("text/html body"))
        ));
    }

    #[test]
    fn test_bad_recipient_is_reported() {
        let email = complete().cc("not-an-address");
        assert_eq!(email.cc.len(), 0);
        assert!(matches!(email.validate(), Err(MailError::InvalidAddress(_))));
    }

    #[test]
    fn test_bcc_only_is_enough() {
        let email = Email::new()
            .from("noreply@iccict.org")
            .bcc("committee@iccict.org")
            .subject("s")
            .html("<p>h</p>");
        tokio_test::assert_ok!(email.validate());
        assert_eq!(email.recipients().count(), 1);
    }

    #[test]
    fn test_to_lettre_with_attachment() {
        let email = complete()
            .html("<p>Thank you.</p>")
            .reply_to("chair@iccict.org")
            .attach(Attachment::pdf("receipt.pdf", b"%PDF".to_vec()));

        let message = email.to_lettre().unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Submission received"));
        assert!(raw.contains("Reply-To: chair@iccict.org"));
        assert!(raw.contains("receipt.pdf"));
    }
}
