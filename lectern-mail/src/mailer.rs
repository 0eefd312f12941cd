//! High-level mailer interface.

use async_trait::async_trait;
use lectern_queue::{HandlerError, JobHandler};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    Address, BrevoConfig, BrevoTransport, Email, Result, SmtpConfig, SmtpTransport, Transport,
};

/// Display name used when the configured sender has none.
pub const DEFAULT_FROM_NAME: &str = "ICCICT 2026";

/// Sender identity applied to outgoing email.
#[derive(Debug, Clone, Default)]
pub struct MailerConfig {
    pub default_from: Option<Address>,
    pub default_reply_to: Option<Address>,
}

impl MailerConfig {
    /// Use `email` as the sender, named [`DEFAULT_FROM_NAME`] unless
    /// `email` carries its own display name.
    pub fn from(mut self, email: &str) -> Result<Self> {
        let mut address = Address::parse(email)?;
        if address.name.is_none() {
            address.name = Some(DEFAULT_FROM_NAME.to_string());
        }
        self.default_from = Some(address);
        Ok(self)
    }

    /// Override the sender display name.
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        if let Some(from) = self.default_from.as_mut() {
            from.name = Some(name.into());
        }
        self
    }

    pub fn reply_to(mut self, reply_to: &str) -> Result<Self> {
        self.default_reply_to = Some(Address::parse(reply_to)?);
        Ok(self)
    }
}

/// Applies the sender identity and hands email to a transport.
///
/// Each [`send`](Mailer::send) is a single attempt. As a [`JobHandler`] the
/// mailer is the transport adapter of an [`EmailQueue`](crate::EmailQueue),
/// which owns retries.
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn Transport>,
    config: MailerConfig,
}

impl Mailer {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            config: MailerConfig::default(),
        }
    }

    /// Create a mailer sending through the Brevo API.
    pub fn brevo(config: BrevoConfig) -> Result<Self> {
        Ok(Self::new(BrevoTransport::new(config)?))
    }

    /// Create a mailer sending over SMTP.
    pub fn smtp(config: SmtpConfig) -> Result<Self> {
        Ok(Self::new(SmtpTransport::new(config)?))
    }

    pub fn with_config(mut self, config: MailerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Send an email once.
    pub async fn send(&self, email: &Email) -> Result<()> {
        let email = self.apply_defaults(email);
        email.validate()?;

        debug!(
            transport = self.transport.name(),
            recipients = email.recipients().count(),
            "Sending email"
        );
        self.transport.send(&email).await
    }

    fn apply_defaults<'a>(&self, email: &'a Email) -> Cow<'a, Email> {
        let needs_from = email.from.is_none() && self.config.default_from.is_some();
        let needs_reply_to = email.reply_to.is_none() && self.config.default_reply_to.is_some();

        if !needs_from && !needs_reply_to {
            return Cow::Borrowed(email);
        }

        let mut email = email.clone();
        if needs_from {
            email.from = self.config.default_from.clone();
        }
        if needs_reply_to {
            email.reply_to = self.config.default_reply_to.clone();
        }
        Cow::Owned(email)
    }
}

#[async_trait]
impl JobHandler<Email> for Mailer {
    async fn handle(&self, email: &Email) -> std::result::Result<(), HandlerError> {
        self.send(email).await.map_err(|e| {
            warn!(
                transport = self.transport.name(),
                subject = ?email.subject,
                error = %e,
                "Email delivery attempt failed"
            );
            HandlerError::from(e)
        })
    }
}
