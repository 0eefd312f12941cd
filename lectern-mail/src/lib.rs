//! Email delivery for Lectern.
//!
//! - [`Email`] and [`Address`]: the message model
//! - [`Transport`]: one delivery attempt; [`BrevoTransport`] (HTTP API) and
//!   [`SmtpTransport`] are provided
//! - [`Mailer`]: applies the sender identity and implements the job queue's
//!   handler, so it plugs straight into an [`EmailQueue`]
//! - [`notifications`]: the transactional emails the registration flows send
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern_mail::prelude::*;
//! use lectern_queue::{JobPriority, QueueConfig};
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mailer = Mailer::brevo(BrevoConfig::new("xkeysib-..."))?
//!     .with_config(MailerConfig::default().from("noreply@iccict.org")?);
//! let queue = mailer.into_queue(QueueConfig::default())?;
//!
//! let email = Email::new()
//!     .to("author@example.com")
//!     .subject("Paper received")
//!     .text("Thank you for your submission.");
//! queue.send_later(email, JobPriority::Normal);
//! # Ok(())
//! # }
//! ```

mod address;
mod attachment;
mod brevo;
mod email;
mod error;
mod mailer;
pub mod notifications;
mod queue;
mod transport;

pub use address::{Address, IntoAddress, validate_email};
pub use attachment::{Attachment, DEFAULT_CONTENT_TYPE};
pub use brevo::{BREVO_ENDPOINT, BrevoConfig, BrevoTransport};
pub use email::Email;
pub use error::{MailError, Result};
pub use mailer::{DEFAULT_FROM_NAME, Mailer, MailerConfig};
pub use notifications::Notification;
pub use queue::{EmailQueue, EnqueueEmail, MailerQueueExt};
pub use transport::{SmtpConfig, SmtpSecurity, SmtpTransport, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::address::{Address, IntoAddress};
    pub use crate::attachment::Attachment;
    pub use crate::brevo::{BrevoConfig, BrevoTransport};
    pub use crate::email::Email;
    pub use crate::error::{MailError, Result};
    pub use crate::mailer::{Mailer, MailerConfig};
    pub use crate::queue::{EmailQueue, EnqueueEmail, MailerQueueExt};
    pub use crate::transport::{SmtpConfig, SmtpTransport, Transport};
}
