//! Lectern: notification plumbing for a conference backend.
//!
//! The [`queue`] module is always available. Everything else sits behind a
//! feature:
//!
//! | feature | crate |
//! |---------|-------|
//! | `mail` (default) | [`lectern_mail`]: Brevo and SMTP transports, notification builders |
//! | `config` | [`lectern_config`]: layered configuration |
//! | `log` | [`lectern_log`]: tracing setup |
//! | `server` | [`lectern_server`]: health endpoints and the service binary |

pub use lectern_queue as queue;

#[cfg(feature = "mail")]
pub use lectern_mail as mail;

#[cfg(feature = "config")]
pub use lectern_config as config;

#[cfg(feature = "log")]
pub use lectern_log as log;

#[cfg(feature = "server")]
pub use lectern_server as server;

/// Prelude for common imports.
pub mod prelude {
    pub use lectern_queue::prelude::*;

    #[cfg(feature = "mail")]
    pub use lectern_mail::prelude::*;
}
