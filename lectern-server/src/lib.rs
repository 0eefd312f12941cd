//! Lectern notification service.
//!
//! Wires configuration, logging and the email queue into a small HTTP
//! server that exposes health endpoints. A keep-warm task pings the public
//! health URL so free-tier hosting does not put the service to sleep.
//!
//! ```rust,no_run
//! use lectern_server::{AppState, ServerConfig, serve, shutdown_signal};
//! use lectern_mail::MailerQueueExt;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load(None)?;
//! let queue = config.mail.build_mailer()?.into_queue(config.queue_config())?;
//! let state = Arc::new(AppState::new(queue, config.environment.clone()));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! serve(listener, state, shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod keep_warm;
pub mod server;
pub mod state;

pub use config::{KeepWarmSettings, MailProvider, MailSettings, ServerConfig};
pub use error::ServerError;
pub use keep_warm::KeepWarm;
pub use server::{drain_queue, serve, shutdown_signal};
pub use state::AppState;
