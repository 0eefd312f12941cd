use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use lectern_log::LogConfig;
use lectern_mail::MailerQueueExt;
use lectern_queue::Janitor;
use lectern_server::keep_warm::{self, KeepWarm};
use lectern_server::{AppState, ServerConfig, ServerError, drain_queue, serve, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let _log_guard = lectern_log::init(&LogConfig::from_env())?;

    let config_path = std::env::var_os("LECTERN_CONFIG").map(PathBuf::from);
    let config = match ServerConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!(
        environment = %config.environment,
        provider = ?config.mail.provider,
        version = env!("CARGO_PKG_VERSION"),
        "Starting Lectern"
    );

    let mailer = config.mail.build_mailer()?;
    let queue = mailer.into_queue(config.queue_config())?;
    let janitor = Janitor::new(queue.clone(), config.janitor_config()).spawn()?;

    let keep_warm = if config.keep_warm.enabled {
        let url = keep_warm::resolve_url(&config.keep_warm, |name| std::env::var(name).ok());
        match KeepWarm::new(&config.keep_warm, url) {
            Ok(task) => Some(task.spawn()),
            Err(e) => {
                warn!(error = %e, "Keep-warm disabled: client setup failed");
                None
            }
        }
    } else {
        info!("Keep-warm disabled");
        None
    };

    let state = Arc::new(
        AppState::new(queue.clone(), config.environment.clone())
            .with_required_env(config.mail.required_env()),
    );

    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve(listener, state, shutdown_signal()).await?;

    if let Some(task) = keep_warm {
        task.abort();
    }
    janitor.abort();

    let abandoned = drain_queue(&queue, config.shutdown_timeout()).await;
    if abandoned > 0 {
        warn!(abandoned, "Queued emails lost on shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}
