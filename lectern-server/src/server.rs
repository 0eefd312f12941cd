//! HTTP serve loop and graceful shutdown.

use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};

use lectern_mail::EmailQueue;

use crate::health;
use crate::state::AppState;

/// Accept connections until `shutdown` resolves.
///
/// Connections already accepted keep running on their own tasks; only the
/// accept loop stops.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Server listening");

    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("Server stopped accepting connections");
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(health::respond(&req, &state)) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %err, "Error serving connection");
            }
        });
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

/// Give in-flight and queued emails up to `timeout` to finish.
///
/// Returns the number of jobs abandoned, which are lost with the process.
pub async fn drain_queue(queue: &EmailQueue, timeout: Duration) -> usize {
    let status = queue.status();
    if status.is_idle() {
        return 0;
    }

    info!(
        pending = status.pending,
        processing = status.processing,
        scheduled = status.scheduled,
        timeout_secs = timeout.as_secs(),
        "Draining email queue"
    );

    match tokio::time::timeout(timeout, queue.wait_idle()).await {
        Ok(()) => {
            info!("Email queue drained");
            0
        }
        Err(_) => {
            let status = queue.status();
            let abandoned = status.queue_length + status.scheduled;
            warn!(
                abandoned,
                scheduled = status.scheduled,
                "Email queue not drained before timeout"
            );
            abandoned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_mail::{Email, MailError, Mailer, MailerQueueExt, Transport};
    use lectern_queue::{JobPriority, QueueConfig};

    struct Slow(Duration);

    #[async_trait]
    impl Transport for Slow {
        async fn send(&self, _email: &Email) -> lectern_mail::Result<()> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct Down;

    #[async_trait]
    impl Transport for Down {
        async fn send(&self, _email: &Email) -> lectern_mail::Result<()> {
            Err(MailError::Provider {
                status: 503,
                message: "unavailable".into(),
            })
        }

        fn name(&self) -> &'static str {
            "down"
        }
    }

    fn email() -> Email {
        Email::new()
            .from("noreply@iccict.org")
            .to("a@iccict.org")
            .subject("s")
            .text("t")
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_idle_queue() {
        let queue = Mailer::new(Slow(Duration::ZERO))
            .into_queue(QueueConfig::default())
            .unwrap();
        assert_eq!(drain_queue(&queue, Duration::from_secs(1)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_jobs() {
        let queue = Mailer::new(Slow(Duration::from_secs(1)))
            .into_queue(QueueConfig::default())
            .unwrap();
        queue.enqueue(email(), JobPriority::Normal);
        queue.enqueue(email(), JobPriority::Low);

        assert_eq!(drain_queue(&queue, Duration::from_secs(10)).await, 0);
        assert_eq!(queue.status().completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_reports_abandoned_jobs() {
        let queue = Mailer::new(Down)
            .into_queue(QueueConfig::default().retry_delay(Duration::from_secs(60)))
            .unwrap();
        queue.enqueue(email(), JobPriority::Normal);

        assert_eq!(drain_queue(&queue, Duration::from_secs(5)).await, 1);
    }
}
