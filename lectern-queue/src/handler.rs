//! The delivery seam between the queue and the outside world.

use crate::error::HandlerError;
use async_trait::async_trait;
use std::sync::Arc;

/// Performs one delivery attempt for a payload.
///
/// Implementations must not retry on their own; the queue decides whether
/// and when another attempt happens. Every error, whatever its cause, is
/// treated as a failed attempt.
#[async_trait]
pub trait JobHandler<P>: Send + Sync + 'static {
    async fn handle(&self, payload: &P) -> Result<(), HandlerError>;
}

#[async_trait]
impl<P, H> JobHandler<P> for Arc<H>
where
    P: Send + Sync + 'static,
    H: JobHandler<P> + ?Sized,
{
    async fn handle(&self, payload: &P) -> Result<(), HandlerError> {
        (**self).handle(payload).await
    }
}
