//! Message handler capability.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Error returned by a failed handler. Any error type converts into it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(())` acknowledges the message; `Err` leaves it for redelivery.
pub type HandlerResult = Result<(), HandlerError>;

/// Consumes one message body.
///
/// The worker depends only on this contract. Handlers must tolerate being
/// invoked more than once for the same logical message: a delivery whose
/// delete fails, or whose handler outlives the visibility timeout, is
/// received again.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, body: &str) -> HandlerResult;
}

/// Adapter that lets a closure act as a [`Handler`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure taking the owned body.
///
/// ```
/// use transcode_worker::{handler_fn, HandlerResult};
///
/// let handler = handler_fn(|body: String| async move {
///     tracing::info!(%body, "Received a message");
///     HandlerResult::Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, body: &str) -> HandlerResult {
        (self.f)(body.to_string()).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, body: &str) -> HandlerResult {
        (**self).handle(body).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn handle(&self, body: &str) -> HandlerResult {
        (**self).handle(body).await
    }
}
