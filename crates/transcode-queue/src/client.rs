//! Queue client trait.

use async_trait::async_trait;

use crate::binding::{PollRequest, QueueBinding};
use crate::error::QueueResult;
use crate::message::Message;

/// The sole boundary to the remote queue service.
///
/// Implementations make exactly one remote call per method and surface
/// every failure as [`QueueError::Transport`](crate::QueueError::Transport).
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `request.max_messages()` messages, each hidden for the
    /// visibility timeout. Returns an empty batch when the long-poll wait
    /// elapses with nothing available.
    async fn receive(&self, binding: &QueueBinding, request: &PollRequest) -> QueueResult<Vec<Message>>;

    /// Delete the delivery identified by `receipt_token`. Deleting an expired
    /// or already-deleted token is provider dependent and best-effort.
    async fn delete(&self, binding: &QueueBinding, receipt_token: &str) -> QueueResult<()>;
}

#[async_trait]
impl<T: QueueClient + ?Sized> QueueClient for std::sync::Arc<T> {
    async fn receive(&self, binding: &QueueBinding, request: &PollRequest) -> QueueResult<Vec<Message>> {
        (**self).receive(binding, request).await
    }

    async fn delete(&self, binding: &QueueBinding, receipt_token: &str) -> QueueResult<()> {
        (**self).delete(binding, receipt_token).await
    }
}
