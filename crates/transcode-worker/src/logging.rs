//! Structured dispatch logging utilities.
//!
//! Provides consistent, structured logging for message dispatch with
//! tracing spans and contextual information.

use std::fmt::Display;

use tracing::{debug, error, Span};
use transcode_queue::{Message, QueueError};

/// Dispatch logger carrying the identity of one delivery.
///
/// Every line it emits has the same `message_id` and `receive_count`
/// fields, so a delete failure after a successful handler run can be told
/// apart from a handler failure.
#[derive(Debug, Clone)]
pub struct DispatchLogger {
    message_id: String,
    receive_count: Option<u32>,
}

impl DispatchLogger {
    pub fn new(message: &Message) -> Self {
        Self {
            message_id: message.log_id().to_string(),
            receive_count: message.receive_count(),
        }
    }

    pub fn log_start(&self) {
        debug!(
            message_id = %self.message_id,
            receive_count = ?self.receive_count,
            "Dispatching message"
        );
    }

    pub fn log_deleted(&self) {
        debug!(
            message_id = %self.message_id,
            "Handler succeeded, message deleted"
        );
    }

    pub fn log_delete_failed(&self, err: &QueueError) {
        error!(
            message_id = %self.message_id,
            receive_count = ?self.receive_count,
            code = err.code().unwrap_or("none"),
            error = %err,
            "Handler succeeded but delete failed; message will be redelivered"
        );
    }

    /// Handler failures are the handler's to report; this is debug only.
    pub fn log_handler_failed(&self, err: &dyn Display) {
        debug!(
            message_id = %self.message_id,
            receive_count = ?self.receive_count,
            error = %err,
            "Handler failed, message left for redelivery"
        );
    }

    pub fn log_handler_panicked(&self) {
        error!(
            message_id = %self.message_id,
            receive_count = ?self.receive_count,
            "Handler panicked, message left for redelivery"
        );
    }

    #[cfg(test)]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    #[cfg(test)]
    pub fn receive_count(&self) -> Option<u32> {
        self.receive_count
    }

    /// Span wrapping the handler future.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "dispatch",
            message_id = %self.message_id,
            receive_count = ?self.receive_count
        )
    }
}
