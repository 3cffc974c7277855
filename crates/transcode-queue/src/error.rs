//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

/// Remote operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOperation {
    Receive,
    Delete,
}

impl QueueOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueOperation::Receive => "receive",
            QueueOperation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    /// The remote call failed (auth, throttling, malformed request, network).
    #[error("Queue {operation} failed [{code}]: {message}")]
    Transport {
        operation: QueueOperation,
        code: String,
        message: String,
    },

    #[error("Credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    #[error("Invalid poll request: {0}")]
    InvalidPollRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl QueueError {
    pub fn transport(
        operation: QueueOperation,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn credentials_unavailable(msg: impl Into<String>) -> Self {
        Self::CredentialsUnavailable(msg.into())
    }

    pub fn invalid_poll_request(msg: impl Into<String>) -> Self {
        Self::InvalidPollRequest(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Provider error code for transport failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            QueueError::Transport { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, QueueError::Transport { .. })
    }
}
