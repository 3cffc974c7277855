//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid job: {0}")]
    InvalidJob(#[from] transcode_models::ModelError),

    #[error("Queue error: {0}")]
    Queue(#[from] transcode_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] transcode_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] transcode_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether a redelivery of the same body could succeed.
    ///
    /// Malformed bodies and unknown presets fail identically every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkerError::InvalidJob(_) | WorkerError::ConfigError(_))
    }
}
