//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown conversion type: {0}")]
    UnknownConversion(String),

    #[error("Invalid conversion '{name}': {reason}")]
    InvalidConversion { name: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_conversion(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConversion {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
