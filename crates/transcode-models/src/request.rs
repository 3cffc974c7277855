//! Transcode job payload.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Location of an object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// File name component of the key, used for scratch files.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A transcoding job as carried in a queue message body.
///
/// ```json
/// {
///   "input":  { "bucket": "my-input-bucket",  "key": "fake/filepath/movie.mp4" },
///   "output": { "bucket": "my-output-bucket", "key": "fake/filepath/movie.mp4" },
///   "type": "320p"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    /// Source object
    pub input: ObjectLocation,
    /// Destination object
    pub output: ObjectLocation,
    /// Name of the conversion preset
    #[serde(rename = "type")]
    pub conversion: String,
}

impl TranscodeRequest {
    pub fn new(
        input: ObjectLocation,
        output: ObjectLocation,
        conversion: impl Into<String>,
    ) -> Self {
        Self {
            input,
            output,
            conversion: conversion.into(),
        }
    }

    /// Parse and validate a message body.
    pub fn from_body(body: &str) -> ModelResult<Self> {
        let request: Self = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Reject requests with empty locations or conversion type.
    pub fn validate(&self) -> ModelResult<()> {
        for (field, location) in [("input", &self.input), ("output", &self.output)] {
            if location.bucket.trim().is_empty() {
                return Err(ModelError::invalid_request(format!("{field}.bucket is empty")));
            }
            if location.key.trim().is_empty() {
                return Err(ModelError::invalid_request(format!("{field}.key is empty")));
            }
        }
        if self.conversion.trim().is_empty() {
            return Err(ModelError::invalid_request("type is empty"));
        }
        Ok(())
    }
}
