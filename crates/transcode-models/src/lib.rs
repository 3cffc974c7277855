//! Shared data models for the transcode worker.
//!
//! This crate provides Serde-serializable types for:
//! - Transcode job payloads carried in queue message bodies
//! - Conversion presets (scale and bitrates per output type)

pub mod conversion;
pub mod error;
pub mod request;

pub use conversion::{Conversion, ConversionPresets, DEFAULT_AUDIO_CODEC};
pub use error::{ModelError, ModelResult};
pub use request::{ObjectLocation, TranscodeRequest};
