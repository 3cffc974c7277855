//! FFmpeg CLI wrapper for transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Timeout handling for long-running encodes
//! - Two-pass H.264/AAC constant-bitrate transcoding

pub mod command;
pub mod error;
pub mod progress;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, NULL_OUTPUT};
pub use error::{MediaError, MediaResult};
pub use progress::FfmpegProgress;
pub use transcode::{Pass, TwoPassTranscoder};
