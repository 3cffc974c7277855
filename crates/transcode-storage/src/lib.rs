//! Object storage for transcode inputs and outputs.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait used by the transcode handler
//! - An S3 implementation (also works with S3-compatible endpoints)

pub mod client;
pub mod error;

pub use client::{ObjectStore, S3Config, S3Store};
pub use error::{StorageError, StorageResult};
