//! Remote queue access for the transcode worker.
//!
//! This crate provides:
//! - The [`QueueClient`] boundary: receive a batch, delete one delivery
//! - Immutable [`Message`], [`QueueBinding`] and [`PollRequest`] values
//! - An Amazon SQS implementation built on the AWS SDK
//!
//! Clients perform exactly one remote call per operation and never retry;
//! redelivery after the visibility timeout is the only retry mechanism.

pub mod binding;
pub mod client;
pub mod error;
pub mod message;
pub mod sqs;

pub use binding::{PollRequest, QueueBinding};
pub use client::QueueClient;
pub use error::{QueueError, QueueOperation, QueueResult};
pub use message::{Message, RECEIVE_COUNT_ATTRIBUTE};
pub use sqs::{CredentialsSource, SqsQueueClient};
