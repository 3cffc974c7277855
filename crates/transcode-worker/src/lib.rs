//! Queue worker for transcode jobs.
//!
//! This crate provides:
//! - The [`Handler`] capability and the [`handler_fn`] closure adapter
//! - The [`Worker`] poll → dispatch → acknowledge protocol with an optional
//!   concurrency limit
//! - An [`IntervalTrigger`] that drives poll cycles until shutdown
//! - The [`TranscodeHandler`] that runs two-pass FFmpeg jobs
//! - Environment configuration, preset loading and metrics

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod presets;
pub mod transcode;
pub mod trigger;
pub mod worker;

pub use config::WorkerConfig;
pub use dispatch::{DispatchOutcome, DispatchReport};
pub use error::{WorkerError, WorkerResult};
pub use handler::{handler_fn, Handler, HandlerError, HandlerFn, HandlerResult};
pub use logging::DispatchLogger;
pub use presets::load_presets;
pub use transcode::TranscodeHandler;
pub use trigger::IntervalTrigger;
pub use worker::{PollSummary, Worker, WorkerSettings, DEFAULT_MAX_IN_FLIGHT};
