//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::DispatchOutcome;
use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to install metrics exporter: {e}")))
}

/// Metric names as constants for consistency.
pub mod names {
    // Queue metrics
    pub const MESSAGES_RECEIVED_TOTAL: &str = "transcode_messages_received_total";
    pub const RECEIVE_ERRORS_TOTAL: &str = "transcode_receive_errors_total";
    pub const DELETES_TOTAL: &str = "transcode_deletes_total";
    pub const DELETE_ERRORS_TOTAL: &str = "transcode_delete_errors_total";

    // Dispatch metrics
    pub const HANDLER_RESULTS_TOTAL: &str = "transcode_handler_results_total";
    pub const HANDLER_DURATION_SECONDS: &str = "transcode_handler_duration_seconds";
    pub const DISPATCH_IN_FLIGHT: &str = "transcode_dispatch_in_flight";

    // Processing metrics
    pub const FFMPEG_DURATION_SECONDS: &str = "transcode_ffmpeg_duration_seconds";
}

pub fn record_messages_received(count: usize) {
    counter!(names::MESSAGES_RECEIVED_TOTAL).increment(count as u64);
}

pub fn record_receive_error(code: &str) {
    let labels = [("code", code.to_string())];
    counter!(names::RECEIVE_ERRORS_TOTAL, &labels).increment(1);
}

/// Record the terminal outcome of a dispatch and its handler duration.
pub fn record_dispatch(outcome: DispatchOutcome, handler_secs: f64) {
    let result = if outcome.handler_succeeded() { "success" } else { "failure" };
    let labels = [("result", result.to_string())];
    counter!(names::HANDLER_RESULTS_TOTAL, &labels).increment(1);
    histogram!(names::HANDLER_DURATION_SECONDS, &labels).record(handler_secs);

    match outcome {
        DispatchOutcome::Deleted => counter!(names::DELETES_TOTAL).increment(1),
        DispatchOutcome::DeleteFailed => counter!(names::DELETE_ERRORS_TOTAL).increment(1),
        DispatchOutcome::LeftForRedelivery => {}
    }
}

pub fn set_in_flight(count: usize) {
    gauge!(names::DISPATCH_IN_FLIGHT).set(count as f64);
}

pub fn record_ffmpeg_duration(conversion: &str, duration_secs: f64) {
    let labels = [("conversion", conversion.to_string())];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}
