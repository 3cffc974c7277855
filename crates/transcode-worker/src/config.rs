//! Worker configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use transcode_queue::{CredentialsSource, PollRequest, QueueBinding};
use transcode_storage::S3Config;

use crate::error::{WorkerError, WorkerResult};
use crate::worker::{WorkerSettings, DEFAULT_MAX_IN_FLIGHT};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// URL of the queue to poll
    pub queue_url: String,
    /// Region for SQS and S3
    pub region: String,
    /// SQS endpoint override (LocalStack, ElasticMQ)
    pub sqs_endpoint_url: Option<String>,
    pub credentials: CredentialsSource,
    /// Receive parameters
    pub poll_request: PollRequest,
    /// Trigger cadence
    pub poll_interval: Duration,
    /// Maximum concurrent handlers; `None` is unbounded
    pub max_in_flight: Option<usize>,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Timeout for each FFmpeg pass
    pub ffmpeg_timeout: Duration,
    /// S3-compatible endpoint override
    pub s3_endpoint_url: Option<String>,
    /// Optional presets file replacing the built-in conversions
    pub presets_file: Option<String>,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let queue_url =
            var("SQS_QUEUE_URL").ok_or_else(|| WorkerError::config_error("SQS_QUEUE_URL is required"))?;

        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => CredentialsSource::Static {
                access_key_id,
                secret_access_key,
                session_token: var("AWS_SESSION_TOKEN"),
            },
            (None, None) => CredentialsSource::DefaultChain,
            _ => {
                return Err(WorkerError::config_error(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together",
                ))
            }
        };

        let poll_request = PollRequest::new(
            parse_or(&var, "QUEUE_MAX_MESSAGES", 10u32)?,
            Duration::from_secs(parse_or(&var, "QUEUE_VISIBILITY_TIMEOUT_SECS", 5u64)?),
            Duration::from_secs(parse_or(&var, "QUEUE_WAIT_TIME_SECS", 1u64)?),
        )
        .map_err(|e| WorkerError::config_error(e.to_string()))?;

        let poll_interval = parse_or(&var, "WORKER_POLL_INTERVAL_SECS", 5u64)?;
        if poll_interval == 0 {
            return Err(WorkerError::config_error(
                "WORKER_POLL_INTERVAL_SECS must be greater than zero",
            ));
        }

        let max_in_flight = match parse_or(&var, "WORKER_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT)? {
            0 => None,
            n => Some(n),
        };

        let ffmpeg_timeout = Duration::from_secs(parse_or(&var, "FFMPEG_TIMEOUT_SECS", 3600u64)?);
        if ffmpeg_timeout.checked_mul(2).is_none() {
            return Err(WorkerError::config_error(format!(
                "FFMPEG_TIMEOUT_SECS={} is too large",
                ffmpeg_timeout.as_secs()
            )));
        }

        let metrics_addr = var("METRICS_ADDR")
            .map(|addr| parse_value("METRICS_ADDR", &addr))
            .transpose()?;

        Ok(Self {
            queue_url,
            region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            sqs_endpoint_url: var("SQS_ENDPOINT_URL"),
            credentials,
            poll_request,
            poll_interval: Duration::from_secs(poll_interval),
            max_in_flight,
            shutdown_timeout: Duration::from_secs(parse_or(&var, "WORKER_SHUTDOWN_TIMEOUT_SECS", 30u64)?),
            work_dir: var("WORKER_WORK_DIR").unwrap_or_else(|| "/tmp/transcode".to_string()),
            ffmpeg_timeout,
            s3_endpoint_url: var("S3_ENDPOINT_URL"),
            presets_file: var("TRANSCODE_PRESETS_FILE"),
            metrics_addr,
        })
    }

    pub fn binding(&self) -> WorkerResult<QueueBinding> {
        let binding = QueueBinding::new(&self.queue_url, &self.region)?;
        Ok(match &self.sqs_endpoint_url {
            Some(endpoint_url) => binding.with_endpoint_url(endpoint_url),
            None => binding,
        })
    }

    /// Settings for the [`crate::Worker`]. A transcode runs two FFmpeg
    /// passes, so the handler timeout is twice the per-pass timeout.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            poll_request: self.poll_request,
            max_in_flight: self.max_in_flight,
            handler_timeout: Some(self.ffmpeg_timeout.saturating_mul(2)),
        }
    }

    pub fn s3_config(&self) -> S3Config {
        let config = S3Config::new(&self.region);
        match &self.s3_endpoint_url {
            Some(endpoint_url) => config.with_endpoint_url(endpoint_url),
            None => config,
        }
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> WorkerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> WorkerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| WorkerError::config_error(format!("invalid {key}={raw:?}: {e}")))
}
