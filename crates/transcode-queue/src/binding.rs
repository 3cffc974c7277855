//! Queue binding and poll parameters.

use std::time::Duration;

use crate::error::{QueueError, QueueResult};

/// Provider limit on messages per receive call.
pub const MAX_MESSAGES_LIMIT: u32 = 10;
/// Provider limit on long-poll wait.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);
/// Provider limit on visibility timeout (12 hours).
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Which queue a worker polls. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    queue_url: String,
    region: String,
    endpoint_url: Option<String>,
}

impl QueueBinding {
    pub fn new(queue_url: impl Into<String>, region: impl Into<String>) -> QueueResult<Self> {
        let queue_url = queue_url.into();
        let region = region.into();

        if queue_url.trim().is_empty() {
            return Err(QueueError::config_error("queue URL is empty"));
        }
        if region.trim().is_empty() {
            return Err(QueueError::config_error("region is empty"));
        }

        Ok(Self {
            queue_url,
            region,
            endpoint_url: None,
        })
    }

    /// Route requests to a custom endpoint (LocalStack, ElasticMQ).
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }
}

/// Parameters of one receive call, fixed per worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    max_messages: u32,
    visibility_timeout: Duration,
    wait_time: Duration,
}

impl Default for PollRequest {
    fn default() -> Self {
        Self {
            max_messages: MAX_MESSAGES_LIMIT,
            visibility_timeout: Duration::from_secs(5),
            wait_time: Duration::from_secs(1),
        }
    }
}

impl PollRequest {
    pub fn new(
        max_messages: u32,
        visibility_timeout: Duration,
        wait_time: Duration,
    ) -> QueueResult<Self> {
        if max_messages == 0 || max_messages > MAX_MESSAGES_LIMIT {
            return Err(QueueError::invalid_poll_request(format!(
                "max_messages must be between 1 and {MAX_MESSAGES_LIMIT}, got {max_messages}"
            )));
        }
        if visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(QueueError::invalid_poll_request(format!(
                "visibility_timeout {:?} exceeds {:?}",
                visibility_timeout, MAX_VISIBILITY_TIMEOUT
            )));
        }
        if wait_time > MAX_WAIT_TIME {
            return Err(QueueError::invalid_poll_request(format!(
                "wait_time {:?} exceeds {:?}",
                wait_time, MAX_WAIT_TIME
            )));
        }

        Ok(Self {
            max_messages,
            visibility_timeout,
            wait_time,
        })
    }

    pub fn max_messages(&self) -> u32 {
        self.max_messages
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Copy of this request asking for at most `limit` messages (never zero).
    pub fn capped(&self, limit: usize) -> Self {
        let limit = u32::try_from(limit).unwrap_or(u32::MAX).max(1);
        Self {
            max_messages: self.max_messages.min(limit),
            ..*self
        }
    }
}
