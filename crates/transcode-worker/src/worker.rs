//! Queue worker: poll → dispatch → acknowledge.
//!
//! One [`Worker::poll`] call is one poll cycle. It receives a batch, spawns
//! one task per message and returns without waiting for them. Each task runs
//! the handler and deletes the delivery only if the handler succeeded.
//! Failed or unacknowledged messages come back after their visibility
//! timeout, which is the only retry mechanism.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn, Instrument};
use transcode_queue::{Message, PollRequest, QueueBinding, QueueClient};

use crate::dispatch::{DispatchOutcome, DispatchReport};
use crate::handler::Handler;
use crate::logging::DispatchLogger;
use crate::metrics;

/// Default cap on concurrently running handlers.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

/// Per-worker settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Parameters of every receive call
    pub poll_request: PollRequest,
    /// Maximum concurrent handler executions; `None` is unbounded
    pub max_in_flight: Option<usize>,
    /// Expected worst-case handler duration, checked against the visibility timeout
    pub handler_timeout: Option<Duration>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_request: PollRequest::default(),
            max_in_flight: Some(DEFAULT_MAX_IN_FLIGHT),
            handler_timeout: None,
        }
    }
}

impl WorkerSettings {
    /// Whether the visibility timeout outlasts the expected handler run.
    /// Unknown handler durations are accepted.
    pub fn visibility_covers_handler(&self) -> bool {
        match self.handler_timeout {
            Some(handler_timeout) => self.poll_request.visibility_timeout() > handler_timeout,
            None => true,
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSummary {
    /// The receive call failed; nothing was dispatched.
    ReceiveFailed,
    /// The queue returned no messages.
    Empty,
    /// Every dispatch slot is busy; receive was not called.
    Saturated,
    /// This many dispatch tasks were started.
    Dispatched(usize),
}

/// Shared state cloned into every dispatch task.
#[derive(Clone)]
struct Dispatcher {
    binding: Arc<QueueBinding>,
    client: Arc<dyn QueueClient>,
    handler: Arc<dyn Handler>,
    in_flight: Arc<AtomicUsize>,
    observer: Option<mpsc::UnboundedSender<DispatchReport>>,
}

impl Dispatcher {
    /// Run the handler for one delivery and acknowledge it on success.
    async fn dispatch(&self, message: Message) -> DispatchReport {
        let logger = DispatchLogger::new(&message);
        logger.log_start();

        let started = Instant::now();
        let result = AssertUnwindSafe(self.handler.handle(message.body()))
            .catch_unwind()
            .instrument(logger.span())
            .await;
        let handler_elapsed = started.elapsed();

        let outcome = match result {
            Ok(Ok(())) => match self.client.delete(&self.binding, message.receipt_token()).await {
                Ok(()) => {
                    logger.log_deleted();
                    DispatchOutcome::Deleted
                }
                Err(e) => {
                    logger.log_delete_failed(&e);
                    DispatchOutcome::DeleteFailed
                }
            },
            Ok(Err(e)) => {
                logger.log_handler_failed(&e);
                DispatchOutcome::LeftForRedelivery
            }
            Err(_) => {
                logger.log_handler_panicked();
                DispatchOutcome::LeftForRedelivery
            }
        };

        metrics::record_dispatch(outcome, handler_elapsed.as_secs_f64());

        DispatchReport {
            receipt_token: message.receipt_token().to_string(),
            message_id: message.message_id().map(str::to_string),
            body: message.body().to_string(),
            outcome,
            elapsed: started.elapsed(),
        }
    }

    fn report(&self, report: DispatchReport) {
        if let Some(observer) = &self.observer {
            // A dropped observer only means nobody is listening any more.
            let _ = observer.send(report);
        }
    }
}

/// Decrements the in-flight count when a dispatch task ends, even by panic.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn enter(in_flight: &Arc<AtomicUsize>) -> Self {
        let count = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_in_flight(count);
        Self {
            in_flight: Arc::clone(in_flight),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let count = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_in_flight(count);
    }
}

/// Polls one queue and dispatches every message to one handler.
pub struct Worker {
    settings: WorkerSettings,
    limiter: Option<Arc<Semaphore>>,
    dispatcher: Dispatcher,
}

impl Worker {
    /// Create a worker bound to one queue.
    pub fn new<C, H>(binding: QueueBinding, client: C, handler: H, settings: WorkerSettings) -> Self
    where
        C: QueueClient + 'static,
        H: Handler + 'static,
    {
        if !settings.visibility_covers_handler() {
            warn!(
                visibility_timeout = ?settings.poll_request.visibility_timeout(),
                handler_timeout = ?settings.handler_timeout,
                "Visibility timeout is shorter than the handler timeout; \
                 long-running messages will be redelivered and processed concurrently"
            );
        }

        let limiter = settings
            .max_in_flight
            .map(|max| Arc::new(Semaphore::new(max.max(1))));

        Self {
            settings,
            limiter,
            dispatcher: Dispatcher {
                binding: Arc::new(binding),
                client: Arc::new(client),
                handler: Arc::new(handler),
                in_flight: Arc::new(AtomicUsize::new(0)),
                observer: None,
            },
        }
    }

    /// Send a [`DispatchReport`] to `observer` whenever a dispatch finishes.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<DispatchReport>) -> Self {
        self.dispatcher.observer = Some(observer);
        self
    }

    pub fn binding(&self) -> &QueueBinding {
        &self.dispatcher.binding
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Number of dispatches currently running.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight.load(Ordering::SeqCst)
    }

    /// Run one poll cycle.
    ///
    /// Never fails: a receive error is logged and ends the cycle, and the
    /// next call simply tries again. Returns as soon as dispatch tasks are
    /// spawned.
    pub async fn poll(&self) -> PollSummary {
        let request = match &self.limiter {
            Some(limiter) => {
                let available = limiter.available_permits();
                if available == 0 {
                    debug!(in_flight = self.in_flight(), "All dispatch slots busy, skipping receive");
                    return PollSummary::Saturated;
                }
                self.settings.poll_request.capped(available)
            }
            None => self.settings.poll_request,
        };

        let messages = match self
            .dispatcher
            .client
            .receive(&self.dispatcher.binding, &request)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                let code = e.code().unwrap_or("none");
                metrics::record_receive_error(code);
                error!(code, error = %e, "Error occurred receiving messages");
                return PollSummary::ReceiveFailed;
            }
        };

        if messages.is_empty() {
            return PollSummary::Empty;
        }

        let count = messages.len();
        metrics::record_messages_received(count);
        debug!(count, "Received messages");

        for message in messages {
            self.spawn_dispatch(message);
        }

        PollSummary::Dispatched(count)
    }

    fn spawn_dispatch(&self, message: Message) {
        // Take the permit now so the next poll sees the slot as used. If a
        // concurrent poll raced us to it, the task waits for one instead.
        let permit = self
            .limiter
            .as_ref()
            .map(|limiter| (Arc::clone(limiter), Arc::clone(limiter).try_acquire_owned().ok()));

        let guard = InFlightGuard::enter(&self.dispatcher.in_flight);
        let dispatcher = self.dispatcher.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let _permit: Option<OwnedSemaphorePermit> = match permit {
                Some((_, Some(permit))) => Some(permit),
                Some((limiter, None)) => limiter.acquire_owned().await.ok(),
                None => None,
            };

            let report = dispatcher.dispatch(message).await;
            dispatcher.report(report);
        });
    }

    /// Wait until no dispatch is running, up to `timeout`.
    ///
    /// Returns `false` if dispatches were still running when it gave up.
    /// A timeout too large to represent as a deadline waits without limit.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.in_flight() == 0 {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
