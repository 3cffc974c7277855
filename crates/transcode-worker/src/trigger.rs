//! Periodic driver for [`Worker::poll`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::worker::{PollSummary, Worker};

/// Calls [`Worker::poll`] on a fixed interval until told to stop.
///
/// Cycles never overlap: the next tick is only awaited after the previous
/// poll returned, and late ticks are delayed rather than bunched.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTrigger {
    interval: Duration,
}

impl IntervalTrigger {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// Returns the number of poll cycles that were run. In-flight
    /// dispatches are not awaited; use [`Worker::wait_idle`] for that.
    pub async fn run(&self, worker: &Worker, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, queue_url = %worker.binding().queue_url(), "Trigger started");

        let mut cycles = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let summary = worker.poll().await;
                    cycles += 1;
                    if summary != PollSummary::Empty {
                        debug!(?summary, cycle = cycles, "Poll cycle finished");
                    }
                }
            }
        }

        info!(cycles, "Trigger stopped");
        cycles
    }
}
