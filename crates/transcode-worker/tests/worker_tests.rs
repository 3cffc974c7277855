//! Poll → dispatch → acknowledge behaviour against an in-memory queue.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Semaphore};
use transcode_queue::{
    Message, PollRequest, QueueBinding, QueueClient, QueueError, QueueOperation, QueueResult,
};
use transcode_worker::{
    handler_fn, DispatchOutcome, DispatchReport, HandlerError, HandlerResult, IntervalTrigger,
    PollSummary, Worker, WorkerSettings,
};

#[derive(Default)]
struct FakeQueue {
    batches: Mutex<VecDeque<QueueResult<Vec<Message>>>>,
    requests: Mutex<Vec<PollRequest>>,
    deleted: Mutex<Vec<String>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl FakeQueue {
    fn push_batch(&self, bodies: &[&str]) {
        let messages = bodies
            .iter()
            .map(|body| Message::new(*body, format!("r-{body}")).with_message_id(format!("m-{body}")))
            .collect();
        self.batches.lock().unwrap().push_back(Ok(messages));
    }

    fn push_error(&self) {
        self.batches.lock().unwrap().push_back(Err(QueueError::transport(
            QueueOperation::Receive,
            "AWS.SimpleQueueService.NonExistentQueue",
            "queue does not exist",
        )));
    }

    fn fail_delete(&self, receipt_token: &str) {
        self.failing_deletes.lock().unwrap().insert(receipt_token.to_string());
    }

    fn receive_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requested_max(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|r| r.max_messages()).collect()
    }

    fn deleted(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

#[async_trait]
impl QueueClient for FakeQueue {
    async fn receive(&self, _binding: &QueueBinding, request: &PollRequest) -> QueueResult<Vec<Message>> {
        self.requests.lock().unwrap().push(*request);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete(&self, _binding: &QueueBinding, receipt_token: &str) -> QueueResult<()> {
        if self.failing_deletes.lock().unwrap().contains(receipt_token) {
            return Err(QueueError::transport(
                QueueOperation::Delete,
                "ReceiptHandleIsInvalid",
                "receipt handle has expired",
            ));
        }
        self.deleted.lock().unwrap().push(receipt_token.to_string());
        Ok(())
    }
}

fn binding() -> QueueBinding {
    QueueBinding::new("http://localhost:4566/000000000000/transcode", "us-east-1").unwrap()
}

fn unbounded() -> WorkerSettings {
    WorkerSettings {
        max_in_flight: None,
        ..WorkerSettings::default()
    }
}

/// Handler that fails any body starting with "bad" and panics on "boom".
fn judging_handler(calls: Arc<AtomicUsize>) -> impl transcode_worker::Handler {
    handler_fn(move |body: String| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if body == "boom" {
                panic!("handler exploded");
            }
            if body.starts_with("bad") {
                return Err(HandlerError::from(format!("rejected {body}")));
            }
            HandlerResult::Ok(())
        }
    })
}

/// Handler that blocks until the gate hands out a permit.
fn gated_handler(gate: Arc<Semaphore>) -> impl transcode_worker::Handler {
    handler_fn(move |_body: String| {
        let gate = Arc::clone(&gate);
        async move {
            let permit = gate.acquire().await.map_err(HandlerError::from)?;
            permit.forget();
            HandlerResult::Ok(())
        }
    })
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<DispatchReport>, n: usize) -> Vec<DispatchReport> {
    let mut reports = Vec::with_capacity(n);
    for _ in 0..n {
        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for dispatch")
            .expect("observer closed");
        reports.push(report);
    }
    reports.sort_by(|a, b| a.body.cmp(&b.body));
    reports
}

#[tokio::test]
async fn test_deletes_only_successful_messages() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["a", "bad-b", "c"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(binding(), Arc::clone(&queue), judging_handler(Arc::clone(&calls)), unbounded())
        .with_observer(tx);

    assert_eq!(worker.poll().await, PollSummary::Dispatched(3));

    let reports = collect(&mut rx, 3).await;
    let outcomes: Vec<_> = reports.iter().map(|r| (r.body.as_str(), r.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            ("a", DispatchOutcome::Deleted),
            ("bad-b", DispatchOutcome::LeftForRedelivery),
            ("c", DispatchOutcome::Deleted),
        ]
    );
    assert_eq!(reports[0].message_id.as_deref(), Some("m-a"));
    assert_eq!(queue.deleted(), vec!["r-a", "r-c"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_receive_error_ends_cycle() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_error();
    queue.push_batch(&["a"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(binding(), Arc::clone(&queue), judging_handler(Arc::clone(&calls)), unbounded())
        .with_observer(tx);

    assert_eq!(worker.poll().await, PollSummary::ReceiveFailed);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(queue.deleted().is_empty());

    // The next cycle receives again.
    assert_eq!(worker.poll().await, PollSummary::Dispatched(1));
    collect(&mut rx, 1).await;
    assert_eq!(queue.receive_calls(), 2);
    assert_eq!(queue.deleted(), vec!["r-a"]);
}

#[tokio::test]
async fn test_empty_batch() {
    let queue = Arc::new(FakeQueue::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let worker = Worker::new(binding(), Arc::clone(&queue), judging_handler(Arc::clone(&calls)), unbounded());

    assert_eq!(worker.poll().await, PollSummary::Empty);
    assert_eq!(worker.in_flight(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.receive_calls(), 1);
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["a", "b"]);
    queue.fail_delete("r-b");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(
        binding(),
        Arc::clone(&queue),
        judging_handler(Arc::new(AtomicUsize::new(0))),
        unbounded(),
    )
    .with_observer(tx);

    worker.poll().await;
    let reports = collect(&mut rx, 2).await;

    assert_eq!(reports[0].outcome, DispatchOutcome::Deleted);
    assert_eq!(reports[1].outcome, DispatchOutcome::DeleteFailed);
    assert!(reports[1].outcome.handler_succeeded());
    assert_eq!(queue.deleted(), vec!["r-a"]);
}

#[tokio::test]
async fn test_each_message_dispatched_once() {
    let queue = Arc::new(FakeQueue::default());
    let bodies: Vec<String> = (0..10).map(|i| format!("msg-{i}")).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    queue.push_batch(&refs);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let handler = handler_fn(move |body: String| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder.lock().unwrap().push(body);
            HandlerResult::Ok(())
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(binding(), Arc::clone(&queue), handler, unbounded()).with_observer(tx);

    assert_eq!(worker.poll().await, PollSummary::Dispatched(10));
    collect(&mut rx, 10).await;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    let mut expected = bodies.clone();
    expected.sort();
    assert_eq!(seen, expected);
    assert_eq!(queue.deleted().len(), 10);
}

#[tokio::test]
async fn test_poll_returns_before_handlers_finish() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["slow"]);

    let gate = Arc::new(Semaphore::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(binding(), Arc::clone(&queue), gated_handler(Arc::clone(&gate)), unbounded())
        .with_observer(tx);

    assert_eq!(worker.poll().await, PollSummary::Dispatched(1));
    assert_eq!(worker.in_flight(), 1);
    assert!(queue.deleted().is_empty());

    gate.add_permits(1);
    let reports = collect(&mut rx, 1).await;
    assert_eq!(reports[0].outcome, DispatchOutcome::Deleted);
    assert!(worker.wait_idle(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_bounded_worker_skips_receive_when_saturated() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["a", "b"]);
    queue.push_batch(&["c"]);

    let gate = Arc::new(Semaphore::new(0));
    let settings = WorkerSettings {
        max_in_flight: Some(2),
        ..WorkerSettings::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(binding(), Arc::clone(&queue), gated_handler(Arc::clone(&gate)), settings)
        .with_observer(tx);

    assert_eq!(worker.poll().await, PollSummary::Dispatched(2));
    assert_eq!(worker.poll().await, PollSummary::Saturated);
    assert_eq!(queue.receive_calls(), 1);

    gate.add_permits(1);
    collect(&mut rx, 1).await;
    assert!(tokio::time::timeout(Duration::from_secs(1), async {
        while worker.in_flight() > 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok());

    // One slot free: the request is capped to it.
    assert_eq!(worker.poll().await, PollSummary::Dispatched(1));
    assert_eq!(queue.requested_max(), vec![2, 1]);

    gate.add_permits(2);
    collect(&mut rx, 2).await;
    assert!(worker.wait_idle(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_unbounded_worker_always_requests_full_batch() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["a", "b", "c"]);

    let gate = Arc::new(Semaphore::new(0));
    let worker = Worker::new(binding(), Arc::clone(&queue), gated_handler(Arc::clone(&gate)), unbounded());

    assert_eq!(worker.poll().await, PollSummary::Dispatched(3));
    assert_eq!(worker.poll().await, PollSummary::Empty);
    assert_eq!(queue.requested_max(), vec![10, 10]);

    gate.add_permits(3);
    assert!(worker.wait_idle(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_handler_panic_leaves_message() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["boom", "a"]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(
        binding(),
        Arc::clone(&queue),
        judging_handler(Arc::new(AtomicUsize::new(0))),
        WorkerSettings::default(),
    )
    .with_observer(tx);

    worker.poll().await;
    let reports = collect(&mut rx, 2).await;

    assert_eq!(reports[0].body, "a");
    assert_eq!(reports[0].outcome, DispatchOutcome::Deleted);
    assert_eq!(reports[1].body, "boom");
    assert_eq!(reports[1].outcome, DispatchOutcome::LeftForRedelivery);
    assert_eq!(queue.deleted(), vec!["r-a"]);
    assert!(worker.wait_idle(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_wait_idle_times_out() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["stuck"]);

    let gate = Arc::new(Semaphore::new(0));
    let worker = Worker::new(binding(), Arc::clone(&queue), gated_handler(Arc::clone(&gate)), unbounded());

    worker.poll().await;
    assert!(!worker.wait_idle(Duration::from_millis(100)).await);
    assert_eq!(worker.in_flight(), 1);

    gate.add_permits(1);
    assert!(worker.wait_idle(Duration::from_secs(1)).await);
    assert_eq!(queue.deleted(), vec!["r-stuck"]);
}

#[tokio::test]
async fn test_trigger_polls_until_shutdown() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["a"]);
    queue.push_batch(&["b"]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(
        binding(),
        Arc::clone(&queue),
        judging_handler(Arc::new(AtomicUsize::new(0))),
        unbounded(),
    )
    .with_observer(tx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let trigger = IntervalTrigger::new(Duration::from_millis(10));

    let stop = async {
        let reports = collect(&mut rx, 2).await;
        shutdown_tx.send(true).unwrap();
        reports
    };

    let (cycles, reports) = tokio::join!(trigger.run(&worker, shutdown_rx), stop);

    assert!(cycles >= 2);
    assert_eq!(reports.len(), 2);
    assert_eq!(queue.deleted(), vec!["r-a", "r-b"]);
}

#[tokio::test]
async fn test_trigger_stops_when_sender_dropped() {
    let queue = Arc::new(FakeQueue::default());
    let worker = Worker::new(
        binding(),
        Arc::clone(&queue),
        judging_handler(Arc::new(AtomicUsize::new(0))),
        unbounded(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    let cycles = tokio::time::timeout(
        Duration::from_secs(1),
        IntervalTrigger::new(Duration::from_millis(10)).run(&worker, shutdown_rx),
    )
    .await
    .unwrap();
    assert!(cycles <= 1);
}

#[tokio::test]
async fn test_wait_idle_with_unbounded_timeout() {
    let queue = Arc::new(FakeQueue::default());
    queue.push_batch(&["long"]);

    let gate = Arc::new(Semaphore::new(0));
    let worker = Worker::new(binding(), Arc::clone(&queue), gated_handler(Arc::clone(&gate)), unbounded());

    assert_eq!(worker.poll().await, PollSummary::Dispatched(1));

    let release = Arc::clone(&gate);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        release.add_permits(1);
    });

    assert!(worker.wait_idle(Duration::from_secs(u64::MAX)).await);
    assert_eq!(queue.deleted(), vec!["r-long"]);
}
