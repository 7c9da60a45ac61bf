//! Queue processor.
//!
//! Drains the delivery queue through the dispatcher, oldest entry first.
//! A pass is triggered at startup and by each "became reachable" signal;
//! nothing polls the queue. At most one pass runs at a time and a trigger
//! that arrives during a pass is a no-op.
//!
//! Per entry, the routing decision is recomputed from the original snapshot
//! with connectivity replaced by the monitor's current state:
//! - `unresolved`: the entry stays pending and the pass stops
//! - delivered: the entry is removed and the pass continues
//! - permanent failure: the entry is removed, reported, and the pass continues
//! - transient failure: the entry is released in place and the pass stops,
//!   so later entries never overtake it
//!
//! An entry found in flight when a pass starts was claimed by an attempt that
//! never settled; it is returned to pending in place and retried first.

use crate::capability::CapabilityCatalog;
use crate::connectivity::ConnectivityMonitor;
use crate::dispatch::{Dispatcher, FailureKind, Outcome};
use crate::metrics::names;
use crate::queue::{DeliveryQueueStore, EntryStatus, LastFailure, QueueEntry};
use crate::routing::{decide, RoutingDecision};
use crate::telemetry::Connectivity;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainResult {
    /// Every pending entry reached a terminal state
    Completed,
    /// A transient failure or a store error halted the pass
    Stalled,
    /// Routing could not resolve a location for the head entry
    Unresolved,
}

impl DrainResult {
    pub fn as_str(self) -> &'static str {
        match self {
            DrainResult::Completed => "completed",
            DrainResult::Stalled => "stalled",
            DrainResult::Unresolved => "unresolved",
        }
    }
}

/// Summary of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub result: DrainResult,
    /// Dispatch attempts made during the pass
    pub attempted: usize,
    pub delivered: usize,
    /// Entries removed as permanently failed
    pub failed: usize,
    /// Entries still in the store when the pass ended
    pub remaining: usize,
}

/// Resets the drain flag when dropped.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight drain worker.
pub struct QueueProcessor {
    store: Arc<DeliveryQueueStore>,
    dispatcher: Arc<Dispatcher>,
    catalog: Arc<CapabilityCatalog>,
    monitor: Arc<ConnectivityMonitor>,
    max_attempts: Option<u32>,
    draining: AtomicBool,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<DeliveryQueueStore>,
        dispatcher: Arc<Dispatcher>,
        catalog: Arc<CapabilityCatalog>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            catalog,
            monitor,
            max_attempts: None,
            draining: AtomicBool::new(false),
        }
    }

    /// Remove an entry after this many attempts end in transient failure.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Run one drain pass.
    ///
    /// The pass runs on its own task, so a caller that stops waiting does not
    /// cut it short with an entry still claimed. Returns `None` without
    /// touching the store if a pass is already running.
    pub async fn drain(self: &Arc<Self>) -> Option<DrainReport> {
        let this = Arc::clone(self);
        match tokio::spawn(async move { this.run_pass().await }).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Drain task failed");
                None
            }
        }
    }

    async fn run_pass(&self) -> Option<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain already in progress, trigger ignored");
            metrics::counter!(names::DRAINS_TOTAL, "result" => "skipped").increment(1);
            return None;
        }
        let _guard = DrainGuard(&self.draining);

        // In-flight entries at this point were claimed by a pass that never
        // settled them; they keep their queue position.
        let pending = self.store.list().await;
        tracing::info!(pending = pending.len(), "Drain started");

        let mut report = DrainReport {
            result: DrainResult::Completed,
            attempted: 0,
            delivered: 0,
            failed: 0,
            remaining: 0,
        };

        for entry in pending {
            if entry.status == EntryStatus::InFlight {
                if let Step::Stop(result) = self.reclaim(&entry).await {
                    report.result = result;
                    break;
                }
            }
            match self.process_entry(&entry, &mut report).await {
                Step::Continue => {}
                Step::Stop(result) => {
                    report.result = result;
                    break;
                }
            }
        }

        report.remaining = self.store.depth().await;
        metrics::counter!(names::DRAINS_TOTAL, "result" => report.result.as_str()).increment(1);
        metrics::gauge!(names::QUEUE_DEPTH).set(report.remaining as f64);
        tracing::info!(
            result = report.result.as_str(),
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            remaining = report.remaining,
            "Drain finished"
        );

        Some(report)
    }

    /// Decision for a queued entry under current connectivity.
    pub fn recompute(&self, entry: &QueueEntry) -> RoutingDecision {
        let request = &entry.request;
        let snapshot = request
            .telemetry
            .with_connectivity(Connectivity::from_reachable(self.monitor.is_reachable()));
        decide(
            &snapshot,
            request.hint,
            self.catalog.profile(&request.model_id),
        )
    }

    async fn process_entry(&self, entry: &QueueEntry, report: &mut DrainReport) -> Step {
        let id = entry.id();

        let decision = self.recompute(entry);
        if decision.is_unresolved() {
            tracing::debug!(entry_id = %id, model = %entry.request.model_id,
                "Entry still unresolved, pass stopped");
            return Step::Stop(DrainResult::Unresolved);
        }

        let claimed = match self.store.mark_in_flight(id).await {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                tracing::warn!(entry_id = %id, "Entry could not be claimed, pass stopped");
                return Step::Stop(DrainResult::Stalled);
            }
            Err(e) => {
                tracing::error!(entry_id = %id, error = %e, "Failed to claim entry, pass stopped");
                return Step::Stop(DrainResult::Stalled);
            }
        };

        report.attempted += 1;
        match self.dispatcher.dispatch(&claimed.request, &decision).await {
            Outcome::Delivered(_) => {
                if let Err(e) = self.store.remove(id).await {
                    tracing::error!(entry_id = %id, error = %e,
                        "Delivered entry could not be removed, pass stopped");
                    self.release_or_log(id, None).await;
                    return Step::Stop(DrainResult::Stalled);
                }
                report.delivered += 1;
                tracing::info!(
                    entry_id = %id,
                    location = ?decision.location(),
                    attempts = claimed.attempts,
                    "Queued entry delivered"
                );
                Step::Continue
            }
            Outcome::Failed {
                kind: FailureKind::Permanent,
                error,
            } => {
                tracing::warn!(
                    entry_id = %id,
                    model = %claimed.request.model_id,
                    attempts = claimed.attempts,
                    kind = "permanent",
                    error = %error,
                    "Queued entry failed permanently and was removed"
                );
                self.remove_failed(id, report).await
            }
            Outcome::Failed {
                kind: FailureKind::Transient,
                error,
            } => {
                if self.max_attempts.is_some_and(|max| claimed.attempts >= max) {
                    tracing::warn!(
                        entry_id = %id,
                        attempts = claimed.attempts,
                        kind = "transient",
                        error = %error,
                        "Queued entry exhausted its attempts and was removed"
                    );
                    return self.remove_failed(id, report).await;
                }

                tracing::info!(
                    entry_id = %id,
                    attempts = claimed.attempts,
                    kind = "transient",
                    error = %error,
                    "Queued entry failed transiently, pass stopped"
                );
                let failure = LastFailure {
                    kind: FailureKind::Transient,
                    message: error.to_string(),
                };
                self.release_or_log(id, Some(failure)).await;
                Step::Stop(DrainResult::Stalled)
            }
        }
    }

    /// Return an entry left in flight to the head of the pass.
    async fn reclaim(&self, entry: &QueueEntry) -> Step {
        let id = entry.id();
        tracing::warn!(entry_id = %id, attempts = entry.attempts,
            "Entry left in flight by an interrupted attempt, retrying");
        let failure = LastFailure {
            kind: FailureKind::Transient,
            message: "attempt interrupted before an outcome was recorded".to_string(),
        };
        match self.store.release(id, Some(failure)).await {
            Ok(()) => Step::Continue,
            Err(e) => {
                tracing::error!(entry_id = %id, error = %e,
                    "Failed to reclaim entry, pass stopped");
                Step::Stop(DrainResult::Stalled)
            }
        }
    }

    async fn remove_failed(&self, id: &str, report: &mut DrainReport) -> Step {
        match self.store.remove(id).await {
            Ok(_) => {
                report.failed += 1;
                metrics::counter!(names::ENTRIES_FAILED_TOTAL).increment(1);
                Step::Continue
            }
            Err(e) => {
                tracing::error!(entry_id = %id, error = %e,
                    "Failed entry could not be removed, pass stopped");
                self.release_or_log(id, None).await;
                Step::Stop(DrainResult::Stalled)
            }
        }
    }

    async fn release_or_log(&self, id: &str, failure: Option<LastFailure>) {
        if let Err(e) = self.store.release(id, failure).await {
            // Entry stays in flight until the store is reopened
            tracing::error!(entry_id = %id, error = %e, "Failed to release entry");
        }
    }

    /// Start the trigger loop: one pass now, then one per reachability signal.
    pub fn start(self: Arc<Self>, cancel_token: CancellationToken) -> JoinHandle<()> {
        let mut signals = self.monitor.subscribe();
        tokio::spawn(async move {
            tracing::info!("Queue processor started");
            self.drain().await;

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Queue processor shutting down");
                        break;
                    }
                    signal = signals.recv() => match signal {
                        Ok(signal) => {
                            tracing::debug!(source = %signal.source, "Drain triggered by reachability");
                            self.drain().await;
                        }
                        Err(RecvError::Lagged(missed)) => {
                            tracing::debug!(missed, "Reachability signals coalesced");
                            self.drain().await;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }
}

enum Step {
    Continue,
    Stop(DrainResult),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ExecutionResult, Executor, ExecutorError};
    use crate::request::{Payload, Request};
    use crate::routing::RoutingHint;
    use crate::telemetry::TelemetrySnapshot;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Executor that replays a script and records prompts it saw.
    #[derive(Default)]
    struct Script {
        replies: Mutex<VecDeque<Result<ExecutionResult, ExecutorError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Script {
        fn with(replies: Vec<Result<ExecutionResult, ExecutorError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for Script {
        fn name(&self) -> &str {
            "script"
        }
        fn endpoint(&self) -> &str {
            "script://"
        }
        async fn execute(&self, request: &Request) -> Result<ExecutionResult, ExecutorError> {
            self.seen.lock().unwrap().push(request.payload.prompt.clone());
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(ExecutionResult {
                result: "ok".to_string(),
            }))
        }
    }

    fn ok() -> Result<ExecutionResult, ExecutorError> {
        Ok(ExecutionResult {
            result: "ok".to_string(),
        })
    }

    fn server_request(prompt: &str) -> QueueEntry {
        QueueEntry::new(
            Request::new(
                Payload::new(prompt),
                "llamba-1b",
                RoutingHint::Server,
                TelemetrySnapshot::new(Connectivity::Unreachable, 0),
            ),
            "",
        )
    }

    async fn setup(
        script: Arc<Script>,
        reachable: bool,
    ) -> (Arc<QueueProcessor>, Arc<DeliveryQueueStore>, Arc<ConnectivityMonitor>) {
        setup_with(script, reachable, None).await
    }

    async fn setup_with(
        script: Arc<Script>,
        reachable: bool,
        max_attempts: Option<u32>,
    ) -> (Arc<QueueProcessor>, Arc<DeliveryQueueStore>, Arc<ConnectivityMonitor>) {
        let store = Arc::new(DeliveryQueueStore::in_memory().await);
        let monitor = ConnectivityMonitor::new(reachable, Duration::ZERO);
        let dispatcher = Arc::new(Dispatcher::new(
            script.clone(),
            script,
            Duration::from_secs(5),
        ));
        let processor = Arc::new(
            QueueProcessor::new(
                store.clone(),
                dispatcher,
                Arc::new(CapabilityCatalog::default()),
                monitor.clone(),
            )
            .with_max_attempts(max_attempts),
        );
        (processor, store, monitor)
    }

    #[tokio::test]
    async fn test_drain_delivers_in_order() {
        let script = Script::with(vec![]);
        let (processor, store, _) = setup(script.clone(), true).await;
        for p in ["a", "b", "c"] {
            store.enqueue(server_request(p)).await.unwrap();
        }

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Completed);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.remaining, 0);
        assert_eq!(script.seen(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unresolved_head_stops_pass_without_dispatch() {
        let script = Script::with(vec![]);
        let (processor, store, _) = setup(script.clone(), false).await;
        store.enqueue(server_request("a")).await.unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Unresolved);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.remaining, 1);
        assert!(script.seen().is_empty());
        assert_eq!(store.list_pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_stops_pass_and_keeps_order() {
        let script = Script::with(vec![Err(ExecutorError::Timeout(5000))]);
        let (processor, store, _) = setup(script.clone(), true).await;
        let a = store.enqueue(server_request("a")).await.unwrap();
        let b = store.enqueue(server_request("b")).await.unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Stalled);
        assert_eq!(script.seen(), vec!["a"]);

        let pending = store.list_pending().await;
        assert_eq!(pending[0].id(), a);
        assert_eq!(pending[1].id(), b);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].attempts, 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_does_not_block_later_entries() {
        let script = Script::with(vec![
            Err(ExecutorError::Upstream {
                status: 400,
                message: "bad".to_string(),
            }),
            ok(),
        ]);
        let (processor, store, _) = setup(script.clone(), true).await;
        store.enqueue(server_request("a")).await.unwrap();
        store.enqueue(server_request("b")).await.unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Completed);
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(store.depth().await, 0);
    }

    #[tokio::test]
    async fn test_max_attempts_removes_exhausted_entry() {
        let script = Script::with(vec![
            Err(ExecutorError::Network("down".to_string())),
            Err(ExecutorError::Network("down".to_string())),
        ]);
        let (processor, store, _) = setup_with(script.clone(), true, Some(2)).await;
        store.enqueue(server_request("a")).await.unwrap();
        store.enqueue(server_request("b")).await.unwrap();

        let first = processor.drain().await.unwrap();
        assert_eq!(first.result, DrainResult::Stalled);

        let second = processor.drain().await.unwrap();
        assert_eq!(second.failed, 1);
        assert_eq!(second.delivered, 1);
        assert_eq!(second.result, DrainResult::Completed);
        assert_eq!(script.seen(), vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_skipped() {
        let (processor, _store, _) = setup(Script::with(vec![]), true).await;
        processor.draining.store(true, Ordering::SeqCst);
        assert!(processor.drain().await.is_none());

        processor.draining.store(false, Ordering::SeqCst);
        assert!(processor.drain().await.is_some());
        assert!(!processor.is_draining());
    }

    #[tokio::test]
    async fn test_in_flight_head_is_retried_before_later_entries() {
        let script = Script::with(vec![]);
        let (processor, store, _) = setup(script.clone(), true).await;
        let a = store.enqueue(server_request("a")).await.unwrap();
        store.enqueue(server_request("b")).await.unwrap();
        // Claimed by a pass that never settled it
        store.mark_in_flight(&a).await.unwrap().unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Completed);
        assert_eq!(report.delivered, 2);
        assert_eq!(script.seen(), vec!["a", "b"]);
        assert_eq!(store.depth().await, 0);
    }

    #[tokio::test]
    async fn test_in_flight_head_keeps_position_after_transient_failure() {
        let script = Script::with(vec![Err(ExecutorError::Network("down".to_string()))]);
        let (processor, store, _) = setup(script.clone(), true).await;
        let a = store.enqueue(server_request("a")).await.unwrap();
        store.enqueue(server_request("b")).await.unwrap();
        store.mark_in_flight(&a).await.unwrap().unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.result, DrainResult::Stalled);
        assert_eq!(script.seen(), vec!["a"]);

        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id(), a);
        // The interrupted claim and the retry both count
        assert_eq!(pending[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_trigger_loop_drains_on_reachable() {
        let script = Script::with(vec![]);
        let (processor, store, monitor) = setup(script.clone(), false).await;
        store.enqueue(server_request("a")).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = processor.clone().start(cancel.clone());

        // Startup pass finds the entry unresolved
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.depth().await, 1);

        monitor.observe(true, "test");
        for _ in 0..100 {
            if store.depth().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.depth().await, 0);
        assert_eq!(script.seen(), vec!["a"]);

        cancel.cancel();
        handle.await.unwrap();
    }
}
