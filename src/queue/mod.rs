//! Durable delivery queue.
//!
//! Requests that cannot run now are persisted here in arrival order and
//! drained by the queue processor once connectivity returns. The store is the
//! only authority on what remains undelivered.
//!
//! All mutations go through one async lock and are persisted before the lock
//! is released, so enqueue from the submission path and claim/remove from the
//! drain path never interleave mid-write. A mutation whose save fails is
//! rolled back in memory and reported to the caller.

mod backend;
mod entry;
mod error;

pub use backend::{JsonFileBackend, MemoryBackend, PersistenceBackend};
pub use entry::{EntryStatus, LastFailure, QueueEntry};
pub use error::QueueError;

use crate::metrics::names;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Order-preserving, persistent store of pending requests.
pub struct DeliveryQueueStore {
    entries: Mutex<VecDeque<QueueEntry>>,
    backend: Arc<dyn PersistenceBackend>,
    max_entries: Option<usize>,
}

impl std::fmt::Debug for DeliveryQueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueueStore")
            .field("backend", &self.backend.describe())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl DeliveryQueueStore {
    /// Open a store, reloading whatever the backend holds.
    ///
    /// Entries persisted as `InFlight` belonged to an attempt the previous
    /// process never finished; they are reset to `Pending`. Duplicate ids keep
    /// the first occurrence.
    pub async fn open(
        backend: Arc<dyn PersistenceBackend>,
        max_entries: Option<usize>,
    ) -> Result<Self, QueueError> {
        let loaded = backend.load().await?;
        let loaded_count = loaded.len();

        let mut entries: VecDeque<QueueEntry> = VecDeque::with_capacity(loaded_count);
        let mut recovered = 0usize;
        for mut entry in loaded {
            if entries.iter().any(|e| e.id() == entry.id()) {
                tracing::warn!(entry_id = %entry.id(), "Dropping duplicate persisted entry");
                continue;
            }
            match entry.status {
                EntryStatus::InFlight => {
                    entry.status = EntryStatus::Pending;
                    recovered += 1;
                }
                EntryStatus::Pending => {}
                EntryStatus::Delivered | EntryStatus::Failed => {
                    tracing::warn!(entry_id = %entry.id(), status = ?entry.status,
                        "Dropping terminal persisted entry");
                    continue;
                }
            }
            entries.push_back(entry);
        }

        let store = Self {
            entries: Mutex::new(entries),
            backend,
            max_entries,
        };

        {
            let guard = store.entries.lock().await;
            if guard.len() != loaded_count || recovered > 0 {
                store.persist(&guard).await?;
            }
            tracing::info!(
                backend = %store.backend.describe(),
                entries = guard.len(),
                recovered_in_flight = recovered,
                "Delivery queue opened"
            );
            metrics::gauge!(names::QUEUE_DEPTH).set(guard.len() as f64);
        }

        Ok(store)
    }

    /// Store backed by memory only.
    pub async fn in_memory() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            backend: Arc::new(MemoryBackend::new()),
            max_entries: None,
        }
    }

    async fn persist(&self, entries: &VecDeque<QueueEntry>) -> Result<(), QueueError> {
        let (a, b) = entries.as_slices();
        if b.is_empty() {
            self.backend.save(a).await
        } else {
            let all: Vec<QueueEntry> = entries.iter().cloned().collect();
            self.backend.save(&all).await
        }
    }

    /// Append to the tail. Returns the entry id.
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<String, QueueError> {
        let mut guard = self.entries.lock().await;

        if guard.iter().any(|e| e.id() == entry.id()) {
            return Err(QueueError::DuplicateId(entry.id().to_string()));
        }
        if let Some(max_entries) = self.max_entries {
            if guard.len() >= max_entries {
                return Err(QueueError::Full { max_entries });
            }
        }

        let id = entry.id().to_string();
        guard.push_back(entry);

        if let Err(e) = self.persist(&guard).await {
            guard.pop_back();
            return Err(e);
        }

        metrics::gauge!(names::QUEUE_DEPTH).set(guard.len() as f64);
        tracing::debug!(entry_id = %id, depth = guard.len(), "Entry enqueued");
        Ok(id)
    }

    /// Pending entries, oldest first.
    pub async fn list_pending(&self) -> Vec<QueueEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .cloned()
            .collect()
    }

    /// All live entries (pending and in flight), oldest first.
    pub async fn list(&self) -> Vec<QueueEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<QueueEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    /// Delete an entry. Removing a missing id is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, QueueError> {
        let mut guard = self.entries.lock().await;
        let Some(pos) = guard.iter().position(|e| e.id() == id) else {
            return Ok(false);
        };

        let removed = guard.remove(pos);
        if let Err(e) = self.persist(&guard).await {
            if let Some(entry) = removed {
                guard.insert(pos, entry);
            }
            return Err(e);
        }

        metrics::gauge!(names::QUEUE_DEPTH).set(guard.len() as f64);
        Ok(true)
    }

    /// Claim a pending entry for one attempt.
    ///
    /// Marks it `InFlight` and increments `attempts`, persisted before
    /// returning. Returns `None` if the entry is missing or not pending, so a
    /// claimed entry cannot be claimed twice.
    pub async fn mark_in_flight(&self, id: &str) -> Result<Option<QueueEntry>, QueueError> {
        let mut guard = self.entries.lock().await;
        let Some(entry) = guard
            .iter_mut()
            .find(|e| e.id() == id && e.status == EntryStatus::Pending)
        else {
            return Ok(None);
        };

        entry.status = EntryStatus::InFlight;
        entry.attempts += 1;
        let claimed = entry.clone();

        if let Err(e) = self.persist(&guard).await {
            if let Some(entry) = guard.iter_mut().find(|e| e.id() == id) {
                entry.status = EntryStatus::Pending;
                entry.attempts -= 1;
            }
            return Err(e);
        }

        Ok(Some(claimed))
    }

    /// Return an in-flight entry to `Pending`, in place.
    ///
    /// `failure` records why the attempt did not complete; `None` means no
    /// attempt was made and the attempt count is restored.
    pub async fn release(&self, id: &str, failure: Option<LastFailure>) -> Result<(), QueueError> {
        let mut guard = self.entries.lock().await;
        let Some(entry) = guard
            .iter_mut()
            .find(|e| e.id() == id && e.status == EntryStatus::InFlight)
        else {
            return Ok(());
        };

        let previous = entry.clone();
        entry.status = EntryStatus::Pending;
        match failure {
            Some(f) => entry.last_failure = Some(f),
            None => entry.attempts = entry.attempts.saturating_sub(1),
        }

        if let Err(e) = self.persist(&guard).await {
            if let Some(entry) = guard.iter_mut().find(|e| e.id() == id) {
                *entry = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Number of live entries.
    pub async fn depth(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn backend(&self) -> &Arc<dyn PersistenceBackend> {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FailureKind;
    use crate::request::{Payload, Request};
    use crate::routing::RoutingHint;
    use crate::telemetry::TelemetrySnapshot;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn entry(prompt: &str) -> QueueEntry {
        QueueEntry::new(
            Request::new(
                Payload::new(prompt),
                "rene",
                RoutingHint::Automatic,
                TelemetrySnapshot::default(),
            ),
            "",
        )
    }

    /// Memory backend whose saves can be made to fail.
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail: AtomicBool,
    }

    #[async_trait]
    impl PersistenceBackend for FlakyBackend {
        async fn load(&self) -> Result<Vec<QueueEntry>, QueueError> {
            self.inner.load().await
        }
        async fn save(&self, entries: &[QueueEntry]) -> Result<(), QueueError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(QueueError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(entries).await
        }
        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[tokio::test]
    async fn test_enqueue_preserves_fifo() {
        let store = DeliveryQueueStore::in_memory().await;
        let a = store.enqueue(entry("a")).await.unwrap();
        let b = store.enqueue(entry("b")).await.unwrap();
        let c = store.enqueue(entry("c")).await.unwrap();

        let ids: Vec<_> = store
            .list_pending()
            .await
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = DeliveryQueueStore::in_memory().await;
        let e = entry("a");
        store.enqueue(e.clone()).await.unwrap();
        assert!(matches!(
            store.enqueue(e).await,
            Err(QueueError::DuplicateId(_))
        ));
        assert_eq!(store.depth().await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = DeliveryQueueStore::in_memory().await;
        let id = store.enqueue(entry("a")).await.unwrap();

        assert!(store.remove(&id).await.unwrap());
        assert!(!store.remove(&id).await.unwrap());
        assert!(!store.remove("never-existed").await.unwrap());
        assert_eq!(store.depth().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let store = DeliveryQueueStore::open(Arc::new(MemoryBackend::new()), Some(2))
            .await
            .unwrap();
        store.enqueue(entry("a")).await.unwrap();
        store.enqueue(entry("b")).await.unwrap();
        assert!(matches!(
            store.enqueue(entry("c")).await,
            Err(QueueError::Full { max_entries: 2 })
        ));
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_and_counts_attempts() {
        let store = DeliveryQueueStore::in_memory().await;
        let id = store.enqueue(entry("a")).await.unwrap();

        let claimed = store.mark_in_flight(&id).await.unwrap().unwrap();
        assert_eq!(claimed.status, EntryStatus::InFlight);
        assert_eq!(claimed.attempts, 1);

        // Second claim of the same entry fails
        assert!(store.mark_in_flight(&id).await.unwrap().is_none());
        // In-flight entries are not listed as pending
        assert!(store.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_keeps_position() {
        let store = DeliveryQueueStore::in_memory().await;
        let a = store.enqueue(entry("a")).await.unwrap();
        let b = store.enqueue(entry("b")).await.unwrap();

        store.mark_in_flight(&a).await.unwrap();
        store
            .release(
                &a,
                Some(LastFailure {
                    kind: FailureKind::Transient,
                    message: "timeout".to_string(),
                }),
            )
            .await
            .unwrap();

        let pending = store.list_pending().await;
        assert_eq!(pending[0].id(), a);
        assert_eq!(pending[1].id(), b);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_failure.is_some());
    }

    #[tokio::test]
    async fn test_release_without_attempt_restores_count() {
        let store = DeliveryQueueStore::in_memory().await;
        let a = store.enqueue(entry("a")).await.unwrap();
        store.mark_in_flight(&a).await.unwrap();
        store.release(&a, None).await.unwrap();

        let e = store.get(&a).await.unwrap();
        assert_eq!(e.attempts, 0);
        assert_eq!(e.status, EntryStatus::Pending);
    }

    #[tokio::test]
    async fn test_reopen_recovers_in_flight_and_order() {
        let backend = Arc::new(MemoryBackend::new());
        let (a, b) = {
            let store = DeliveryQueueStore::open(backend.clone(), None).await.unwrap();
            let a = store.enqueue(entry("a")).await.unwrap();
            let b = store.enqueue(entry("b")).await.unwrap();
            store.mark_in_flight(&a).await.unwrap();
            (a, b)
        };

        let reopened = DeliveryQueueStore::open(backend.clone(), None).await.unwrap();
        let pending = reopened.list_pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id(), a);
        assert_eq!(pending[0].status, EntryStatus::Pending);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].id(), b);

        // Recovery was written back
        assert!(backend
            .snapshot()
            .iter()
            .all(|e| e.status == EntryStatus::Pending));
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_enqueue() {
        let backend = Arc::new(FlakyBackend::default());
        let store = DeliveryQueueStore::open(backend.clone(), None).await.unwrap();
        store.enqueue(entry("kept")).await.unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.enqueue(entry("lost")).await,
            Err(QueueError::Io(_))
        ));
        assert_eq!(store.depth().await, 1);

        backend.fail.store(false, Ordering::SeqCst);
        assert_eq!(backend.inner.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_remove() {
        let backend = Arc::new(FlakyBackend::default());
        let store = DeliveryQueueStore::open(backend.clone(), None).await.unwrap();
        let a = store.enqueue(entry("a")).await.unwrap();
        let b = store.enqueue(entry("b")).await.unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        assert!(store.remove(&a).await.is_err());

        let ids: Vec<_> = store.list().await.iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_loses_nothing() {
        let store = Arc::new(DeliveryQueueStore::in_memory().await);
        let mut handles = Vec::new();
        for i in 0..50 {
            let s = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                s.enqueue(entry(&format!("msg {}", i))).await
            }));
        }

        let results = futures::future::join_all(handles).await;
        assert!(results.iter().all(|r| r.as_ref().unwrap().is_ok()));
        assert_eq!(store.depth().await, 50);
    }
}
