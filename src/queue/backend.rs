//! Persistence backends for the delivery queue.
//!
//! A backend stores the full ordered snapshot of live entries. The store
//! calls [`PersistenceBackend::save`] after every mutation while holding its
//! lock, so a backend never sees concurrent saves.

use super::entry::{PersistedQueue, QueueEntry, PERSISTED_VERSION};
use super::QueueError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable storage for queue snapshots.
#[async_trait]
pub trait PersistenceBackend: Send + Sync + 'static {
    /// Load the last saved snapshot, oldest entry first.
    async fn load(&self) -> Result<Vec<QueueEntry>, QueueError>;

    /// Replace the stored snapshot.
    async fn save(&self, entries: &[QueueEntry]) -> Result<(), QueueError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// In-process backend.
///
/// Survives a store being dropped and reopened within the same process,
/// which is how tests simulate restarts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<Vec<QueueEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot currently held, for assertions.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| QueueError::Io(std::io::Error::other("memory backend poisoned")))?;
        Ok(guard.clone())
    }

    async fn save(&self, entries: &[QueueEntry]) -> Result<(), QueueError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| QueueError::Io(std::io::Error::other("memory backend poisoned")))?;
        *guard = entries.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let doc: PersistedQueue = serde_json::from_str(&content)?;
        if doc.version != PERSISTED_VERSION {
            return Err(QueueError::Serialization(format!(
                "unsupported queue file version {} (expected {})",
                doc.version, PERSISTED_VERSION
            )));
        }
        Ok(doc.entries)
    }

    async fn save(&self, entries: &[QueueEntry]) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let doc = PersistedQueue {
            version: PERSISTED_VERSION,
            entries: entries.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&doc)?;

        // Write atomically via temp file
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &body).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
