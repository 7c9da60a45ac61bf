//! Queue entry types and the persisted layout.

use crate::dispatch::FailureKind;
use crate::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queue entry.
///
/// `Pending -> InFlight -> {Delivered | Pending | Failed}`. Delivered and
/// Failed are terminal: the entry leaves the store and is never persisted in
/// either state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    InFlight,
    Delivered,
    Failed,
}

impl EntryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryStatus::Delivered | EntryStatus::Failed)
    }
}

/// Classification and message of the most recent failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// A request plus delivery bookkeeping.
///
/// Serialized form is the durable schema:
/// `{id, payload, modelId, hint, telemetrySnapshot, createdAt, targetEndpoint,
/// attempts, enqueuedAt, status, lastFailure}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    pub request: Request,
    /// Endpoint of the location decided at enqueue time, empty if unresolved
    #[serde(default)]
    pub target_endpoint: String,
    #[serde(default)]
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<LastFailure>,
}

impl QueueEntry {
    pub fn new(request: Request, target_endpoint: impl Into<String>) -> Self {
        Self {
            request,
            target_endpoint: target_endpoint.into(),
            attempts: 0,
            enqueued_at: Utc::now(),
            status: EntryStatus::Pending,
            last_failure: None,
        }
    }

    /// Record a failed direct attempt made before the entry was enqueued.
    pub fn with_failed_attempt(mut self, failure: LastFailure) -> Self {
        self.attempts += 1;
        self.last_failure = Some(failure);
        self
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }
}

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedQueue {
    pub version: u32,
    pub entries: Vec<QueueEntry>,
}

pub(crate) const PERSISTED_VERSION: u32 = 1;
