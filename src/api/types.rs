//! Request and response bodies for the HTTP surface.

use crate::capability::ResolvedProfile;
use crate::processor::DrainReport;
use crate::queue::QueueEntry;
use serde::{Deserialize, Serialize};

/// GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` while reachable, `degraded` while offline
    pub status: String,
    pub uptime_seconds: u64,
    pub reachable: bool,
    pub queue_depth: usize,
    pub draining: bool,
}

/// GET /v1/models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ResolvedProfile>,
}

/// GET /v1/queue
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub depth: usize,
    pub entries: Vec<QueueEntry>,
}

/// POST /v1/queue/drain
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DrainResponse {
    Report(DrainReport),
    Skipped { skipped: bool },
}

/// POST /v1/connectivity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectivityUpdate {
    pub reachable: bool,
}
