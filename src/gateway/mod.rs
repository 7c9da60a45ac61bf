//! Submission gateway.
//!
//! The synchronous path for a new request: validate, route, then either run
//! it now or hand it to the delivery queue.
//!
//! | Decision / outcome     | Response                         |
//! |------------------------|----------------------------------|
//! | unresolved             | queued, no dispatch call         |
//! | delivered              | `{status: "delivered", result}`  |
//! | transient failure      | queued with one attempt recorded |
//! | permanent failure      | error returned to the caller     |
//!
//! Dropping the returned future before `enqueue` completes withdraws the
//! request. Once enqueued it belongs to the store.

mod error;

pub use error::GatewayError;

use crate::capability::{CapabilityCatalog, ResolvedProfile};
use crate::connectivity::ConnectivityMonitor;
use crate::dispatch::{Dispatcher, FailureKind, Outcome};
use crate::logging::truncate_prompt;
use crate::metrics::names;
use crate::queue::{DeliveryQueueStore, LastFailure, QueueEntry};
use crate::request::{Payload, Request};
use crate::routing::{decide, LatencyEstimate, RoutingDecision, RoutingHint};
use crate::telemetry::{Connectivity, DeviceResourceState, NetworkCondition, TelemetrySnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller input: `{payload, modelId, hint, telemetrySnapshot}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub payload: Payload,
    pub model_id: String,
    #[serde(default)]
    pub hint: RoutingHint,
    #[serde(default)]
    pub telemetry_snapshot: TelemetrySnapshot,
}

/// Caller output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    Delivered {
        result: String,
    },
    Queued {
        #[serde(rename = "entryId")]
        entry_id: String,
    },
}

/// What the router would do with a submission, without doing it.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePreview {
    pub decision: RoutingDecision,
    pub model: ResolvedProfile,
    pub estimate: LatencyEstimate,
    pub connectivity: Connectivity,
    pub network_condition: NetworkCondition,
    pub device_state: DeviceResourceState,
}

impl RoutePreview {
    pub fn compute(snapshot: &TelemetrySnapshot, hint: RoutingHint, model: ResolvedProfile) -> Self {
        Self {
            decision: decide(snapshot, hint, &model.profile),
            estimate: LatencyEstimate::compute(snapshot, &model.profile),
            connectivity: snapshot.connectivity(),
            network_condition: snapshot.network_condition(),
            device_state: snapshot.device_state(),
            model,
        }
    }
}

/// Routes and executes new submissions.
pub struct Gateway {
    catalog: Arc<CapabilityCatalog>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<DeliveryQueueStore>,
    monitor: Arc<ConnectivityMonitor>,
    content_logging: bool,
}

impl Gateway {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<DeliveryQueueStore>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            store,
            monitor,
            content_logging: false,
        }
    }

    pub fn with_content_logging(mut self, enabled: bool) -> Self {
        self.content_logging = enabled;
        self
    }

    /// Snapshot used for routing.
    ///
    /// A snapshot that states no connectivity, explicitly or through an
    /// offline effective type, takes the monitor's current reachability.
    pub fn effective_snapshot(&self, snapshot: &TelemetrySnapshot) -> TelemetrySnapshot {
        if snapshot.connectivity.is_none() && snapshot.connectivity().is_reachable() {
            snapshot.with_connectivity(Connectivity::from_reachable(self.monitor.is_reachable()))
        } else {
            snapshot.clone()
        }
    }

    /// Route a submission without executing or enqueuing it.
    pub fn preview(&self, submission: &SubmitRequest) -> RoutePreview {
        let snapshot = self.effective_snapshot(&submission.telemetry_snapshot);
        RoutePreview::compute(
            &snapshot,
            submission.hint,
            self.catalog.resolve(&submission.model_id),
        )
    }

    pub async fn submit(&self, submission: SubmitRequest) -> Result<SubmitResponse, GatewayError> {
        submission
            .payload
            .validate()
            .map_err(GatewayError::InvalidRequest)?;
        if submission.model_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "modelId cannot be empty".to_string(),
            ));
        }

        let snapshot = self.effective_snapshot(&submission.telemetry_snapshot);
        let request = Request::new(
            submission.payload,
            submission.model_id,
            submission.hint,
            snapshot,
        );

        let decision = decide(
            &request.telemetry,
            request.hint,
            self.catalog.profile(&request.model_id),
        );
        self.record_decision(&request, &decision);

        let Some(location) = decision.location() else {
            let entry_id = self.store.enqueue(QueueEntry::new(request, "")).await?;
            tracing::info!(entry_id = %entry_id, "Request queued, no location resolvable");
            return Ok(SubmitResponse::Queued { entry_id });
        };

        match self.dispatcher.dispatch(&request, &decision).await {
            Outcome::Delivered(result) => Ok(SubmitResponse::Delivered {
                result: result.result,
            }),
            Outcome::Failed {
                kind: FailureKind::Permanent,
                error,
            } => {
                tracing::warn!(
                    request_id = %request.id,
                    location = %location,
                    kind = "permanent",
                    error = %error,
                    "Request rejected"
                );
                Err(GatewayError::Rejected { location, error })
            }
            Outcome::Failed {
                kind: FailureKind::Transient,
                error,
            } => {
                let target = self.dispatcher.endpoint_for(&decision);
                let entry = QueueEntry::new(request, target).with_failed_attempt(LastFailure {
                    kind: FailureKind::Transient,
                    message: error.to_string(),
                });
                let entry_id = self.store.enqueue(entry).await?;
                tracing::info!(
                    entry_id = %entry_id,
                    location = %location,
                    kind = "transient",
                    error = %error,
                    "Direct attempt failed, request queued"
                );
                Ok(SubmitResponse::Queued { entry_id })
            }
        }
    }

    fn record_decision(&self, request: &Request, decision: &RoutingDecision) {
        metrics::counter!(names::DECISIONS_TOTAL,
            "location" => decision.label(),
            "rationale" => decision.rationale().as_str()
        )
        .increment(1);

        tracing::debug!(
            request_id = %request.id,
            model = %request.model_id,
            hint = ?request.hint,
            decision = decision.label(),
            rationale = %decision.rationale(),
            rtt_ms = request.telemetry.rtt(),
            network_condition = ?request.telemetry.network_condition(),
            device_state = ?request.telemetry.device_state(),
            prompt = truncate_prompt(&request.payload, self.content_logging).as_deref(),
            "Routing decision"
        );
    }
}
