//! Execution dispatcher.
//!
//! Runs one attempt of a request at the location a [`RoutingDecision`] names,
//! bounded by a fixed per-attempt timeout, and classifies the result. The
//! dispatcher never touches the queue; callers act on the [`Outcome`].

use crate::agent::{ExecutionResult, Executor, ExecutorError};
use crate::logging::outcome_label;
use crate::metrics::names;
use crate::request::Request;
use crate::routing::{Location, RoutingDecision};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Retry classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retry on a later attempt
    Transient,
    /// Terminal, never retried
    Permanent,
}

impl FailureKind {
    /// Classify an executor error.
    ///
    /// Timeouts, network errors, malformed responses and 5xx are transient.
    /// 408 and 429 are transient. Every other 4xx and invalid requests are
    /// permanent.
    pub fn classify(error: &ExecutorError) -> Self {
        match error {
            ExecutorError::Network(_)
            | ExecutorError::Timeout(_)
            | ExecutorError::InvalidResponse(_) => FailureKind::Transient,
            ExecutorError::InvalidRequest(_) => FailureKind::Permanent,
            ExecutorError::Upstream { status, .. } => match status {
                408 | 429 => FailureKind::Transient,
                400..=499 => FailureKind::Permanent,
                _ => FailureKind::Transient,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
        }
    }
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Delivered(ExecutionResult),
    Failed {
        kind: FailureKind,
        error: ExecutorError,
    },
}

impl Outcome {
    pub fn failed(error: ExecutorError) -> Self {
        Outcome::Failed {
            kind: FailureKind::classify(&error),
            error,
        }
    }
}

/// Invokes the local or server executor for one request.
pub struct Dispatcher {
    local: Arc<dyn Executor>,
    server: Arc<dyn Executor>,
    attempt_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        local: Arc<dyn Executor>,
        server: Arc<dyn Executor>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            local,
            server,
            attempt_timeout,
        }
    }

    pub fn executor(&self, location: Location) -> &Arc<dyn Executor> {
        match location {
            Location::Local => &self.local,
            Location::Server => &self.server,
        }
    }

    /// Endpoint for a decision, empty when unresolved.
    pub fn endpoint_for(&self, decision: &RoutingDecision) -> String {
        decision
            .location()
            .map(|l| self.executor(l).endpoint().to_string())
            .unwrap_or_default()
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Run one attempt.
    ///
    /// An unresolved decision makes no external call and reports a transient
    /// network failure; callers enqueue on unresolved before reaching here.
    pub async fn dispatch(&self, request: &Request, decision: &RoutingDecision) -> Outcome {
        let Some(location) = decision.location() else {
            return Outcome::failed(ExecutorError::Network(
                "no reachable execution location".to_string(),
            ));
        };

        let executor = self.executor(location);
        let start = Instant::now();

        let outcome =
            match tokio::time::timeout(self.attempt_timeout, executor.execute(request)).await {
                Ok(Ok(result)) => Outcome::Delivered(result),
                Ok(Err(error)) => Outcome::failed(error),
                Err(_) => Outcome::failed(ExecutorError::Timeout(
                    self.attempt_timeout.as_millis() as u64,
                )),
            };

        let elapsed = start.elapsed();
        metrics::counter!(names::DISPATCH_TOTAL,
            "location" => location.as_str(),
            "outcome" => outcome_label(&outcome)
        )
        .increment(1);
        metrics::histogram!(names::DISPATCH_DURATION_SECONDS, "location" => location.as_str())
            .record(elapsed.as_secs_f64());

        match &outcome {
            Outcome::Delivered(_) => tracing::debug!(
                request_id = %request.id,
                location = %location,
                executor = executor.name(),
                latency_ms = elapsed.as_millis() as u64,
                "Dispatch delivered"
            ),
            Outcome::Failed { kind, error } => tracing::debug!(
                request_id = %request.id,
                location = %location,
                executor = executor.name(),
                kind = kind.as_str(),
                error = %error,
                "Dispatch failed"
            ),
        }

        outcome
    }
}
