//! Wire types for the executor boundary.

use crate::request::{Payload, Request};
use crate::telemetry::TelemetrySnapshot;
use serde::{Deserialize, Serialize};

/// Body POSTed to an executor endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub model: String,
    pub payload: Payload,
    pub telemetry_snapshot: TelemetrySnapshot,
}

impl From<&Request> for ExecutionRequest {
    fn from(request: &Request) -> Self {
        Self {
            model: request.model_id.clone(),
            payload: request.payload.clone(),
            telemetry_snapshot: request.telemetry.clone(),
        }
    }
}

/// Successful executor response (`200 {"result": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub result: String,
}

/// Error executor response (non-2xx `{"error": ...}`).
///
/// `error` is usually a string but some runtimes nest an object; both are
/// accepted and rendered to text.
#[derive(Debug, Deserialize)]
pub(crate) struct ExecutionErrorBody {
    pub error: serde_json::Value,
}

impl ExecutionErrorBody {
    pub fn message(&self) -> String {
        match &self.error {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.error.to_string()),
            other => other.to_string(),
        }
    }
}
