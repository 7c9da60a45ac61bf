//! OpenAI-style error envelope for the HTTP surface.

use crate::gateway::GatewayError;
use crate::queue::QueueError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error response: `{"error": {"message", "type", "code"}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: &str, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: r#type.to_string(),
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "invalid_request_error")
    }

    /// Create a permanent rejection error (422).
    pub fn rejected(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "request_rejected")
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self::new(message, "server_error", "service_unavailable")
    }

    /// Create an internal error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message, "server_error", "internal_error")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("request_rejected") => StatusCode::UNPROCESSABLE_ENTITY,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(&rejection.body_text())
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Full { .. } => ApiError::service_unavailable(&e.to_string()),
            other => ApiError::internal(&other.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidRequest(message) => ApiError::bad_request(&message),
            rejected @ GatewayError::Rejected { .. } => ApiError::rejected(&rejected.to_string()),
            GatewayError::Queue(queue) => queue.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ExecutorError;
    use crate::routing::Location;

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(ApiError::rejected("unsupported model")).unwrap();
        assert_eq!(json["error"]["message"], "unsupported model");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "request_rejected");
    }

    #[test]
    fn test_gateway_error_status_mapping() {
        let status = |e: GatewayError| ApiError::from(e).status_code();

        assert_eq!(
            status(GatewayError::InvalidRequest("empty".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(GatewayError::Rejected {
                location: Location::Server,
                error: ExecutorError::Upstream {
                    status: 400,
                    message: "bad".to_string()
                },
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(GatewayError::Queue(QueueError::Full { max_entries: 1 })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(GatewayError::Queue(QueueError::Serialization("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
