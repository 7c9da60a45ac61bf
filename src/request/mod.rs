//! Units of user work.

use crate::routing::RoutingHint;
use crate::telemetry::TelemetrySnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.85
}

fn default_top_p() -> f32 {
    0.99
}

/// Generation input.
///
/// Only `prompt` is required. Defaults: `max_tokens = 200`,
/// `temperature = 0.85`, `top_p = 0.99`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Payload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }

    /// Reason the payload cannot be executed anywhere, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt cannot be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than zero".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(format!("top_p must be in (0, 1], got {}", self.top_p));
        }
        Ok(())
    }
}

/// One submitted request.
///
/// The id is assigned at creation and never changes, including across
/// queue persistence and redelivery. Field names on the wire are camelCase,
/// matching the persisted queue layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub payload: Payload,
    pub model_id: String,
    #[serde(default)]
    pub hint: RoutingHint,
    #[serde(rename = "telemetrySnapshot")]
    pub telemetry: TelemetrySnapshot,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub fn new(
        payload: Payload,
        model_id: impl Into<String>,
        hint: RoutingHint,
        telemetry: TelemetrySnapshot,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            model_id: model_id.into(),
            hint,
            telemetry,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_defaults() {
        let payload: Payload = serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert_eq!(payload.max_tokens, 200);
        assert!((payload.temperature - 0.85).abs() < f32::EPSILON);
        assert!((payload.top_p - 0.99).abs() < f32::EPSILON);
    }

    #[test]
    fn test_payload_validation() {
        assert!(Payload::new("Rene Descartes was").validate().is_ok());
        assert!(Payload::new("   ").validate().is_err());

        let mut p = Payload::new("x");
        p.max_tokens = 0;
        assert!(p.validate().is_err());

        let mut p = Payload::new("x");
        p.top_p = 0.0;
        assert!(p.validate().is_err());

        let mut p = Payload::new("x");
        p.temperature = 3.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_request_ids_unique() {
        let a = Request::new(
            Payload::new("a"),
            "rene",
            RoutingHint::Automatic,
            TelemetrySnapshot::default(),
        );
        let b = Request::new(
            Payload::new("a"),
            "rene",
            RoutingHint::Automatic,
            TelemetrySnapshot::default(),
        );
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }
}
