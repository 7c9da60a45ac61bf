//! Configuration module for Tether
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`TETHER_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use tether::config::TetherConfig;
//!
//! // Load defaults
//! let config = TetherConfig::default();
//! assert_eq!(config.server.port, 8080);
//!
//! // Parse from TOML
//! let toml = r#"
//! [dispatch]
//! attempt_timeout_ms = 5000
//! "#;
//! let config: TetherConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.dispatch.attempt_timeout_ms, 5000);
//! ```

pub mod connectivity;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod queue;
pub mod server;

pub use connectivity::ConnectivityConfig;
pub use dispatch::DispatchConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use queue::{QueueBackendKind, QueueConfig};
pub use server::ServerConfig;

use crate::capability::{builtin_models, CapabilityCatalog, CapabilityProfile, ModelProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the Tether server.
///
/// An empty `models` list means the built-in catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TetherConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
    pub queue: QueueConfig,
    pub connectivity: ConnectivityConfig,
    /// Capability profiles by model id
    pub models: Vec<ModelProfile>,
    /// Profile used for model ids not listed in `models`
    pub default_model: CapabilityProfile,
}

impl TetherConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports TETHER_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("TETHER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("TETHER_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("TETHER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TETHER_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(path) = std::env::var("TETHER_QUEUE_PATH") {
            self.queue.path = path.into();
        }

        if let Ok(timeout) = std::env::var("TETHER_ATTEMPT_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.dispatch.attempt_timeout_ms = t;
            }
        }
        if let Ok(endpoint) = std::env::var("TETHER_SERVER_ENDPOINT") {
            self.dispatch.server_endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("TETHER_LOCAL_ENDPOINT") {
            self.dispatch.local_endpoint = endpoint;
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "port must be non-zero"));
        }

        if self.dispatch.attempt_timeout_ms == 0 {
            return Err(invalid(
                "dispatch.attempt_timeout_ms",
                "timeout must be non-zero",
            ));
        }
        if self.dispatch.local_endpoint.trim().is_empty() {
            return Err(invalid("dispatch.local_endpoint", "URL cannot be empty"));
        }
        if self.dispatch.server_endpoint.trim().is_empty() {
            return Err(invalid("dispatch.server_endpoint", "URL cannot be empty"));
        }

        if self.queue.max_entries == Some(0) {
            return Err(invalid("queue.max_entries", "must be at least 1 when set"));
        }
        if self.queue.max_attempts == Some(0) {
            return Err(invalid("queue.max_attempts", "must be at least 1 when set"));
        }

        let mut seen = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            if model.id.trim().is_empty() {
                return Err(invalid(&format!("models[{}].id", i), "id cannot be empty"));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(invalid(
                    &format!("models[{}].id", i),
                    &format!("duplicate model id '{}'", model.id),
                ));
            }
        }

        Ok(())
    }

    /// Capability catalog described by this configuration.
    pub fn catalog(&self) -> CapabilityCatalog {
        let models = if self.models.is_empty() {
            builtin_models()
        } else {
            self.models.clone()
        };
        CapabilityCatalog::new(models, self.default_model.clone())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_tether_config_defaults() {
        let config = TetherConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dispatch.attempt_timeout_ms, 30_000);
        assert!(config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [server]
        port = 9000
        "#;

        let config: TetherConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0"); // Default
    }

    #[test]
    fn test_config_parse_full_toml() {
        let toml = include_str!("../../tether.example.toml");
        let config: TetherConfig = toml::from_str(toml).unwrap();
        assert!(config.server.port > 0);
        assert!(!config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_models_array() {
        let toml = r#"
        [[models]]
        id = "tiny"
        local_capable = true
        local_latency_ms = 40
        server_latency_ms = 30

        [[models]]
        id = "huge"
        local_capable = false

        [default_model]
        local_capable = false
        "#;

        let config: TetherConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[1].profile.server_latency_ms, 50);

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.profile("unlisted").local_capable);
    }

    #[test]
    fn test_empty_models_uses_builtin_catalog() {
        let catalog = TetherConfig::default().catalog();
        assert!(catalog.resolve("rene").known);
        assert!(!catalog.profile("llamba-1b").local_capable);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8181").unwrap();

        let config = TetherConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.server.port, 8181);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = TetherConfig::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server\nport = ").unwrap();

        let result = TetherConfig::load(Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_env_override_port() {
        std::env::set_var("TETHER_PORT", "9999");
        let config = TetherConfig::default().with_env_overrides();
        std::env::remove_var("TETHER_PORT");

        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_config_env_override_attempt_timeout() {
        std::env::set_var("TETHER_ATTEMPT_TIMEOUT_MS", "1234");
        let config = TetherConfig::default().with_env_overrides();
        std::env::remove_var("TETHER_ATTEMPT_TIMEOUT_MS");

        assert_eq!(config.dispatch.attempt_timeout_ms, 1234);
    }

    #[test]
    fn test_config_env_invalid_value_ignored() {
        std::env::set_var("TETHER_LOG_FORMAT", "xml");
        let config = TetherConfig::default().with_env_overrides();
        std::env::remove_var("TETHER_LOG_FORMAT");

        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TetherConfig::default();
        config.dispatch.attempt_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "dispatch.attempt_timeout_ms"
        ));

        let mut config = TetherConfig::default();
        config.dispatch.server_endpoint = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = TetherConfig::default();
        config.queue.max_attempts = Some(0);
        assert!(config.validate().is_err());

        let mut config = TetherConfig::default();
        config.queue.max_entries = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_model_ids() {
        let mut config = TetherConfig::default();
        config.models = vec![
            ModelProfile::new("rene", CapabilityProfile::default()),
            ModelProfile::new("rene", CapabilityProfile::default()),
        ];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "models[1].id"
        ));

        config.models = vec![ModelProfile::new("", CapabilityProfile::default())];
        assert!(config.validate().is_err());
    }
}
