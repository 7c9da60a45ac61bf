//! Per-model capability and cost profiles.
//!
//! Profiles are static descriptors supplied by configuration. The router only
//! reads them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Feasibility and latency estimate for one model.
///
/// Missing fields take the default profile's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityProfile {
    /// Whether the model can run on the originating device
    pub local_capable: bool,
    /// Estimated on-device latency in milliseconds
    pub local_latency_ms: u64,
    /// Estimated server processing latency in milliseconds, excluding network
    pub server_latency_ms: u64,
}

impl CapabilityProfile {
    pub fn new(local_capable: bool, local_latency_ms: u64, server_latency_ms: u64) -> Self {
        Self {
            local_capable,
            local_latency_ms,
            server_latency_ms,
        }
    }

    /// Local estimate, or `None` if the model cannot run locally.
    pub fn local_estimate(&self) -> Option<u64> {
        self.local_capable.then_some(self.local_latency_ms)
    }
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self {
            local_capable: true,
            local_latency_ms: 100,
            server_latency_ms: 50,
        }
    }
}

/// A named profile as it appears in `[[models]]` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    #[serde(flatten)]
    pub profile: CapabilityProfile,
}

impl ModelProfile {
    pub fn new(id: &str, profile: CapabilityProfile) -> Self {
        Self {
            id: id.to_string(),
            profile,
        }
    }
}

/// Built-in model catalog used when configuration lists no models.
pub fn builtin_models() -> Vec<ModelProfile> {
    vec![
        ModelProfile::new("rene", CapabilityProfile::new(true, 100, 50)),
        ModelProfile::new("llamba-1b", CapabilityProfile::new(false, 100, 50)),
        ModelProfile::new("llamba-3b", CapabilityProfile::new(true, 250, 60)),
        ModelProfile::new("llamba-8b", CapabilityProfile::new(true, 600, 80)),
    ]
}

/// Profile resolved for a model id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProfile {
    pub id: String,
    /// False when the id is not in the catalog and the default profile was used
    pub known: bool,
    #[serde(flatten)]
    pub profile: CapabilityProfile,
}

/// Lookup table from model id to capability profile.
#[derive(Debug, Clone)]
pub struct CapabilityCatalog {
    models: HashMap<String, CapabilityProfile>,
    order: Vec<String>,
    default_profile: CapabilityProfile,
}

impl CapabilityCatalog {
    pub fn new(models: Vec<ModelProfile>, default_profile: CapabilityProfile) -> Self {
        let mut map = HashMap::with_capacity(models.len());
        let mut order = Vec::with_capacity(models.len());
        for m in models {
            if map.insert(m.id.clone(), m.profile).is_none() {
                order.push(m.id);
            }
        }
        Self {
            models: map,
            order,
            default_profile,
        }
    }

    /// Profile for a model id, falling back to the default profile.
    pub fn profile(&self, model_id: &str) -> &CapabilityProfile {
        self.models.get(model_id).unwrap_or(&self.default_profile)
    }

    pub fn resolve(&self, model_id: &str) -> ResolvedProfile {
        ResolvedProfile {
            id: model_id.to_string(),
            known: self.models.contains_key(model_id),
            profile: self.profile(model_id).clone(),
        }
    }

    /// All catalog entries in configuration order.
    pub fn list(&self) -> Vec<ResolvedProfile> {
        self.order.iter().map(|id| self.resolve(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::new(builtin_models(), CapabilityProfile::default())
    }
}
