//! Client telemetry captured at submission time.
//!
//! A [`TelemetrySnapshot`] is attached to every request when it is created and
//! never mutated afterwards. The routing policy reads it; the queue persists it
//! verbatim so that a redelivery hours later still sees what the client saw.

use serde::{Deserialize, Serialize};

/// Network reachability as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Reachable,
    Unreachable,
}

impl Connectivity {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Connectivity::Reachable
        } else {
            Connectivity::Unreachable
        }
    }

    pub fn is_reachable(self) -> bool {
        matches!(self, Connectivity::Reachable)
    }
}

/// Coarse device load as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceLoad {
    Low,
    Moderate,
    High,
}

/// Immutable telemetry record for one request.
///
/// Every field is optional on the wire. Defaults:
/// - `rtt_ms`: 0 when absent
/// - `connectivity`: derived from `effective_type` (`"offline"` is unreachable),
///   otherwise reachable
/// - `battery_percent`, `memory_gb`, `device_load`, `effective_type`: unknown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Estimated network round trip in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<u64>,
    /// Explicit reachability; takes precedence over `effective_type`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<Connectivity>,
    /// Battery level, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<f32>,
    /// Device memory in gigabytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_load: Option<DeviceLoad>,
    /// Network Information API effective type (`4g`, `3g`, `2g`, `slow-2g`, `offline`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
}

impl TelemetrySnapshot {
    /// Snapshot with only connectivity and round trip set.
    pub fn new(connectivity: Connectivity, rtt_ms: u64) -> Self {
        Self {
            rtt_ms: Some(rtt_ms),
            connectivity: Some(connectivity),
            ..Default::default()
        }
    }

    pub fn rtt(&self) -> u64 {
        self.rtt_ms.unwrap_or(0)
    }

    pub fn connectivity(&self) -> Connectivity {
        if let Some(c) = self.connectivity {
            return c;
        }
        match self.effective_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("offline") => Connectivity::Unreachable,
            _ => Connectivity::Reachable,
        }
    }

    /// Copy of this snapshot with connectivity replaced.
    ///
    /// Used when a queued request is re-routed: the original telemetry is kept
    /// but reachability reflects the present.
    pub fn with_connectivity(&self, connectivity: Connectivity) -> Self {
        Self {
            connectivity: Some(connectivity),
            ..self.clone()
        }
    }

    pub fn network_condition(&self) -> NetworkCondition {
        if self.connectivity == Some(Connectivity::Unreachable) {
            return NetworkCondition::Offline;
        }
        NetworkCondition::from_effective_type(self.effective_type.as_deref())
    }

    pub fn device_state(&self) -> DeviceResourceState {
        DeviceResourceState::classify(self.battery_percent, self.memory_gb)
    }
}

/// Network quality bucket derived from the client's effective connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkCondition {
    Good,
    Fair,
    Poor,
    Offline,
    Unknown,
}

impl NetworkCondition {
    pub fn from_effective_type(effective_type: Option<&str>) -> Self {
        match effective_type.map(str::to_ascii_lowercase).as_deref() {
            None | Some("unknown") | Some("") => NetworkCondition::Unknown,
            Some("offline") => NetworkCondition::Offline,
            Some("slow-2g") | Some("2g") => NetworkCondition::Poor,
            Some("3g") => NetworkCondition::Fair,
            Some(_) => NetworkCondition::Good,
        }
    }
}

/// Device resource bucket derived from battery and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceResourceState {
    Optimal,
    Adequate,
    Constrained,
    Critical,
    Unknown,
}

impl DeviceResourceState {
    pub fn classify(battery_percent: Option<f32>, memory_gb: Option<f32>) -> Self {
        if battery_percent.is_none() && memory_gb.is_none() {
            return DeviceResourceState::Unknown;
        }

        if battery_percent.is_some_and(|b| b < 15.0) || memory_gb.is_some_and(|m| m < 0.5) {
            return DeviceResourceState::Critical;
        }

        if battery_percent.is_some_and(|b| b < 30.0) || memory_gb.is_some_and(|m| m < 1.0) {
            return DeviceResourceState::Constrained;
        }

        let battery_ok = battery_percent.map_or(true, |b| b > 70.0);
        let memory_ok = memory_gb.map_or(true, |m| m >= 4.0);
        if battery_ok && memory_ok {
            DeviceResourceState::Optimal
        } else {
            DeviceResourceState::Adequate
        }
    }
}
