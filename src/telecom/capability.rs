//! Typed request/response records for each remote network capability.
//!
//! Every capability has exactly one payload type, and both the live client
//! and the simulator produce it wrapped in [`CapabilityResponse`], so callers
//! never branch on where a response came from.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where a capability response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Live,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    NumberVerification,
    DeviceReachability,
    Location,
    QualityOnDemand,
    CongestionInsights,
    SimSwap,
    Geofencing,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::NumberVerification,
        Capability::DeviceReachability,
        Capability::Location,
        Capability::QualityOnDemand,
        Capability::CongestionInsights,
        Capability::SimSwap,
        Capability::Geofencing,
    ];

    /// Path segment under the provider base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            Capability::NumberVerification => "number-verification",
            Capability::DeviceReachability => "device-status",
            Capability::Location => "location",
            Capability::QualityOnDemand => "qod",
            Capability::CongestionInsights => "congestion",
            Capability::SimSwap => "sim-swap",
            Capability::Geofencing => "geofencing",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Payload type bound to one capability.
pub trait CapabilityPayload: Serialize + DeserializeOwned + Send + 'static {
    const CAPABILITY: Capability;
}

/// A capability result annotated with provenance and latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityResponse<T> {
    pub source: Source,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CapabilityResponse<T> {
    pub fn is_simulated(&self) -> bool {
        self.source == Source::Simulated
    }
}

// ===== Enumerations =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
}

impl CongestionLevel {
    pub fn is_high(self) -> bool {
        self == CongestionLevel::High
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CongestionLevel::Low => "LOW",
            CongestionLevel::Medium => "MEDIUM",
            CongestionLevel::High => "HIGH",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Movement {
    Stationary,
    MovingSlow,
    MovingFast,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataConnection {
    Active,
    Standby,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FenceStatus {
    Active,
    Pending,
    #[serde(other)]
    Inactive,
}

// ===== Responses =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberVerification {
    pub verified: bool,
    pub carrier: String,
    pub country: String,
    pub number_type: String,
    pub risk_score: u32,
}

impl CapabilityPayload for NumberVerification {
    const CAPABILITY: Capability = Capability::NumberVerification;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReachability {
    pub reachable: bool,
    pub network_type: String,
    /// dBm
    pub signal_strength: i32,
    pub battery_level: u8,
    pub data_connection: DataConnection,
}

impl CapabilityPayload for DeviceReachability {
    const CAPABILITY: Capability = Capability::DeviceReachability;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub accuracy: u32,
    #[serde(default)]
    pub movement: Movement,
}

/// `location` is absent when the network could not place the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub location: Option<GeoFix>,
}

impl CapabilityPayload for DeviceLocation {
    const CAPABILITY: Capability = Capability::Location;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityOnDemand {
    pub activated: bool,
    pub profile: String,
    /// Mbps
    pub bandwidth: u32,
    /// ms
    pub latency: u32,
    pub duration: u32,
    pub qos_level: String,
}

impl CapabilityPayload for QualityOnDemand {
    const CAPABILITY: Capability = Capability::QualityOnDemand;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionInsight {
    pub congestion_level: CongestionLevel,
    pub network_health_score: u32,
    pub recommendation: String,
    pub active_users: u32,
}

impl CapabilityPayload for CongestionInsight {
    const CAPABILITY: Capability = Capability::CongestionInsights;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSwap {
    pub swapped: bool,
    pub last_swap_days: u32,
    pub risk_level: String,
    pub confidence: u32,
}

impl CapabilityPayload for SimSwap {
    const CAPABILITY: Capability = Capability::SimSwap;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub fence_id: String,
    pub status: FenceStatus,
    /// Meters.
    pub radius: u32,
    pub alerts_enabled: bool,
}

impl CapabilityPayload for Geofence {
    const CAPABILITY: Capability = Capability::Geofencing;
}

// ===== Request bodies =====

pub const EMERGENCY_QOS_PROFILE: &str = "EMERGENCY_HIGH_QUALITY";
pub const EMERGENCY_QOS_DURATION_SECS: u32 = 3600;
pub const DEFAULT_FENCE_RADIUS_M: u32 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityOnDemandRequest<'a> {
    pub device_id: &'a str,
    pub profile: &'a str,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRequest<'a> {
    pub device_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: u32,
    pub alert_type: &'a str,
}
