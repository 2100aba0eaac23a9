use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telecom::capability::CongestionLevel;

/// Whether the capability client is talking to the real provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    Live,
    Demo,
}

impl std::fmt::Display for ApiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiMode::Live => f.write_str("live"),
            ApiMode::Demo => f.write_str("demo"),
        }
    }
}

/// One tick of process-wide network telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetricsSample {
    pub timestamp: DateTime<Utc>,
    /// Mbps
    pub bandwidth: u32,
    /// ms
    pub latency: u32,
    /// Percent.
    pub packet_loss: f64,
    pub congestion: CongestionLevel,
    pub connected_devices: u32,
    pub network_health: u32,
    pub active_emergencies: usize,
    /// ms
    pub api_response_time: u64,
}

/// Document produced by the metrics export action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsExport {
    pub timestamp: DateTime<Utc>,
    pub network_metrics: Vec<NetworkMetricsSample>,
    pub active_cases: usize,
    pub api_status: ApiMode,
}
