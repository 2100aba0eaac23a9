//! Synthetic capability responses for demo mode and failed live calls.

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

use super::capability::*;
use crate::utils::SimRng;

/// Reference point that simulated fixes are jittered around (lower Manhattan).
pub const REFERENCE_LATITUDE: f64 = 40.7128;
pub const REFERENCE_LONGITUDE: f64 = -74.0060;
/// Half-width of the coordinate jitter box, in degrees.
pub const LOCATION_JITTER_DEG: f64 = 0.005;

const CARRIERS: [&str; 4] = ["Verizon", "AT&T", "T-Mobile", "Vodafone"];
const NETWORK_TYPES: [&str; 3] = ["4G", "5G", "LTE"];
const DATA_CONNECTIONS: [DataConnection; 3] =
    [DataConnection::Active, DataConnection::Standby, DataConnection::Poor];
const MOVEMENTS: [Movement; 3] = [Movement::Stationary, Movement::MovingSlow, Movement::MovingFast];
const CONGESTION_LEVELS: [CongestionLevel; 3] =
    [CongestionLevel::Low, CongestionLevel::Medium, CongestionLevel::High];

/// Stateless apart from its random stream; each call is independent.
#[derive(Debug, Clone)]
pub struct SimulatedResponseGenerator {
    rng: SimRng,
}

impl SimulatedResponseGenerator {
    pub fn new(rng: SimRng) -> Self {
        Self { rng }
    }

    fn wrap<T>(&self, data: T) -> CapabilityResponse<T> {
        CapabilityResponse {
            source: Source::Simulated,
            response_time_ms: self.rng.with(|rng| rng.gen_range(50..=200)),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn number_verification(
        &self,
        _phone_number: &str,
    ) -> CapabilityResponse<NumberVerification> {
        let data = self.rng.with(|rng| NumberVerification {
            verified: true,
            carrier: pick(rng, &CARRIERS).to_string(),
            country: "US".to_string(),
            number_type: "MOBILE".to_string(),
            risk_score: rng.gen_range(1..=100),
        });
        self.wrap(data)
    }

    pub fn device_reachability(&self, _device_id: &str) -> CapabilityResponse<DeviceReachability> {
        let data = self.rng.with(|rng| DeviceReachability {
            reachable: rng.gen_bool(0.75),
            network_type: pick(rng, &NETWORK_TYPES).to_string(),
            signal_strength: rng.gen_range(-85..=-55),
            battery_level: rng.gen_range(20..=100),
            data_connection: *pick(rng, &DATA_CONNECTIONS),
        });
        self.wrap(data)
    }

    pub fn location(&self, _device_id: &str) -> CapabilityResponse<DeviceLocation> {
        let data = self.rng.with(|rng| DeviceLocation {
            location: Some(GeoFix {
                latitude: jitter(rng, REFERENCE_LATITUDE),
                longitude: jitter(rng, REFERENCE_LONGITUDE),
                accuracy: rng.gen_range(5..=50),
                movement: *pick(rng, &MOVEMENTS),
            }),
        });
        self.wrap(data)
    }

    pub fn quality_on_demand(
        &self,
        _device_id: &str,
        profile: &str,
        duration: u32,
    ) -> CapabilityResponse<QualityOnDemand> {
        let data = self.rng.with(|rng| QualityOnDemand {
            activated: true,
            profile: profile.to_string(),
            bandwidth: rng.gen_range(40..=60),
            latency: rng.gen_range(15..=25),
            duration,
            qos_level: "EMERGENCY".to_string(),
        });
        self.wrap(data)
    }

    pub fn congestion_insights(&self, _area_code: &str) -> CapabilityResponse<CongestionInsight> {
        let data = self.rng.with(|rng| CongestionInsight {
            congestion_level: *pick(rng, &CONGESTION_LEVELS),
            network_health_score: rng.gen_range(75..=98),
            recommendation: "Emergency traffic prioritized".to_string(),
            active_users: rng.gen_range(100..=1000),
        });
        self.wrap(data)
    }

    pub fn sim_swap(&self, _phone_number: &str) -> CapabilityResponse<SimSwap> {
        let data = self.rng.with(|rng| SimSwap {
            swapped: false,
            last_swap_days: rng.gen_range(30..=365),
            risk_level: "LOW".to_string(),
            confidence: rng.gen_range(85..=99),
        });
        self.wrap(data)
    }

    pub fn geofence(&self, _device_id: &str, radius: u32) -> CapabilityResponse<Geofence> {
        let data = self.rng.with(|rng| Geofence {
            fence_id: format!("fence_{}", rng.gen_range(1000..=9999)),
            status: FenceStatus::Active,
            radius,
            alerts_enabled: true,
        });
        self.wrap(data)
    }

    /// Network-based approximate fix used when the location capability misses.
    pub fn approximate_fix(&self) -> GeoFix {
        self.rng.with(|rng| GeoFix {
            latitude: jitter(rng, REFERENCE_LATITUDE),
            longitude: jitter(rng, REFERENCE_LONGITUDE),
            accuracy: 100,
            movement: Movement::Unknown,
        })
    }
}

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    // Only called with non-empty constant tables.
    items.choose(rng).unwrap_or(&items[0])
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, center: f64) -> f64 {
    center + rng.gen_range(-LOCATION_JITTER_DEG..LOCATION_JITTER_DEG)
}
