//! Emergency case record, intake step log and realtime monitoring logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::doctor::DoctorRef;
use super::patient::{PatientData, Severity};
use super::vitals::{VitalAlert, VitalSigns};
use crate::error::{NetcareError, Result};
use crate::telecom::capability::{CongestionLevel, GeoFix, Movement};
use crate::telecom::Source;
use crate::utils::RingBuffer;

pub const LOCATION_LOG_CAPACITY: usize = 20;
pub const NETWORK_LOG_CAPACITY: usize = 15;
pub const VITALS_LOG_CAPACITY: usize = 30;

// ===== Lifecycle =====

/// Case lifecycle. Only moves forward: initiated, active, closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Initiated,
    Active,
    Closed,
}

impl CaseStatus {
    pub fn can_advance_to(self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::Initiated, CaseStatus::Active) | (CaseStatus::Active, CaseStatus::Closed)
        )
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CaseStatus::Initiated => "initiated",
            CaseStatus::Active => "active",
            CaseStatus::Closed => "closed",
        };
        f.write_str(label)
    }
}

// ===== Intake steps =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    IdentityVerification,
    DeviceReachability,
    LocationRetrieval,
    NetworkQualityBoost,
    CongestionCheck,
    GeofenceSetup,
}

impl IntakeStep {
    /// Fixed execution order of the intake sequence.
    pub const SEQUENCE: [IntakeStep; 6] = [
        IntakeStep::IdentityVerification,
        IntakeStep::DeviceReachability,
        IntakeStep::LocationRetrieval,
        IntakeStep::NetworkQualityBoost,
        IntakeStep::CongestionCheck,
        IntakeStep::GeofenceSetup,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IntakeStep::IdentityVerification => "Identity Verification",
            IntakeStep::DeviceReachability => "Device Reachability",
            IntakeStep::LocationRetrieval => "Location Retrieval",
            IntakeStep::NetworkQualityBoost => "Network Quality Boost",
            IntakeStep::CongestionCheck => "Network Congestion Check",
            IntakeStep::GeofenceSetup => "Geofence Setup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Warning,
    Failed,
}

/// Capability-specific outcome recorded for one intake step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDetail {
    Identity {
        number_verified: bool,
        carrier: String,
        sim_swapped: bool,
        last_swap_days: u32,
    },
    Reachability {
        reachable: bool,
        network_type: String,
        signal_strength: i32,
    },
    Location {
        latitude: f64,
        longitude: f64,
        accuracy_m: u32,
        /// Network-based fix used because the device could not be located.
        approximate: bool,
    },
    QualityBoost {
        activated: bool,
        profile: Option<String>,
        bandwidth_mbps: Option<u32>,
        latency_ms: Option<u32>,
    },
    Congestion {
        level: CongestionLevel,
        network_health: u32,
    },
    Geofence {
        active: bool,
        fence_id: Option<String>,
        radius_m: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: IntakeStep,
    pub status: StepStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub detail: StepDetail,
}

// ===== Realtime logs =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: u32,
    pub movement: Movement,
    pub source: Source,
}

impl LocationUpdate {
    pub fn from_fix(fix: GeoFix, source: Source) -> Self {
        Self {
            timestamp: Utc::now(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_m: fix.accuracy,
            movement: fix.movement,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkQualitySample {
    pub timestamp: DateTime<Utc>,
    pub congestion_level: CongestionLevel,
    pub network_health: u32,
    pub active_users: u32,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub timestamp: DateTime<Utc>,
    pub vitals: VitalSigns,
}

/// Bounded histories written by the case monitor.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeLog {
    pub location_updates: RingBuffer<LocationUpdate>,
    pub network_quality: RingBuffer<NetworkQualitySample>,
    pub vital_history: RingBuffer<VitalReading>,
    pub last_update: DateTime<Utc>,
}

impl RealtimeLog {
    pub fn new() -> Self {
        Self {
            location_updates: RingBuffer::new(LOCATION_LOG_CAPACITY),
            network_quality: RingBuffer::new(NETWORK_LOG_CAPACITY),
            vital_history: RingBuffer::new(VITALS_LOG_CAPACITY),
            last_update: Utc::now(),
        }
    }

    pub fn record_location(&mut self, update: LocationUpdate) {
        self.last_update = update.timestamp;
        self.location_updates.push(update);
    }

    pub fn record_network(&mut self, sample: NetworkQualitySample) {
        self.last_update = sample.timestamp;
        self.network_quality.push(sample);
    }

    pub fn record_vitals(&mut self, reading: VitalReading) {
        self.last_update = reading.timestamp;
        self.vital_history.push(reading);
    }
}

impl Default for RealtimeLog {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Doctor actions =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub route: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "Utc::now")]
    pub prescribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    Required,
    NotRequired,
    ObservationRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub diagnosis: String,
    #[serde(default)]
    pub procedures: Vec<String>,
    pub admission: AdmissionDecision,
    pub priority: Severity,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

// ===== Case =====

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyCase {
    pub case_id: String,
    pub patient: PatientData,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: CaseStatus,
    pub steps: Vec<StepResult>,
    /// Client mode when intake ran.
    pub demo_mode: bool,
    pub assigned_doctor: Option<DoctorRef>,
    pub vital_signs: VitalSigns,
    pub treatment_plan: Option<TreatmentPlan>,
    pub medication_prescribed: Option<Prescription>,
    pub realtime: RealtimeLog,
}

impl EmergencyCase {
    pub fn new(
        case_id: String,
        patient: PatientData,
        vital_signs: VitalSigns,
        demo_mode: bool,
    ) -> Self {
        Self {
            case_id,
            patient,
            created_at: Utc::now(),
            closed_at: None,
            status: CaseStatus::Initiated,
            steps: Vec::with_capacity(IntakeStep::SEQUENCE.len()),
            demo_mode,
            assigned_doctor: None,
            vital_signs,
            treatment_plan: None,
            medication_prescribed: None,
            realtime: RealtimeLog::new(),
        }
    }

    /// Append the next intake step. Steps must arrive in sequence order.
    pub fn record_step(&mut self, result: StepResult) {
        let index = self.steps.len();
        assert_eq!(self.status, CaseStatus::Initiated, "intake step recorded after intake");
        assert!(
            IntakeStep::SEQUENCE.get(index) == Some(&result.step),
            "intake step {:?} out of order at position {}",
            result.step,
            index
        );
        self.steps.push(result);
    }

    pub fn intake_complete(&self) -> bool {
        self.steps.len() == IntakeStep::SEQUENCE.len()
    }

    pub fn activate(&mut self) -> Result<()> {
        if !self.intake_complete() {
            return Err(self.transition_error(CaseStatus::Active));
        }
        self.advance(CaseStatus::Active)
    }

    pub fn close(&mut self) -> Result<()> {
        self.advance(CaseStatus::Closed)?;
        self.closed_at = Some(Utc::now());
        Ok(())
    }

    fn advance(&mut self, next: CaseStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(self.transition_error(next));
        }
        self.status = next;
        Ok(())
    }

    fn transition_error(&self, to: CaseStatus) -> NetcareError {
        NetcareError::InvalidTransition {
            case_id: self.case_id.clone(),
            from: self.status,
            to,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CaseStatus::Active
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(NetcareError::CaseNotActive {
                case_id: self.case_id.clone(),
                status: self.status,
            })
        }
    }

    pub fn snapshot(&self, tail: usize) -> CaseSnapshot {
        CaseSnapshot {
            case_id: self.case_id.clone(),
            status: self.status,
            patient: self.patient.clone(),
            created_at: self.created_at,
            closed_at: self.closed_at,
            demo_mode: self.demo_mode,
            steps: self.steps.clone(),
            vital_signs: self.vital_signs,
            vital_alerts: self.vital_signs.alerts(),
            assigned_doctor: self.assigned_doctor.clone(),
            treatment_plan: self.treatment_plan.clone(),
            medication_prescribed: self.medication_prescribed.clone(),
            location_updates: self.realtime.location_updates.tail(tail),
            network_quality: self.realtime.network_quality.tail(tail),
            vital_history: self.realtime.vital_history.tail(tail),
            last_update: self.realtime.last_update,
        }
    }

    pub fn summary(&self) -> CaseSummary {
        CaseSummary {
            case_id: self.case_id.clone(),
            patient_name: self.patient.name.clone(),
            severity: self.patient.severity,
            status: self.status,
            created_at: self.created_at,
            assigned_doctor: self.assigned_doctor.as_ref().map(|d| d.name.clone()),
        }
    }

    pub fn metrics(&self) -> CaseMetrics {
        CaseMetrics {
            case_id: self.case_id.clone(),
            status: self.status,
            last_location: self.realtime.location_updates.latest().cloned(),
            last_network: self.realtime.network_quality.latest().cloned(),
            vital_signs: self.vital_signs,
            location_history_count: self.realtime.location_updates.len(),
            network_updates_count: self.realtime.network_quality.len(),
            last_update: self.realtime.last_update,
        }
    }
}

// ===== Read models =====

/// Point-in-time copy of a case for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct CaseSnapshot {
    pub case_id: String,
    pub status: CaseStatus,
    pub patient: PatientData,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub demo_mode: bool,
    pub steps: Vec<StepResult>,
    pub vital_signs: VitalSigns,
    pub vital_alerts: Vec<VitalAlert>,
    pub assigned_doctor: Option<DoctorRef>,
    pub treatment_plan: Option<TreatmentPlan>,
    pub medication_prescribed: Option<Prescription>,
    pub location_updates: Vec<LocationUpdate>,
    pub network_quality: Vec<NetworkQualitySample>,
    pub vital_history: Vec<VitalReading>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case_id: String,
    pub patient_name: String,
    pub severity: Severity,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub assigned_doctor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMetrics {
    pub case_id: String,
    pub status: CaseStatus,
    pub last_location: Option<LocationUpdate>,
    pub last_network: Option<NetworkQualitySample>,
    pub vital_signs: VitalSigns,
    pub location_history_count: usize,
    pub network_updates_count: usize,
    pub last_update: DateTime<Utc>,
}
