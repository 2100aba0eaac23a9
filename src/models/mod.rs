//! Data model for emergency cases, vitals, doctors and network telemetry.

pub mod case;
pub mod doctor;
pub mod metrics;
pub mod patient;
pub mod vitals;

pub use case::{
    AdmissionDecision, CaseMetrics, CaseSnapshot, CaseStatus, CaseSummary, EmergencyCase,
    IntakeStep, LocationUpdate, NetworkQualitySample, Prescription, RealtimeLog, StepDetail,
    StepResult, StepStatus, TreatmentPlan, VitalReading,
};
pub use doctor::{Doctor, DoctorId, DoctorRef};
pub use metrics::{ApiMode, MetricsExport, NetworkMetricsSample};
pub use patient::{PatientData, Severity};
pub use vitals::{BloodPressure, VitalAlert, VitalSigns};
