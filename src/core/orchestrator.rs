//! Emergency case orchestration.
//!
//! Runs the six-step intake against the capability client, assigns a doctor
//! and starts the case monitor. Closing reverses the assignment and stops the
//! monitor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::monitor::{CaseMonitor, MonitorHandle};
use crate::config::MonitoringConfig;
use crate::db::{CaseStore, DoctorRegistry};
use crate::error::{NetcareError, Result};
use crate::models::{
    DoctorRef, EmergencyCase, IntakeStep, LocationUpdate, PatientData, StepDetail, StepResult,
    StepStatus, VitalSigns,
};
use crate::telecom::capability::{
    FenceStatus, GeoFix, DEFAULT_FENCE_RADIUS_M, EMERGENCY_QOS_PROFILE,
};
use crate::telecom::{RemoteCapabilityClient, Source};
use crate::utils::SimRng;

pub struct EmergencyOrchestrator {
    client: Arc<RemoteCapabilityClient>,
    store: Arc<CaseStore>,
    doctors: Arc<DoctorRegistry>,
    rng: SimRng,
    monitoring: MonitoringConfig,
    monitors: DashMap<String, MonitorHandle>,
    shutdown: CancellationToken,
}

impl EmergencyOrchestrator {
    pub fn new(
        client: Arc<RemoteCapabilityClient>,
        store: Arc<CaseStore>,
        doctors: Arc<DoctorRegistry>,
        rng: SimRng,
        monitoring: MonitoringConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            store,
            doctors,
            rng,
            monitoring,
            monitors: DashMap::new(),
            shutdown,
        }
    }

    /// Open a case: intake, activation, doctor assignment, monitoring.
    ///
    /// Only invalid patient data fails this call. Provider trouble degrades
    /// individual steps to warnings and simulated data.
    #[instrument(skip_all, fields(patient = %patient.name))]
    pub async fn initiate(&self, patient: PatientData) -> Result<EmergencyCase> {
        let patient = patient.normalized()?;
        let case_id = self.store.allocate_id()?;
        let vitals = self.rng.with(|rng| VitalSigns::from_symptoms(&patient.symptoms, rng));
        let mut case = EmergencyCase::new(case_id.clone(), patient, vitals, self.client.is_demo());
        info!(%case_id, demo_mode = case.demo_mode, "emergency case initiated");

        self.run_intake(&mut case).await;
        case.activate()?;

        if let Some(doctor) = self.doctors.assign(&case_id, &self.rng) {
            case.assigned_doctor = Some(DoctorRef::from(&doctor));
        }

        if let Err(e) = self.store.insert(case.clone()) {
            self.doctors.release(&case_id);
            return Err(e);
        }

        self.start_monitor(&case_id);
        let doctor = case.assigned_doctor.as_ref().map(|d| d.name.as_str());
        info!(%case_id, ?doctor, "emergency case active");
        Ok(case)
    }

    /// Close an active case, free its doctor and stop its monitor.
    #[instrument(skip(self))]
    pub fn close(&self, case_id: &str) -> Result<EmergencyCase> {
        let closed = self.store.update_case(case_id, |case| {
            case.close()?;
            Ok::<_, NetcareError>(case.clone())
        })??;

        // Only the call that moved the case to closed gets here, so the release runs once.
        self.doctors.release(case_id);
        self.stop_monitor(case_id);
        info!("emergency case closed");
        Ok(closed)
    }

    pub fn monitored_cases(&self) -> usize {
        self.monitors.len()
    }

    /// Cancel every case monitor and wait for the tasks to exit.
    pub async fn stop_all(&self) {
        let case_ids: Vec<String> = self.monitors.iter().map(|entry| entry.key().clone()).collect();
        for case_id in case_ids {
            if let Some((_, handle)) = self.monitors.remove(&case_id) {
                handle.stop().await;
            }
        }
        info!("case monitors stopped");
    }

    fn start_monitor(&self, case_id: &str) {
        let monitor = CaseMonitor::new(
            case_id,
            self.store.clone(),
            self.client.clone(),
            self.rng.clone(),
            self.monitoring.case_tick(),
        );
        let handle = monitor.spawn(self.shutdown.child_token());
        self.monitors.insert(case_id.to_string(), handle);
    }

    fn stop_monitor(&self, case_id: &str) {
        match self.monitors.remove(case_id) {
            Some((_, handle)) => handle.cancel(),
            None => debug!(case_id, "no monitor registered"),
        }
    }

    // ===== Intake =====

    async fn run_intake(&self, case: &mut EmergencyCase) {
        let pause = self.monitoring.intake_step_pause();
        let phone = case.patient.phone_number.clone();
        let device = case.patient.device_id.clone();
        let area = case.patient.area_code.clone();

        let identity = self.verify_identity(&phone).await;
        self.record(case, identity, pause).await;

        let reachability = self.check_reachability(&device).await;
        self.record(case, reachability, pause).await;

        let (location, fix, fix_source) = self.locate(&device).await;
        case.realtime.record_location(LocationUpdate::from_fix(fix, fix_source));
        self.record(case, location, pause).await;

        let boost = self.boost_quality(&device).await;
        self.record(case, boost, pause).await;

        let congestion = self.check_congestion(&area).await;
        self.record(case, congestion, pause).await;

        let geofence = self.setup_geofence(&device, &fix).await;
        self.record(case, geofence, Duration::ZERO).await;
    }

    async fn record(&self, case: &mut EmergencyCase, result: StepResult, pause: Duration) {
        match result.status {
            StepStatus::Success => {
                info!(case_id = %case.case_id, step = result.step.label(), "{}", result.message)
            }
            _ => warn!(
                case_id = %case.case_id,
                step = result.step.label(),
                status = ?result.status,
                "{}",
                result.message
            ),
        }
        case.record_step(result);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    async fn verify_identity(&self, phone: &str) -> StepResult {
        let number = self.client.number_verification(phone).await;
        let swap = self.client.sim_swap_check(phone).await;
        let source = combine(number.source, swap.source);
        let verified = number.data.verified;
        let swapped = swap.data.swapped;
        let (status, message) = match (verified, swapped) {
            (true, false) => (
                StepStatus::Success,
                format!("Identity verified successfully ({})", number.data.carrier),
            ),
            (true, true) => (
                StepStatus::Failed,
                "Identity verification failed - recent SIM swap detected".to_string(),
            ),
            (false, _) => (StepStatus::Failed, "Identity verification failed".to_string()),
        };

        step(
            IntakeStep::IdentityVerification,
            status,
            message,
            source,
            StepDetail::Identity {
                number_verified: verified,
                carrier: number.data.carrier,
                sim_swapped: swapped,
                last_swap_days: swap.data.last_swap_days,
            },
        )
    }

    async fn check_reachability(&self, device: &str) -> StepResult {
        let response = self.client.device_reachability(device).await;
        let data = response.data;
        let (status, message) = if data.reachable {
            (
                StepStatus::Success,
                format!(
                    "Device reachable via {} ({} dBm)",
                    data.network_type, data.signal_strength
                ),
            )
        } else {
            (StepStatus::Warning, "Device connectivity issues detected".to_string())
        };

        step(
            IntakeStep::DeviceReachability,
            status,
            message,
            response.source,
            StepDetail::Reachability {
                reachable: data.reachable,
                network_type: data.network_type,
                signal_strength: data.signal_strength,
            },
        )
    }

    /// Locate the device, falling back to a network-based approximate fix.
    async fn locate(&self, device: &str) -> (StepResult, GeoFix, Source) {
        let response = self.client.location(device).await;
        let (fix, source, approximate, status, message) = match response.data.location {
            Some(fix) => {
                let message = format!("Location acquired (accuracy {}m)", fix.accuracy);
                (fix, response.source, false, StepStatus::Success, message)
            }
            None => (
                self.client.simulator().approximate_fix(),
                Source::Simulated,
                true,
                StepStatus::Warning,
                "Location retrieval limited - using network-based positioning".to_string(),
            ),
        };

        let result = step(
            IntakeStep::LocationRetrieval,
            status,
            message,
            source,
            StepDetail::Location {
                latitude: fix.latitude,
                longitude: fix.longitude,
                accuracy_m: fix.accuracy,
                approximate,
            },
        );
        (result, fix, source)
    }

    async fn boost_quality(&self, device: &str) -> StepResult {
        let response = self.client.quality_on_demand(device).await;
        let data = response.data;
        let detail = if data.activated {
            StepDetail::QualityBoost {
                activated: true,
                profile: Some(data.profile),
                bandwidth_mbps: Some(data.bandwidth),
                latency_ms: Some(data.latency),
            }
        } else {
            StepDetail::QualityBoost {
                activated: false,
                profile: None,
                bandwidth_mbps: None,
                latency_ms: None,
            }
        };
        let (status, message) = if data.activated {
            (
                StepStatus::Success,
                format!("Network enhanced: {} Mbps at {} ms latency", data.bandwidth, data.latency),
            )
        } else {
            (
                StepStatus::Warning,
                "Standard network quality - sufficient for consultation".to_string(),
            )
        };
        debug!(
            profile = EMERGENCY_QOS_PROFILE,
            activated = data.activated,
            "quality boost requested"
        );

        step(IntakeStep::NetworkQualityBoost, status, message, response.source, detail)
    }

    async fn check_congestion(&self, area: &str) -> StepResult {
        let response = self.client.congestion_insights(area).await;
        let level = response.data.congestion_level;
        let (status, message) = if level.is_high() {
            (
                StepStatus::Warning,
                "High congestion detected - emergency traffic prioritized".to_string(),
            )
        } else {
            (StepStatus::Success, format!("Network conditions optimal ({})", level))
        };

        step(
            IntakeStep::CongestionCheck,
            status,
            message,
            response.source,
            StepDetail::Congestion {
                level,
                network_health: response.data.network_health_score,
            },
        )
    }

    async fn setup_geofence(&self, device: &str, fix: &GeoFix) -> StepResult {
        let response = self
            .client
            .create_geofence(device, fix.latitude, fix.longitude, DEFAULT_FENCE_RADIUS_M)
            .await;
        let data = response.data;
        let active = data.status == FenceStatus::Active;
        let (status, message, detail) = if active {
            (
                StepStatus::Success,
                format!("Geofence active - {}m radius", data.radius),
                StepDetail::Geofence {
                    active: true,
                    fence_id: Some(data.fence_id),
                    radius_m: Some(data.radius),
                },
            )
        } else {
            (
                StepStatus::Warning,
                "Geofence monitoring limited".to_string(),
                StepDetail::Geofence {
                    active: false,
                    fence_id: None,
                    radius_m: None,
                },
            )
        };

        step(IntakeStep::GeofenceSetup, status, message, response.source, detail)
    }
}

fn step(
    step: IntakeStep,
    status: StepStatus,
    message: String,
    source: Source,
    detail: StepDetail,
) -> StepResult {
    StepResult {
        step,
        status,
        message,
        timestamp: Utc::now(),
        source,
        detail,
    }
}

/// A step built from several calls is live only if every call was.
fn combine(a: Source, b: Source) -> Source {
    if a == Source::Live && b == Source::Live {
        Source::Live
    } else {
        Source::Simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DoctorRoster, TelecomConfig};
    use crate::models::{CaseStatus, Severity};

    fn orchestrator(roster: &DoctorRoster) -> EmergencyOrchestrator {
        let client =
            RemoteCapabilityClient::demo(&TelecomConfig::default(), SimRng::seeded(11)).unwrap();
        EmergencyOrchestrator::new(
            Arc::new(client),
            Arc::new(CaseStore::new()),
            Arc::new(DoctorRegistry::from_roster(roster)),
            SimRng::seeded(12),
            MonitoringConfig::default(),
            CancellationToken::new(),
        )
    }

    fn patient(name: &str) -> PatientData {
        PatientData {
            name: name.into(),
            phone_number: "+1234567890".into(),
            device_id: "d1".into(),
            area_code: "NYC".into(),
            age: 45,
            symptoms: "chest pain, difficulty breathing".into(),
            severity: Severity::High,
        }
    }

    #[tokio::test]
    async fn intake_runs_every_step_in_order() {
        let orchestrator = orchestrator(&DoctorRoster::default());
        let case = orchestrator.initiate(patient("John Doe")).await.unwrap();

        assert_eq!(case.status, CaseStatus::Active);
        assert!(case.demo_mode);
        let steps: Vec<IntakeStep> = case.steps.iter().map(|s| s.step).collect();
        assert_eq!(steps, IntakeStep::SEQUENCE);
        assert!(case.steps.iter().all(|s| s.source == Source::Simulated));
        assert_eq!(case.realtime.location_updates.len(), 1);
        assert!(case.assigned_doctor.is_some());
        assert_eq!(orchestrator.monitored_cases(), 1);
    }

    #[tokio::test]
    async fn invalid_patient_creates_nothing() {
        let orchestrator = orchestrator(&DoctorRoster::default());
        let mut bad = patient("   ");
        bad.age = 0;

        let err = orchestrator.initiate(bad).await.unwrap_err();
        assert!(matches!(err, NetcareError::InvalidPatient(_)));
        assert!(orchestrator.store.is_empty());
        assert_eq!(orchestrator.doctors.available_count(), 3);
    }

    #[tokio::test]
    async fn case_without_free_doctor_stays_active() {
        let orchestrator = orchestrator(&DoctorRoster(Vec::new()));
        let case = orchestrator.initiate(patient("Ada")).await.unwrap();
        assert_eq!(case.status, CaseStatus::Active);
        assert!(case.assigned_doctor.is_none());
    }

    #[tokio::test]
    async fn close_releases_once() {
        let orchestrator = orchestrator(&DoctorRoster::default());
        let case = orchestrator.initiate(patient("John Doe")).await.unwrap();
        assert_eq!(orchestrator.doctors.available_count(), 2);

        let closed = orchestrator.close(&case.case_id).unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(orchestrator.doctors.available_count(), 3);
        assert_eq!(orchestrator.monitored_cases(), 0);

        let again = orchestrator.close(&case.case_id).unwrap_err();
        assert!(matches!(again, NetcareError::InvalidTransition { .. }));
        assert_eq!(orchestrator.doctors.available_count(), 3);
    }

    #[tokio::test]
    async fn stop_all_joins_every_monitor() {
        let orchestrator = orchestrator(&DoctorRoster::default());
        for name in ["Ann", "Ben"] {
            orchestrator.initiate(patient(name)).await.unwrap();
        }
        assert_eq!(orchestrator.monitored_cases(), 2);

        orchestrator.stop_all().await;
        assert_eq!(orchestrator.monitored_cases(), 0);
    }

    #[tokio::test]
    async fn unknown_case_cannot_close() {
        let orchestrator = orchestrator(&DoctorRoster::default());
        assert!(matches!(
            orchestrator.close("nope"),
            Err(NetcareError::CaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_intakes_get_distinct_doctors() {
        let orchestrator = Arc::new(orchestrator(&DoctorRoster::default()));
        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                let patient = patient(&format!("p{}", i));
                tokio::spawn(async move { orchestrator.initiate(patient).await })
            })
            .collect();

        let mut assigned = Vec::new();
        for task in tasks {
            let case = task.await.unwrap().unwrap();
            if let Some(doctor) = case.assigned_doctor {
                assigned.push(doctor.id);
            }
        }
        assigned.sort_unstable();
        assert_eq!(assigned, vec![1, 2, 3]);
        assert_eq!(orchestrator.doctors.available_count(), 0);
    }

    #[test]
    fn mixed_sources_count_as_simulated() {
        assert_eq!(combine(Source::Live, Source::Live), Source::Live);
        assert_eq!(combine(Source::Live, Source::Simulated), Source::Simulated);
    }
}
