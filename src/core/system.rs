//! Presentation-facing facade over the engine.
//!
//! Owns the stores, the capability client, the orchestrator and the metrics
//! collector, and holds the root cancellation token every background task
//! hangs off.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::collector::NetworkMetricsCollector;
use super::monitor;
use super::orchestrator::EmergencyOrchestrator;
use crate::config::Config;
use crate::db::{CaseStore, Database, DoctorRegistry};
use crate::error::{NetcareError, Result};
use crate::models::{
    ApiMode, CaseMetrics, CaseSnapshot, CaseStatus, CaseSummary, Doctor, EmergencyCase,
    MetricsExport, NetworkMetricsSample, PatientData, Prescription, TreatmentPlan, VitalSigns,
};
use crate::telecom::{CapabilityHealth, RemoteCapabilityClient};
use crate::utils::SimRng;

/// Client mode plus per-capability health, for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub mode: ApiMode,
    pub last_response_time_ms: Option<u64>,
    pub capabilities: Vec<CapabilityHealth>,
}

pub struct NetCareSystem {
    config: Config,
    cases: Arc<CaseStore>,
    doctors: Arc<DoctorRegistry>,
    client: Arc<RemoteCapabilityClient>,
    orchestrator: EmergencyOrchestrator,
    collector: Arc<NetworkMetricsCollector>,
    collector_task: JoinHandle<()>,
    rng: SimRng,
    shutdown: CancellationToken,
}

impl NetCareSystem {
    /// Probe the configured provider and start the metrics collector.
    pub async fn start(config: Config) -> Result<Self> {
        let rng = SimRng::from_seed_option(config.simulation.seed);
        let client = RemoteCapabilityClient::connect(&config.telecom, rng.clone()).await?;
        Ok(Self::with_client(config, client, rng))
    }

    /// Assemble the engine around an existing client. Must run inside a Tokio runtime.
    pub fn with_client(config: Config, client: RemoteCapabilityClient, rng: SimRng) -> Self {
        let db = Database::in_memory(&config.doctors);
        let cases = db.cases();
        let doctors = db.doctors();
        let client = Arc::new(client);
        let shutdown = CancellationToken::new();

        let orchestrator = EmergencyOrchestrator::new(
            client.clone(),
            cases.clone(),
            doctors.clone(),
            rng.clone(),
            config.monitoring.clone(),
            shutdown.clone(),
        );

        let collector = Arc::new(NetworkMetricsCollector::new(
            cases.clone(),
            client.clone(),
            rng.clone(),
        ));
        let collector_task = collector
            .clone()
            .spawn(config.monitoring.collector_tick(), shutdown.child_token());

        info!(mode = %client.mode(), doctors = doctors.doctors().len(), "netcare engine started");

        Self {
            config,
            cases,
            doctors,
            client,
            orchestrator,
            collector,
            collector_task,
            rng,
            shutdown,
        }
    }

    // ===== Cases =====

    pub async fn create_case(&self, patient: PatientData) -> Result<CaseSnapshot> {
        let case = self.orchestrator.initiate(patient).await?;
        Ok(case.snapshot(self.config.monitoring.snapshot_tail))
    }

    pub fn get_case(&self, case_id: &str) -> Result<CaseSnapshot> {
        self.cases.snapshot(case_id, self.config.monitoring.snapshot_tail)
    }

    pub fn get_case_metrics(&self, case_id: &str) -> Result<CaseMetrics> {
        self.cases.with_case(case_id, |case| case.metrics())
    }

    pub fn list_cases(&self) -> Vec<CaseSummary> {
        self.cases.summaries()
    }

    pub fn active_case_count(&self) -> usize {
        self.cases.count_by_status(CaseStatus::Active)
    }

    #[instrument(skip(self))]
    pub fn refresh_vitals(&self, case_id: &str) -> Result<VitalSigns> {
        monitor::refresh_vitals(&self.cases, case_id, &self.rng)
    }

    pub fn close_case(&self, case_id: &str) -> Result<CaseSnapshot> {
        let case = self.orchestrator.close(case_id)?;
        Ok(case.snapshot(self.config.monitoring.snapshot_tail))
    }

    #[instrument(skip(self, prescription), fields(medication = %prescription.medication))]
    pub fn prescribe(&self, case_id: &str, prescription: Prescription) -> Result<CaseSnapshot> {
        self.update_active(case_id, |case| case.medication_prescribed = Some(prescription))
    }

    #[instrument(skip(self, plan), fields(diagnosis = %plan.diagnosis))]
    pub fn set_treatment_plan(&self, case_id: &str, plan: TreatmentPlan) -> Result<CaseSnapshot> {
        self.update_active(case_id, |case| case.treatment_plan = Some(plan))
    }

    fn update_active(
        &self,
        case_id: &str,
        apply: impl FnOnce(&mut EmergencyCase),
    ) -> Result<CaseSnapshot> {
        let tail = self.config.monitoring.snapshot_tail;
        self.cases.update_case(case_id, |case| {
            case.ensure_active()?;
            apply(case);
            info!(case_id, "case updated by attending doctor");
            Ok::<_, NetcareError>(case.snapshot(tail))
        })?
    }

    // ===== Doctors =====

    pub fn doctors(&self) -> Vec<Doctor> {
        self.doctors.doctors()
    }

    // ===== Network =====

    pub fn get_metrics_history(&self) -> Vec<NetworkMetricsSample> {
        self.collector.history()
    }

    pub fn export_metrics(&self, last: usize) -> MetricsExport {
        self.collector.export(last)
    }

    pub async fn test_connection(&self) -> ApiMode {
        self.client.test_connection().await
    }

    pub fn api_status(&self) -> ApiStatus {
        ApiStatus {
            mode: self.client.mode(),
            last_response_time_ms: self.client.last_response_time_ms(),
            capabilities: self.client.capability_health(),
        }
    }

    /// Stop the collector and every case monitor, waiting for each to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        self.orchestrator.stop_all().await;
        if let Err(e) = (&mut self.collector_task).await {
            warn!(error = %e, "metrics collector ended abnormally");
        }
        info!("netcare engine stopped");
    }
}

impl Drop for NetCareSystem {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
