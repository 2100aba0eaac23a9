//! Per-case background monitoring.
//!
//! One task per active case. Every tick refreshes location, vitals and
//! network quality; a failure in one kind is logged and skipped without
//! affecting the others or later ticks. The task stops when its token is
//! cancelled or the case is no longer active.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::db::CaseStore;
use crate::error::{NetcareError, Result};
use crate::models::{CaseStatus, LocationUpdate, NetworkQualitySample, VitalReading, VitalSigns};
use crate::telecom::RemoteCapabilityClient;
use crate::utils::SimRng;

#[derive(Debug, Error)]
enum RefreshError {
    #[error(transparent)]
    Case(#[from] NetcareError),
    #[error("provider returned no location fix")]
    NoFix,
}

/// Outcome of one tick, per data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub location: bool,
    pub vitals: bool,
    pub network: bool,
}

pub struct CaseMonitor {
    case_id: String,
    store: Arc<CaseStore>,
    client: Arc<RemoteCapabilityClient>,
    rng: SimRng,
    interval: Duration,
}

/// Owner's handle on a running monitor.
pub struct MonitorHandle {
    case_id: String,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!(case_id = %self.case_id, error = %e, "case monitor task ended abnormally");
        }
    }
}

impl CaseMonitor {
    pub fn new(
        case_id: impl Into<String>,
        store: Arc<CaseStore>,
        client: Arc<RemoteCapabilityClient>,
        rng: SimRng,
        interval: Duration,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            store,
            client,
            rng,
            interval,
        }
    }

    pub fn spawn(self, token: CancellationToken) -> MonitorHandle {
        let case_id = self.case_id.clone();
        let task = tokio::spawn(self.run(token.clone()));
        MonitorHandle { case_id, token, task }
    }

    #[instrument(skip_all, fields(case_id = %self.case_id))]
    async fn run(self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; monitoring starts one interval after intake.
        interval.tick().await;
        info!("case monitor started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("case monitor cancelled");
                    break;
                }
                _ = interval.tick() => {}
            }

            match self.store.status(&self.case_id) {
                Ok(CaseStatus::Active) => {}
                Ok(status) => {
                    info!(%status, "case no longer active, stopping monitor");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "monitored case disappeared");
                    break;
                }
            }

            self.tick().await;
        }
    }

    /// Refresh every data kind once.
    pub async fn tick(&self) -> TickReport {
        let (location, vitals, network) = tokio::join!(
            self.refresh_location(),
            async { refresh_vitals(&self.store, &self.case_id, &self.rng).map(|_| ()) },
            self.refresh_network(),
        );

        TickReport {
            location: self.settle("location", location),
            vitals: self.settle("vitals", vitals.map_err(RefreshError::from)),
            network: self.settle("network", network),
        }
    }

    fn settle(&self, kind: &'static str, outcome: std::result::Result<(), RefreshError>) -> bool {
        match outcome {
            Ok(()) => true,
            Err(RefreshError::Case(NetcareError::CaseNotActive { .. })) => {
                debug!(case_id = %self.case_id, kind, "case closed mid-tick, refresh dropped");
                false
            }
            Err(e) => {
                warn!(case_id = %self.case_id, kind, error = %e, "refresh skipped this tick");
                false
            }
        }
    }

    async fn refresh_location(&self) -> std::result::Result<(), RefreshError> {
        let device_id = self
            .store
            .with_case(&self.case_id, |case| case.patient.device_id.clone())?;
        let response = self.client.location(&device_id).await;
        let fix = response.data.location.ok_or(RefreshError::NoFix)?;
        let update = LocationUpdate::from_fix(fix, response.source);

        self.store.update_case(&self.case_id, |case| {
            case.ensure_active()?;
            case.realtime.record_location(update);
            Ok::<_, NetcareError>(())
        })??;
        Ok(())
    }

    async fn refresh_network(&self) -> std::result::Result<(), RefreshError> {
        let area_code = self
            .store
            .with_case(&self.case_id, |case| case.patient.area_code.clone())?;
        let response = self.client.congestion_insights(&area_code).await;
        let sample = NetworkQualitySample {
            timestamp: Utc::now(),
            congestion_level: response.data.congestion_level,
            network_health: response.data.network_health_score,
            active_users: response.data.active_users,
            source: response.source,
        };

        self.store.update_case(&self.case_id, |case| {
            case.ensure_active()?;
            case.realtime.record_network(sample);
            Ok::<_, NetcareError>(())
        })??;
        Ok(())
    }
}

/// Drift the case's vitals one step and append the reading to its history.
pub fn refresh_vitals(store: &CaseStore, case_id: &str, rng: &SimRng) -> Result<VitalSigns> {
    store.update_case(case_id, |case| {
        case.ensure_active()?;
        rng.with(|rng| case.vital_signs.drift(rng));
        case.realtime.record_vitals(VitalReading {
            timestamp: Utc::now(),
            vitals: case.vital_signs,
        });
        Ok(case.vital_signs)
    })?
}
