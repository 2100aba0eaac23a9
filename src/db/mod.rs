//! In-memory stores for the NetCare+ engine.
//!
//! Cases and doctors live for the lifetime of the process; nothing is
//! persisted.

use std::sync::Arc;

use crate::config::DoctorRoster;

pub mod cases;
pub mod doctors;

pub use cases::CaseStore;
pub use doctors::DoctorRegistry;

/// Handles to the process-wide stores
#[derive(Clone)]
pub struct Database {
    cases: Arc<CaseStore>,
    doctors: Arc<DoctorRegistry>,
}

impl Database {
    /// Create empty case storage and a doctor pool seeded from the roster
    pub fn in_memory(roster: &DoctorRoster) -> Self {
        Self {
            cases: Arc::new(CaseStore::new()),
            doctors: Arc::new(DoctorRegistry::from_roster(roster)),
        }
    }

    pub fn cases(&self) -> Arc<CaseStore> {
        self.cases.clone()
    }

    pub fn doctors(&self) -> Arc<DoctorRegistry> {
        self.doctors.clone()
    }
}
