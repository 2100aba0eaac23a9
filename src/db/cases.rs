//! Case storage.
//!
//! Each case sits behind its own mutex, so the monitor writing one case never
//! contends with readers of another, and a reader never sees a half-applied
//! update. Locks are held for one closure only and never across an await.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{NetcareError, Result};
use crate::models::{CaseSnapshot, CaseStatus, CaseSummary, EmergencyCase};

const CASE_ID_LEN: usize = 8;
const CASE_ID_ATTEMPTS: usize = 16;

type CaseCell = Arc<Mutex<EmergencyCase>>;

#[derive(Default)]
pub struct CaseStore {
    cases: DashMap<String, CaseCell>,
}

impl CaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh 8-character case id not currently in use.
    pub fn allocate_id(&self) -> Result<String> {
        for _ in 0..CASE_ID_ATTEMPTS {
            let id = Uuid::new_v4().simple().to_string()[..CASE_ID_LEN].to_string();
            if !self.cases.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(NetcareError::CaseIdExhausted)
    }

    pub fn insert(&self, case: EmergencyCase) -> Result<()> {
        match self.cases.entry(case.case_id.clone()) {
            Entry::Occupied(entry) => Err(NetcareError::DuplicateCase(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(case)));
                Ok(())
            }
        }
    }

    fn cell(&self, case_id: &str) -> Result<CaseCell> {
        self.cases
            .get(case_id)
            .map(|cell| cell.value().clone())
            .ok_or_else(|| NetcareError::CaseNotFound(case_id.to_string()))
    }

    /// Read a case under its lock.
    pub fn with_case<R>(&self, case_id: &str, f: impl FnOnce(&EmergencyCase) -> R) -> Result<R> {
        let cell = self.cell(case_id)?;
        let case = cell.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&case))
    }

    /// Mutate a case under its lock.
    pub fn update_case<R>(
        &self,
        case_id: &str,
        f: impl FnOnce(&mut EmergencyCase) -> R,
    ) -> Result<R> {
        let cell = self.cell(case_id)?;
        let mut case = cell.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut case))
    }

    pub fn status(&self, case_id: &str) -> Result<CaseStatus> {
        self.with_case(case_id, |case| case.status)
    }

    pub fn snapshot(&self, case_id: &str, tail: usize) -> Result<CaseSnapshot> {
        self.with_case(case_id, |case| case.snapshot(tail))
    }

    /// All cases, oldest first.
    pub fn summaries(&self) -> Vec<CaseSummary> {
        let mut summaries: Vec<CaseSummary> = self
            .cells()
            .into_iter()
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner).summary())
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    pub fn count_by_status(&self, status: CaseStatus) -> usize {
        self.cells()
            .into_iter()
            .filter(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner).status == status)
            .count()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    // Clone the cells out first so no shard lock is held while a case lock is taken.
    fn cells(&self) -> Vec<CaseCell> {
        self.cases.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodPressure, PatientData, Severity, VitalSigns};

    fn case(id: &str) -> EmergencyCase {
        let patient = PatientData {
            name: "Ada".into(),
            phone_number: "+15550100".into(),
            device_id: "dev-1".into(),
            area_code: "SF".into(),
            age: 61,
            symptoms: "dizziness".into(),
            severity: Severity::Medium,
        };
        let vitals = VitalSigns {
            heart_rate: 72,
            blood_pressure: BloodPressure { systolic: 118, diastolic: 76 },
            oxygen_saturation: 98,
            respiratory_rate: 14,
            temperature: 36.9,
            blood_glucose: 95,
        };
        EmergencyCase::new(id.into(), patient, vitals, true)
    }

    #[test]
    fn allocated_ids_are_eight_characters() {
        let store = CaseStore::new();
        let id = store.allocate_id().unwrap();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let store = CaseStore::new();
        store.insert(case("aaaa0001")).unwrap();
        assert!(matches!(store.insert(case("aaaa0001")), Err(NetcareError::DuplicateCase(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_case_is_reported() {
        let store = CaseStore::new();
        assert!(matches!(
            store.status("nope"),
            Err(NetcareError::CaseNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn updates_are_visible_to_readers() {
        let store = CaseStore::new();
        store.insert(case("aaaa0002")).unwrap();
        store
            .update_case("aaaa0002", |case| case.vital_signs.heart_rate = 150)
            .unwrap();
        let hr = store.with_case("aaaa0002", |case| case.vital_signs.heart_rate).unwrap();
        assert_eq!(hr, 150);
        assert_eq!(store.count_by_status(CaseStatus::Initiated), 1);
        assert_eq!(store.summaries()[0].patient_name, "Ada");
    }
}
