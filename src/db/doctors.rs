//! Doctor pool and case assignment.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::DoctorRoster;
use crate::models::{Doctor, DoctorId};
use crate::utils::SimRng;

#[derive(Default)]
struct DoctorPool {
    doctors: BTreeMap<DoctorId, Doctor>,
    /// case id -> bound doctor
    bindings: HashMap<String, DoctorId>,
}

impl DoctorPool {
    fn check(&self) {
        debug_assert!(self.doctors.values().all(Doctor::is_consistent));
        debug_assert_eq!(
            self.bindings.len(),
            self.doctors.values().filter(|d| !d.available).count()
        );
    }
}

/// Owns the doctor records. Assignment and release are single
/// read-modify-write operations on the whole pool, so two cases can never
/// be handed the same doctor.
pub struct DoctorRegistry {
    pool: Mutex<DoctorPool>,
}

impl DoctorRegistry {
    pub fn new(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        let doctors = doctors
            .into_iter()
            .map(|mut doctor| {
                doctor.available = true;
                doctor.current_case = None;
                (doctor.id, doctor)
            })
            .collect();
        Self {
            pool: Mutex::new(DoctorPool {
                doctors,
                bindings: HashMap::new(),
            }),
        }
    }

    pub fn from_roster(roster: &DoctorRoster) -> Self {
        Self::new(
            roster
                .0
                .iter()
                .zip(1..)
                .map(|(entry, id)| Doctor::new(id, entry.name.clone(), entry.specialty.clone())),
        )
    }

    /// Bind a random available doctor to the case. `None` when nobody is free.
    pub fn assign(&self, case_id: &str, rng: &SimRng) -> Option<Doctor> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(
            !pool.bindings.contains_key(case_id),
            "case {} already has a doctor",
            case_id
        );

        let available: Vec<DoctorId> = pool
            .doctors
            .values()
            .filter(|doctor| doctor.available)
            .map(|doctor| doctor.id)
            .collect();

        let Some(id) = rng.with(|rng| available.choose(rng).copied()) else {
            warn!(case_id, "no doctor available, case left unassigned");
            return None;
        };

        let doctor = pool.doctors.get_mut(&id)?;
        assert!(doctor.available, "doctor {} double-booked", id);
        doctor.available = false;
        doctor.current_case = Some(case_id.to_string());
        let assigned = doctor.clone();
        pool.bindings.insert(case_id.to_string(), id);
        pool.check();

        info!(case_id, doctor = %assigned.name, "doctor assigned");
        Some(assigned)
    }

    /// Undo the case's binding, if it has one.
    pub fn release(&self, case_id: &str) -> Option<Doctor> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        let id = pool.bindings.remove(case_id)?;
        let doctor = pool.doctors.get_mut(&id)?;
        assert_eq!(doctor.current_case.as_deref(), Some(case_id));
        doctor.available = true;
        doctor.current_case = None;
        let released = doctor.clone();
        pool.check();

        info!(case_id, doctor = %released.name, "doctor released");
        Some(released)
    }

    pub fn doctors(&self) -> Vec<Doctor> {
        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        pool.doctors.values().cloned().collect()
    }

    pub fn available_count(&self) -> usize {
        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        pool.doctors.values().filter(|d| d.available).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn registry() -> DoctorRegistry {
        DoctorRegistry::from_roster(&DoctorRoster::default())
    }

    #[test]
    fn assign_then_release_restores_availability() {
        let registry = registry();
        let rng = SimRng::seeded(5);

        let doctor = registry.assign("case0001", &rng).expect("free doctor");
        assert!(!doctor.available);
        assert_eq!(doctor.current_case.as_deref(), Some("case0001"));
        assert_eq!(registry.available_count(), 2);

        let released = registry.release("case0001").expect("bound doctor");
        assert_eq!(released.id, doctor.id);
        assert!(released.available);
        assert!(released.current_case.is_none());
        assert_eq!(registry.available_count(), 3);
        assert!(registry.release("case0001").is_none());
    }

    #[test]
    fn empty_pool_leaves_case_unassigned() {
        let registry = DoctorRegistry::new(Vec::new());
        assert!(registry.assign("case0001", &SimRng::seeded(1)).is_none());
    }

    #[test]
    fn exhausting_the_pool_returns_none() {
        let registry = registry();
        let rng = SimRng::seeded(9);
        for i in 0..3 {
            assert!(registry.assign(&format!("case{:04}", i), &rng).is_some());
        }
        assert!(registry.assign("case9999", &rng).is_none());
        assert!(registry.doctors().iter().all(|d| !d.available && d.is_consistent()));
    }

    #[test]
    #[should_panic(expected = "already has a doctor")]
    fn second_assignment_for_same_case_is_a_bug() {
        let registry = registry();
        let rng = SimRng::seeded(2);
        registry.assign("case0001", &rng);
        registry.assign("case0001", &rng);
    }

    #[test]
    fn concurrent_assignments_never_share_a_doctor() {
        let registry = Arc::new(registry());
        let rng = SimRng::seeded(77);

        let assigned: Vec<Option<Doctor>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let registry = registry.clone();
                    let rng = rng.clone();
                    scope.spawn(move || registry.assign(&format!("case{:04}", i), &rng))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids: Vec<DoctorId> = assigned.into_iter().flatten().map(|d| d.id).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);
    }
}
