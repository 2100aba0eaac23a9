use serde::{Deserialize, Serialize};

pub type DoctorId = u32;

/// A practitioner in the on-call pool.
///
/// `available` is false exactly when `current_case` is set; the registry
/// is the only writer of both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
    pub available: bool,
    pub current_case: Option<String>,
}

impl Doctor {
    pub fn new(id: DoctorId, name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            specialty: specialty.into(),
            available: true,
            current_case: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.available == self.current_case.is_none()
    }
}

/// The doctor details a case keeps about its assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRef {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
}

impl From<&Doctor> for DoctorRef {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
        }
    }
}
