use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Declared urgency of an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::High
    }
}

/// Patient record captured at intake.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PatientData {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub phone_number: String,
    #[validate(custom = "not_blank")]
    pub device_id: String,
    #[serde(default)]
    pub area_code: String,
    #[validate(range(min = 1, max = 120))]
    pub age: u8,
    #[validate(custom = "not_blank")]
    pub symptoms: String,
    #[serde(default, alias = "emergency_level")]
    pub severity: Severity,
}

impl PatientData {
    /// Trim free-text fields and validate the record.
    pub fn normalized(mut self) -> Result<Self, validator::ValidationErrors> {
        for field in [
            &mut self.name,
            &mut self.phone_number,
            &mut self.device_id,
            &mut self.area_code,
            &mut self.symptoms,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self.validate()?;
        Ok(self)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
