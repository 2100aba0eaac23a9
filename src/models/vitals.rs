//! Vital-sign snapshot, symptom-driven initialisation and bounded drift.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const HEART_RATE_RANGE: RangeInclusive<i32> = 40..=180;
pub const SYSTOLIC_RANGE: RangeInclusive<i32> = 70..=220;
pub const DIASTOLIC_RANGE: RangeInclusive<i32> = 40..=130;
pub const OXYGEN_SATURATION_RANGE: RangeInclusive<i32> = 70..=100;
pub const RESPIRATORY_RATE_RANGE: RangeInclusive<i32> = 8..=40;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 35.0..=41.0;
pub const BLOOD_GLUCOSE_RANGE: RangeInclusive<i32> = 50..=400;

const CARDIAC_TERMS: [&str; 3] = ["chest", "heart", "cardiac"];
const RESPIRATORY_TERMS: [&str; 2] = ["breathing", "respiratory"];
const FEVER_TERMS: [&str; 1] = ["fever"];
const DIABETES_TERMS: [&str; 1] = ["diabet"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: i32,
    pub diastolic: i32,
}

impl std::fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate: i32,
    pub blood_pressure: BloodPressure,
    pub oxygen_saturation: i32,
    pub respiratory_rate: i32,
    pub temperature: f64,
    pub blood_glucose: i32,
}

/// An out-of-range reading flagged for the attending doctor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalAlert {
    pub vital: &'static str,
    pub message: String,
}

impl VitalSigns {
    /// Baseline vitals adjusted by keyword triggers in the symptom text.
    ///
    /// Each trigger family rewrites only its own fields, so several
    /// triggers compose without interfering.
    pub fn from_symptoms<R: Rng + ?Sized>(symptoms: &str, rng: &mut R) -> Self {
        let symptoms = symptoms.to_lowercase();
        let mentions = |terms: &[&str]| terms.iter().any(|term| symptoms.contains(term));

        let mut vitals = VitalSigns {
            heart_rate: rng.gen_range(65..=85),
            blood_pressure: BloodPressure {
                systolic: rng.gen_range(110..=130),
                diastolic: rng.gen_range(70..=85),
            },
            oxygen_saturation: rng.gen_range(95..=99),
            respiratory_rate: rng.gen_range(12..=20),
            temperature: round1(36.5 + rng.gen::<f64>()),
            blood_glucose: rng.gen_range(80..=120),
        };

        if mentions(&CARDIAC_TERMS) {
            vitals.heart_rate = rng.gen_range(90..=130);
            vitals.blood_pressure = BloodPressure {
                systolic: rng.gen_range(140..=180),
                diastolic: rng.gen_range(90..=110),
            };
        }
        if mentions(&RESPIRATORY_TERMS) {
            vitals.respiratory_rate = rng.gen_range(22..=35);
            vitals.oxygen_saturation = rng.gen_range(85..=94);
        }
        if mentions(&FEVER_TERMS) {
            vitals.temperature = round1(37.8 + rng.gen::<f64>() * 1.5);
        }
        if mentions(&DIABETES_TERMS) {
            vitals.blood_glucose = rng.gen_range(150..=300);
        }

        vitals.clamped()
    }

    /// Apply one tick of small random drift, then re-clamp.
    pub fn drift<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.heart_rate += rng.gen_range(-5..=5);
        self.blood_pressure.systolic += rng.gen_range(-3..=3);
        self.blood_pressure.diastolic += rng.gen_range(-2..=2);
        self.oxygen_saturation += rng.gen_range(-2..=1);
        self.respiratory_rate += rng.gen_range(-1..=1);
        self.temperature = round1(self.temperature + rng.gen_range(-0.2..=0.2));
        self.blood_glucose += rng.gen_range(-10..=10);
        *self = self.clamped();
        assert!(self.is_within_limits(), "vitals escaped clamp range: {:?}", self);
    }

    /// Every field forced into its physiological range.
    pub fn clamped(self) -> Self {
        VitalSigns {
            heart_rate: clamp(self.heart_rate, &HEART_RATE_RANGE),
            blood_pressure: BloodPressure {
                systolic: clamp(self.blood_pressure.systolic, &SYSTOLIC_RANGE),
                diastolic: clamp(self.blood_pressure.diastolic, &DIASTOLIC_RANGE),
            },
            oxygen_saturation: clamp(self.oxygen_saturation, &OXYGEN_SATURATION_RANGE),
            respiratory_rate: clamp(self.respiratory_rate, &RESPIRATORY_RATE_RANGE),
            temperature: self
                .temperature
                .clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end()),
            blood_glucose: clamp(self.blood_glucose, &BLOOD_GLUCOSE_RANGE),
        }
    }

    pub fn is_within_limits(&self) -> bool {
        HEART_RATE_RANGE.contains(&self.heart_rate)
            && SYSTOLIC_RANGE.contains(&self.blood_pressure.systolic)
            && DIASTOLIC_RANGE.contains(&self.blood_pressure.diastolic)
            && OXYGEN_SATURATION_RANGE.contains(&self.oxygen_saturation)
            && RESPIRATORY_RATE_RANGE.contains(&self.respiratory_rate)
            && TEMPERATURE_RANGE.contains(&self.temperature)
            && BLOOD_GLUCOSE_RANGE.contains(&self.blood_glucose)
    }

    pub fn alerts(&self) -> Vec<VitalAlert> {
        let mut alerts = Vec::new();

        if self.heart_rate > 100 {
            alerts.push(alert("heart_rate", format!("High heart rate: {} bpm", self.heart_rate)));
        } else if self.heart_rate < 60 {
            alerts.push(alert("heart_rate", format!("Low heart rate: {} bpm", self.heart_rate)));
        }

        if self.blood_pressure.systolic > 140 {
            alerts.push(alert(
                "blood_pressure",
                format!("High blood pressure: {} mmHg", self.blood_pressure),
            ));
        }

        if self.oxygen_saturation < 92 {
            alerts.push(alert(
                "oxygen_saturation",
                format!("Low oxygen saturation: {}%", self.oxygen_saturation),
            ));
        }

        if self.temperature > 38.0 {
            alerts.push(alert("temperature", format!("Fever: {:.1}°C", self.temperature)));
        }

        if self.respiratory_rate > 25 {
            alerts.push(alert(
                "respiratory_rate",
                format!("High respiratory rate: {}/min", self.respiratory_rate),
            ));
        }

        if self.blood_glucose > 180 {
            alerts.push(alert(
                "blood_glucose",
                format!("High blood glucose: {} mg/dL", self.blood_glucose),
            ));
        }

        alerts
    }
}

fn alert(vital: &'static str, message: String) -> VitalAlert {
    VitalAlert { vital, message }
}

fn clamp(value: i32, range: &RangeInclusive<i32>) -> i32 {
    value.clamp(*range.start(), *range.end())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    #[test]
    fn chest_pain_and_breathing_compose() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let vitals = VitalSigns::from_symptoms("chest pain, difficulty breathing", &mut rng);
            assert!((90..=130).contains(&vitals.heart_rate), "{:?}", vitals);
            assert!((85..=94).contains(&vitals.oxygen_saturation), "{:?}", vitals);
            assert!((22..=35).contains(&vitals.respiratory_rate), "{:?}", vitals);
            assert!(vitals.blood_pressure.systolic >= 140);
        }
    }

    #[test_case("Fever since last night", 37.8, 39.3 ; "fever raises temperature")]
    #[test_case("mild headache", 36.5, 37.5 ; "no trigger keeps baseline")]
    fn temperature_follows_symptoms(symptoms: &str, low: f64, high: f64) {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let vitals = VitalSigns::from_symptoms(symptoms, &mut rng);
            assert!(
                vitals.temperature >= low && vitals.temperature <= high,
                "{}",
                vitals.temperature
            );
        }
    }

    #[test]
    fn diabetic_patient_has_raised_glucose() {
        let mut rng = StdRng::seed_from_u64(3);
        let vitals = VitalSigns::from_symptoms("Diabetic, confused", &mut rng);
        assert!((150..=300).contains(&vitals.blood_glucose));
    }

    #[test]
    fn drift_never_leaves_clamp_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut vitals = VitalSigns {
            heart_rate: 180,
            blood_pressure: BloodPressure { systolic: 70, diastolic: 130 },
            oxygen_saturation: 70,
            respiratory_rate: 40,
            temperature: 41.0,
            blood_glucose: 50,
        };
        for _ in 0..10_000 {
            vitals.drift(&mut rng);
            assert_eq!(vitals.clamped(), vitals);
        }
    }

    #[test]
    fn alerts_flag_out_of_range_readings() {
        let vitals = VitalSigns {
            heart_rate: 120,
            blood_pressure: BloodPressure { systolic: 150, diastolic: 95 },
            oxygen_saturation: 90,
            respiratory_rate: 18,
            temperature: 36.8,
            blood_glucose: 100,
        };
        let flagged: Vec<_> = vitals.alerts().into_iter().map(|a| a.vital).collect();
        assert_eq!(flagged, vec!["heart_rate", "blood_pressure", "oxygen_saturation"]);
    }
}
