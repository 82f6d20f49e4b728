use serde::Deserialize;

use super::repo::{HealthRecord, Measurement};

/// Bounds of `health_data.name`, counted on the trimmed value.
const NAME_LEN: std::ops::RangeInclusive<usize> = 1..=255;

fn check_name(name: &str) -> Vec<String> {
    if NAME_LEN.contains(&name.trim().chars().count()) {
        Vec::new()
    } else {
        vec!["Nama harus 1-255 karakter".to_string()]
    }
}

impl WeightBloodForm {
    pub fn validate(&self) -> Vec<String> {
        check_name(&self.name)
    }
}

impl Spo2Form {
    pub fn validate(&self) -> Vec<String> {
        check_name(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct WeightBloodForm {
    pub name: String,
    pub age: i32,
    pub height: f64,
    pub weight: f64,
    pub systolic: f64,
    pub diastolic: f64,
}

#[derive(Debug, Deserialize)]
pub struct Spo2Form {
    pub name: String,
    pub age: i32,
    pub spo2: f64,
}

impl From<&WeightBloodForm> for HealthRecord {
    fn from(f: &WeightBloodForm) -> Self {
        Self {
            name: f.name.trim().to_string(),
            age: f.age,
            measurement: Measurement::WeightBlood {
                height: f.height,
                weight: f.weight,
                systolic: f.systolic,
                diastolic: f.diastolic,
            },
        }
    }
}

impl From<&Spo2Form> for HealthRecord {
    fn from(f: &Spo2Form) -> Self {
        Self {
            name: f.name.trim().to_string(),
            age: f.age,
            measurement: Measurement::Spo2 { spo2: f.spo2 },
        }
    }
}
