//! Clinical threshold bands. Pure functions, total over `f64` input:
//! out-of-range values land in whatever band the arithmetic gives.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl WeightCategory {
    pub fn label(self) -> &'static str {
        match self {
            WeightCategory::Underweight => "Underweight",
            WeightCategory::Normal => "Normal",
            WeightCategory::Overweight => "Overweight",
            WeightCategory::Obese => "Obese",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloodCategory {
    Normal,
    Elevated,
    Stage1,
    Stage2,
}

impl BloodCategory {
    pub fn label(self) -> &'static str {
        match self {
            BloodCategory::Normal => "Normal",
            BloodCategory::Elevated => "Elevated",
            BloodCategory::Stage1 => "High Blood Pressure Stage 1",
            BloodCategory::Stage2 => "High Blood Pressure Stage 2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spo2Category {
    Normal,
    Low,
    VeryLow,
}

impl Spo2Category {
    pub fn label(self) -> &'static str {
        match self {
            Spo2Category::Normal => "Normal",
            Spo2Category::Low => "Low (Perlu perhatian)",
            Spo2Category::VeryLow => "Very Low (Segera konsultasi dokter)",
        }
    }
}

macro_rules! display_label {
    ($($t:ty),*) => {$(
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    )*};
}

display_label!(WeightCategory, BloodCategory, Spo2Category);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBloodResult {
    pub bmi: f64,
    pub weight_category: WeightCategory,
    pub blood_category: BloodCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spo2Result {
    pub spo2_category: Spo2Category,
}

/// BMI rounded to two decimals; the band is taken from the rounded value.
pub fn bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    let raw = weight_kg / (height_m * height_m);
    (raw * 100.0).round() / 100.0
}

pub fn weight_category(bmi: f64) -> WeightCategory {
    if bmi < 18.5 {
        WeightCategory::Underweight
    } else if bmi < 25.0 {
        WeightCategory::Normal
    } else if bmi < 30.0 {
        WeightCategory::Overweight
    } else {
        WeightCategory::Obese
    }
}

/// First match wins. The Stage 1 arm is an OR, so e.g. 150/85 is Stage 1;
/// this ordering is kept as-is.
pub fn blood_category(systolic: f64, diastolic: f64) -> BloodCategory {
    if systolic < 120.0 && diastolic < 80.0 {
        BloodCategory::Normal
    } else if systolic < 130.0 && diastolic < 80.0 {
        BloodCategory::Elevated
    } else if systolic < 140.0 || diastolic < 90.0 {
        BloodCategory::Stage1
    } else {
        BloodCategory::Stage2
    }
}

pub fn classify_weight_blood(
    height_cm: f64,
    weight_kg: f64,
    systolic: f64,
    diastolic: f64,
) -> WeightBloodResult {
    let bmi = bmi(height_cm, weight_kg);
    WeightBloodResult {
        bmi,
        weight_category: weight_category(bmi),
        blood_category: blood_category(systolic, diastolic),
    }
}

pub fn classify_spo2(spo2: f64) -> Spo2Result {
    let spo2_category = if spo2 >= 95.0 {
        Spo2Category::Normal
    } else if spo2 >= 90.0 {
        Spo2Category::Low
    } else {
        Spo2Category::VeryLow
    };
    Spo2Result { spo2_category }
}
