use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authoritative input order for the fatigue regressor.
pub const FATIGUE_FEATURES: [&str; 3] = ["Speed", "Strength", "Stamina"];

/// Authoritative input order for the 3-class injury triage model.
pub const TRIAGE_FEATURES: [&str; 3] = ["Previous_Injuries", "Training_Intensity", "BMI"];

/// Authoritative input order for the binary injury model.
pub const INJURY_FEATURES: [&str; 7] = [
    "Player_Age",
    "Player_Weight",
    "Player_Height",
    "Previous_Injuries",
    "BMI",
    "BMI_Age_Ratio",
    "Prev_Injury_Age",
];

/// Class index -> label for the triage model.
pub const RISK_LABELS: [&str; 3] = ["Low Risk", "Medium Risk", "High Risk"];

/// One deployable inference contract. The variants are not interchangeable:
/// each pins its own feature order, scaler and output interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Fatigue,
    InjuryTriage,
    InjuryBinary,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [
        ModelVariant::Fatigue,
        ModelVariant::InjuryTriage,
        ModelVariant::InjuryBinary,
    ];

    pub fn feature_names(self) -> &'static [&'static str] {
        match self {
            ModelVariant::Fatigue => &FATIGUE_FEATURES,
            ModelVariant::InjuryTriage => &TRIAGE_FEATURES,
            ModelVariant::InjuryBinary => &INJURY_FEATURES,
        }
    }

    pub fn input_dim(self) -> usize {
        self.feature_names().len()
    }

    /// Width of the raw model output this contract expects.
    pub fn output_dim(self) -> usize {
        match self {
            ModelVariant::Fatigue => 1,
            ModelVariant::InjuryTriage => RISK_LABELS.len(),
            ModelVariant::InjuryBinary => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Fatigue => "fatigue",
            ModelVariant::InjuryTriage => "injury_triage",
            ModelVariant::InjuryBinary => "injury_binary",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fatigue" => Ok(ModelVariant::Fatigue),
            "injury_triage" | "triage" => Ok(ModelVariant::InjuryTriage),
            "injury_binary" | "injury" => Ok(ModelVariant::InjuryBinary),
            other => Err(format!(
                "unknown model variant '{}' (expected fatigue, injury_triage or injury_binary)",
                other
            )),
        }
    }
}
