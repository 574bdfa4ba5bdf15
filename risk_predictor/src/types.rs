use athlete_features::{
    FatigueSample, ModelVariant, PlayerProfile, PredictError, Result, TriageSample,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// Request bodies: every field optional at the serde level so that an absent
// or null field turns into MissingField(name) instead of a generic decode
// error. Fields are checked in declaration order.

fn require(field: &'static str, value: Option<f64>) -> Result<f64> {
    value.ok_or(PredictError::MissingField(field))
}

/// Decodes a request body; malformed JSON or wrong types are InvalidInput.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| PredictError::InvalidInput(format!("malformed request body: {}", e)))
}

#[derive(Debug, Default, Deserialize)]
pub struct FatigueRequest {
    #[serde(rename = "Speed")]
    pub speed: Option<f64>,
    #[serde(rename = "Strength")]
    pub strength: Option<f64>,
    #[serde(rename = "Stamina")]
    pub stamina: Option<f64>,
}

impl FatigueRequest {
    pub fn into_sample(self) -> Result<FatigueSample> {
        FatigueSample::new(
            require("Speed", self.speed)?,
            require("Strength", self.strength)?,
            require("Stamina", self.stamina)?,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TriageRequest {
    #[serde(rename = "Previous_Injuries")]
    pub previous_injuries: Option<f64>,
    #[serde(rename = "Training_Intensity")]
    pub training_intensity: Option<f64>,
    #[serde(rename = "BMI")]
    pub bmi: Option<f64>,
}

impl TriageRequest {
    pub fn into_sample(self) -> Result<TriageSample> {
        TriageSample::new(
            require("Previous_Injuries", self.previous_injuries)?,
            require("Training_Intensity", self.training_intensity)?,
            require("BMI", self.bmi)?,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InjuryRequest {
    #[serde(rename = "Player_Age")]
    pub age: Option<f64>,
    #[serde(rename = "Player_Weight")]
    pub weight_kg: Option<f64>,
    #[serde(rename = "Player_Height")]
    pub height_cm: Option<f64>,
    #[serde(rename = "Previous_Injuries")]
    pub previous_injuries: Option<f64>,
}

impl InjuryRequest {
    pub fn into_sample(self) -> Result<PlayerProfile> {
        PlayerProfile::new(
            require("Player_Age", self.age)?,
            require("Player_Weight", self.weight_kg)?,
            require("Player_Height", self.height_cm)?,
            require("Previous_Injuries", self.previous_injuries)?,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub contracts: Vec<ModelVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub contracts: Vec<ModelVariant>,
}
