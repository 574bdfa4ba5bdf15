use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};
use crate::features::round_to;
use crate::predictor::Prediction;
use crate::variant::RISK_LABELS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueResponse {
    pub fatigue_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResponse {
    pub class: u32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryResponse {
    pub injury: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

pub fn risk_label(class: u32) -> Option<&'static str> {
    RISK_LABELS.get(class as usize).copied()
}

/// Regressor output in [0,1] -> percentage clamped to [0,100], 2 decimals.
pub fn fatigue_response(prediction: Prediction) -> Result<FatigueResponse> {
    match prediction {
        Prediction::Score(s) if s.is_finite() => Ok(FatigueResponse {
            fatigue_percent: round_to((s * 100.0).clamp(0.0, 100.0), 2),
        }),
        other => Err(PredictError::Inference(format!(
            "fatigue model returned {:?}, expected a finite score",
            other
        ))),
    }
}

pub fn triage_response(prediction: Prediction) -> Result<TriageResponse> {
    match prediction {
        Prediction::ClassIndex(class) => risk_label(class)
            .map(|label| TriageResponse {
                class,
                label: label.to_string(),
            })
            .ok_or_else(|| {
                PredictError::Inference(format!("triage class {} has no label", class))
            }),
        other => Err(PredictError::Inference(format!(
            "triage model returned {:?}, expected a class index",
            other
        ))),
    }
}

pub fn injury_response(prediction: Prediction) -> Result<InjuryResponse> {
    match prediction {
        Prediction::ClassIndex(c @ (0 | 1)) => Ok(InjuryResponse { injury: c as u8 }),
        other => Err(PredictError::Inference(format!(
            "injury model returned {:?}, expected class 0 or 1",
            other
        ))),
    }
}
