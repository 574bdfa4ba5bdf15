use std::ops::RangeInclusive;

use crate::error::{PredictError, Result};
use crate::variant::ModelVariant;

/// Speed/strength/stamina ratings are collected on a 1-10 scale.
pub const RATING_RANGE: RangeInclusive<f64> = 1.0..=10.0;

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictError::InvalidInput(format!("{} must be a finite number", field)))
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64> {
    let value = finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(PredictError::InvalidInput(format!(
            "{} must be greater than zero (got {})",
            field, value
        )))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64> {
    let value = finite(field, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(PredictError::InvalidInput(format!(
            "{} must not be negative (got {})",
            field, value
        )))
    }
}

fn rating(field: &'static str, value: f64) -> Result<f64> {
    let value = finite(field, value)?;
    if RATING_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(PredictError::InvalidInput(format!(
            "{} must be within {}..={} (got {})",
            field,
            RATING_RANGE.start(),
            RATING_RANGE.end(),
            value
        )))
    }
}

/// Body Mass Index: `weight_kg / (height_cm / 100)^2`.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<f64> {
    let weight_kg = finite("Player_Weight", weight_kg)?;
    let height_cm = positive("Player_Height", height_cm)?;
    let height_m = height_cm / 100.0;
    Ok(weight_kg / (height_m * height_m))
}

pub fn bmi_age_ratio(bmi: f64, age: f64) -> Result<f64> {
    let bmi = finite("BMI", bmi)?;
    Ok(bmi / positive("Player_Age", age)?)
}

pub fn prev_injury_age_ratio(previous_injuries: f64, age: f64) -> Result<f64> {
    let previous_injuries = finite("Previous_Injuries", previous_injuries)?;
    Ok(previous_injuries / positive("Player_Age", age)?)
}

/// Ordered model input, tagged with the contract whose order it follows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    variant: ModelVariant,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(variant: ModelVariant, values: Vec<f64>) -> Result<Self> {
        if values.len() != variant.input_dim() {
            return Err(PredictError::InvalidInput(format!(
                "{} expects {} features, got {}",
                variant,
                variant.input_dim(),
                values.len()
            )));
        }
        for (name, v) in variant.feature_names().iter().zip(&values) {
            if !v.is_finite() {
                return Err(PredictError::InvalidInput(format!(
                    "derived feature {} is not finite",
                    name
                )));
            }
        }
        Ok(Self { variant, values })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(feature name, value)` pairs in contract order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.variant
            .feature_names()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// A validated sample that knows how to lay itself out for its contract.
pub trait FeatureSource {
    fn variant(&self) -> ModelVariant;
    fn features(&self) -> Result<FeatureVector>;
}

/// Inputs of the fatigue regressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FatigueSample {
    pub speed: f64,
    pub strength: f64,
    pub stamina: f64,
}

impl FatigueSample {
    pub fn new(speed: f64, strength: f64, stamina: f64) -> Result<Self> {
        Ok(Self {
            speed: rating("Speed", speed)?,
            strength: rating("Strength", strength)?,
            stamina: rating("Stamina", stamina)?,
        })
    }
}

impl FeatureSource for FatigueSample {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Fatigue
    }

    fn features(&self) -> Result<FeatureVector> {
        FeatureVector::new(
            ModelVariant::Fatigue,
            vec![self.speed, self.strength, self.stamina],
        )
    }
}

/// Inputs of the 3-class triage model. BMI arrives precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriageSample {
    pub previous_injuries: f64,
    pub training_intensity: f64,
    pub bmi: f64,
}

impl TriageSample {
    pub fn new(previous_injuries: f64, training_intensity: f64, bmi: f64) -> Result<Self> {
        Ok(Self {
            previous_injuries: non_negative("Previous_Injuries", previous_injuries)?,
            training_intensity: non_negative("Training_Intensity", training_intensity)?,
            bmi: positive("BMI", bmi)?,
        })
    }
}

impl FeatureSource for TriageSample {
    fn variant(&self) -> ModelVariant {
        ModelVariant::InjuryTriage
    }

    fn features(&self) -> Result<FeatureVector> {
        FeatureVector::new(
            ModelVariant::InjuryTriage,
            vec![self.previous_injuries, self.training_intensity, self.bmi],
        )
    }
}

/// Ratios derived from a [`PlayerProfile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub bmi: f64,
    pub bmi_age_ratio: f64,
    pub prev_injury_age_ratio: f64,
}

/// Raw attributes of the binary injury model; the remaining three inputs
/// are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerProfile {
    pub age: f64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub previous_injuries: f64,
}

impl PlayerProfile {
    pub fn new(age: f64, weight_kg: f64, height_cm: f64, previous_injuries: f64) -> Result<Self> {
        Ok(Self {
            age: positive("Player_Age", age)?,
            weight_kg: positive("Player_Weight", weight_kg)?,
            height_cm: positive("Player_Height", height_cm)?,
            previous_injuries: non_negative("Previous_Injuries", previous_injuries)?,
        })
    }

    /// Training rows had weight and height rounded to two decimals before
    /// any feature was derived. Inference never rounds.
    pub fn rounded_for_training(self) -> Self {
        Self {
            weight_kg: round_to(self.weight_kg, 2),
            height_cm: round_to(self.height_cm, 2),
            ..self
        }
    }

    pub fn derive(&self) -> Result<DerivedFeatures> {
        let bmi = bmi(self.weight_kg, self.height_cm)?;
        Ok(DerivedFeatures {
            bmi,
            bmi_age_ratio: bmi_age_ratio(bmi, self.age)?,
            prev_injury_age_ratio: prev_injury_age_ratio(self.previous_injuries, self.age)?,
        })
    }
}

impl FeatureSource for PlayerProfile {
    fn variant(&self) -> ModelVariant {
        ModelVariant::InjuryBinary
    }

    fn features(&self) -> Result<FeatureVector> {
        let d = self.derive()?;
        FeatureVector::new(
            ModelVariant::InjuryBinary,
            vec![
                self.age,
                self.weight_kg,
                self.height_cm,
                self.previous_injuries,
                d.bmi,
                d.bmi_age_ratio,
                d.prev_injury_age_ratio,
            ],
        )
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
