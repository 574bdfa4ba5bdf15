//! Feature derivation and inference contract for the athlete fatigue and
//! injury-risk models.
//!
//! A request body becomes a typed sample ([`FatigueSample`], [`TriageSample`],
//! [`PlayerProfile`]), the sample lays itself out as a [`FeatureVector`] in its
//! contract's fixed order, a [`ContractEngine`] scales and runs it, and the
//! `response` module maps the [`Prediction`] onto the JSON contract.

pub mod engine;
pub mod error;
pub mod features;
pub mod network;
pub mod predictor;
pub mod response;
pub mod scaler;
pub mod synth;
pub mod variant;

pub use engine::ContractEngine;
pub use error::{PredictError, Result};
pub use features::{
    bmi, bmi_age_ratio, prev_injury_age_ratio, DerivedFeatures, FatigueSample, FeatureSource,
    FeatureVector, PlayerProfile, TriageSample,
};
pub use network::{Activation, DenseNetwork, LayerSpec, NetworkSpec};
pub use predictor::{ClassifierHead, ForwardModel, Prediction, Predictor};
pub use response::{
    fatigue_response, injury_response, triage_response, ErrorResponse, FatigueResponse,
    InjuryResponse, TriageResponse,
};
pub use scaler::{Scaler, ScalerParams};
pub use variant::ModelVariant;
