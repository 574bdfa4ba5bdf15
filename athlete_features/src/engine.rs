use crate::error::{PredictError, Result};
use crate::features::FeatureVector;
use crate::predictor::{Prediction, Predictor};
use crate::scaler::Scaler;
use crate::variant::ModelVariant;

/// Scaler and predictor of a single contract, checked against each other
/// once at construction and read-only afterwards.
#[derive(Debug)]
pub struct ContractEngine {
    variant: ModelVariant,
    scaler: Scaler,
    predictor: Predictor,
}

impl ContractEngine {
    pub fn new(variant: ModelVariant, scaler: Scaler, predictor: Predictor) -> Result<Self> {
        scaler.validate_for(variant)?;
        if predictor.input_dim() != variant.input_dim() {
            return Err(PredictError::ModelLoad(format!(
                "{} predictor takes {} inputs, contract has {}",
                variant,
                predictor.input_dim(),
                variant.input_dim()
            )));
        }
        Ok(Self {
            variant,
            scaler,
            predictor,
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn infer(&self, features: &FeatureVector) -> Result<Prediction> {
        if features.variant() != self.variant {
            return Err(PredictError::Inference(format!(
                "{} features sent to {} engine",
                features.variant(),
                self.variant
            )));
        }
        let scaled = self.scaler.transform(features)?;
        self.predict_scaled(&scaled)
    }

    /// Runs the model on an already-scaled vector.
    pub fn predict_scaled(&self, scaled: &[f64]) -> Result<Prediction> {
        self.predictor.predict(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FatigueSample, FeatureSource};
    use crate::network::DenseNetwork;
    use crate::scaler::ScalerParams;

    fn identity_scaler(variant: ModelVariant) -> Scaler {
        Scaler {
            feature_names: variant.feature_names().iter().map(|s| s.to_string()).collect(),
            params: ScalerParams::Standard {
                mean: vec![0.0; variant.input_dim()],
                scale: vec![1.0; variant.input_dim()],
            },
        }
    }

    fn sum_net() -> Predictor {
        let net = DenseNetwork::from_json_str(
            r#"{"layers": [{"weights": [[0.01, 0.01, 0.01]], "bias": [0.0]}]}"#,
        )
        .unwrap();
        Predictor::for_variant(ModelVariant::Fatigue, Box::new(net)).unwrap()
    }

    #[test]
    fn test_infer_scales_then_predicts() {
        let engine =
            ContractEngine::new(ModelVariant::Fatigue, identity_scaler(ModelVariant::Fatigue), sum_net())
                .unwrap();
        let fv = FatigueSample::new(8.0, 6.0, 7.0).unwrap().features().unwrap();
        match engine.infer(&fv).unwrap() {
            Prediction::Score(s) => assert!((s - 0.21).abs() < 1e-12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scaler_for_other_contract_is_rejected() {
        let err = ContractEngine::new(
            ModelVariant::Fatigue,
            identity_scaler(ModelVariant::InjuryTriage),
            sum_net(),
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::ModelLoad(_)));
    }

    #[test]
    fn test_foreign_features_are_refused() {
        let engine =
            ContractEngine::new(ModelVariant::Fatigue, identity_scaler(ModelVariant::Fatigue), sum_net())
                .unwrap();
        let fv = FeatureVector::new(ModelVariant::InjuryTriage, vec![1.0, 0.5, 22.0]).unwrap();
        assert!(matches!(engine.infer(&fv), Err(PredictError::Inference(_))));
    }
}
