use crate::error::{PredictError, Result};
use crate::variant::ModelVariant;

/// Threshold applied to the binary injury probability.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Raw forward computation of a loaded model: scaled features in, raw
/// outputs (scores, logits or a probability) out.
pub trait ForwardModel: Send + Sync {
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;
    fn forward(&self, x: &[f64]) -> Result<Vec<f64>>;
}

/// Interpreted model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Score(f64),
    ClassIndex(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassifierHead {
    /// Index of the highest score; ties resolve to the lowest index.
    Argmax,
    /// Class 1 when the single output is strictly above the threshold.
    Threshold(f64),
}

impl ClassifierHead {
    fn classify(self, out: &[f64]) -> Result<u32> {
        match self {
            ClassifierHead::Argmax => {
                let mut best = 0usize;
                for (i, v) in out.iter().enumerate().skip(1) {
                    if *v > out[best] {
                        best = i;
                    }
                }
                Ok(best as u32)
            }
            ClassifierHead::Threshold(t) => match out {
                [p] => Ok(u32::from(*p > t)),
                _ => Err(PredictError::Inference(format!(
                    "threshold head expects one output, got {}",
                    out.len()
                ))),
            },
        }
    }
}

pub enum Predictor {
    Regressor(Box<dyn ForwardModel>),
    Classifier {
        model: Box<dyn ForwardModel>,
        head: ClassifierHead,
    },
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predictor::Regressor(m) => f
                .debug_struct("Regressor")
                .field("input_dim", &m.input_dim())
                .finish(),
            Predictor::Classifier { model, head } => f
                .debug_struct("Classifier")
                .field("input_dim", &model.input_dim())
                .field("head", head)
                .finish(),
        }
    }
}

impl Predictor {
    /// Wraps `model` with the output interpretation `variant` prescribes and
    /// checks its shape against the contract.
    pub fn for_variant(variant: ModelVariant, model: Box<dyn ForwardModel>) -> Result<Self> {
        if model.input_dim() != variant.input_dim() {
            return Err(PredictError::ModelLoad(format!(
                "{} model takes {} inputs, contract has {}",
                variant,
                model.input_dim(),
                variant.input_dim()
            )));
        }
        if model.output_dim() != variant.output_dim() {
            return Err(PredictError::ModelLoad(format!(
                "{} model emits {} outputs, contract expects {}",
                variant,
                model.output_dim(),
                variant.output_dim()
            )));
        }
        Ok(match variant {
            ModelVariant::Fatigue => Predictor::Regressor(model),
            ModelVariant::InjuryTriage => Predictor::Classifier {
                model,
                head: ClassifierHead::Argmax,
            },
            ModelVariant::InjuryBinary => Predictor::Classifier {
                model,
                head: ClassifierHead::Threshold(BINARY_THRESHOLD),
            },
        })
    }

    fn model(&self) -> &dyn ForwardModel {
        match self {
            Predictor::Regressor(m) => m.as_ref(),
            Predictor::Classifier { model, .. } => model.as_ref(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.model().input_dim()
    }

    pub fn predict(&self, x: &[f64]) -> Result<Prediction> {
        let out = self.model().forward(x)?;
        if out.is_empty() {
            return Err(PredictError::Inference("model produced no output".to_string()));
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(PredictError::Inference(format!(
                "model produced non-finite output {:?}",
                out
            )));
        }
        match self {
            Predictor::Regressor(_) => Ok(Prediction::Score(out[0])),
            Predictor::Classifier { head, .. } => head.classify(&out).map(Prediction::ClassIndex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>, usize);

    impl ForwardModel for Fixed {
        fn input_dim(&self) -> usize {
            self.1
        }
        fn output_dim(&self) -> usize {
            self.0.len()
        }
        fn forward(&self, _x: &[f64]) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_argmax_picks_first_of_ties() {
        let p = Predictor::for_variant(
            ModelVariant::InjuryTriage,
            Box::new(Fixed(vec![0.2, 0.9, 0.9], 3)),
        )
        .unwrap();
        assert_eq!(p.predict(&[0.0; 3]).unwrap(), Prediction::ClassIndex(1));
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = Predictor::for_variant(ModelVariant::InjuryBinary, Box::new(Fixed(vec![0.5], 7)))
            .unwrap();
        assert_eq!(at.predict(&[0.0; 7]).unwrap(), Prediction::ClassIndex(0));
        let above =
            Predictor::for_variant(ModelVariant::InjuryBinary, Box::new(Fixed(vec![0.51], 7)))
                .unwrap();
        assert_eq!(above.predict(&[0.0; 7]).unwrap(), Prediction::ClassIndex(1));
    }

    #[test]
    fn test_shape_mismatch_fails_at_construction() {
        let err = Predictor::for_variant(ModelVariant::Fatigue, Box::new(Fixed(vec![0.1, 0.2], 3)))
            .unwrap_err();
        assert!(matches!(err, PredictError::ModelLoad(_)));
        let err = Predictor::for_variant(ModelVariant::InjuryBinary, Box::new(Fixed(vec![0.1], 3)))
            .unwrap_err();
        assert!(matches!(err, PredictError::ModelLoad(_)));
    }

    #[test]
    fn test_nan_output_is_inference_failure() {
        let p = Predictor::for_variant(ModelVariant::Fatigue, Box::new(Fixed(vec![f64::NAN], 3)))
            .unwrap();
        assert!(matches!(p.predict(&[0.0; 3]), Err(PredictError::Inference(_))));
    }
}
