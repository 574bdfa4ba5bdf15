use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PredictError, Result};
use crate::predictor::ForwardModel;
use crate::variant::ModelVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    LeakyRelu,
    Sigmoid,
}

const DEFAULT_LEAKY_ALPHA: f64 = 0.01;

/// On-disk layer: `weights` is `[out][in]`, like a torch `Linear`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
    /// Negative slope, only read for `leaky_relu`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Contract the weights were trained for; checked on load when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ModelVariant>,
    pub layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
    alpha: f64,
}

impl DenseLayer {
    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut z = self.weights.dot(x) + &self.bias;
        match self.activation {
            Activation::Identity => {}
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::LeakyRelu => {
                let a = self.alpha;
                z.mapv_inplace(|v| if v >= 0.0 { v } else { a * v })
            }
            Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
        }
        z
    }
}

/// Small fully-connected feed-forward network evaluated on CPU.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    variant: Option<ModelVariant>,
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn from_spec(spec: NetworkSpec) -> Result<Self> {
        if spec.layers.is_empty() {
            return Err(PredictError::ModelLoad("network has no layers".to_string()));
        }
        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut prev_out: Option<usize> = None;
        for (i, l) in spec.layers.into_iter().enumerate() {
            let out_dim = l.weights.len();
            let in_dim = l.weights.first().map(|r| r.len()).unwrap_or(0);
            if out_dim == 0 || in_dim == 0 {
                return Err(PredictError::ModelLoad(format!("layer {} has empty weights", i)));
            }
            if l.weights.iter().any(|r| r.len() != in_dim) {
                return Err(PredictError::ModelLoad(format!("layer {} weights are ragged", i)));
            }
            if l.bias.len() != out_dim {
                return Err(PredictError::ModelLoad(format!(
                    "layer {} bias has {} entries, expected {}",
                    i,
                    l.bias.len(),
                    out_dim
                )));
            }
            if let Some(p) = prev_out {
                if p != in_dim {
                    return Err(PredictError::ModelLoad(format!(
                        "layer {} takes {} inputs but previous layer emits {}",
                        i, in_dim, p
                    )));
                }
            }
            if l.weights.iter().flatten().chain(&l.bias).any(|v| !v.is_finite()) {
                return Err(PredictError::ModelLoad(format!(
                    "layer {} has non-finite parameters",
                    i
                )));
            }
            let flat: Vec<f64> = l.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((out_dim, in_dim), flat)
                .map_err(|e| PredictError::ModelLoad(format!("layer {}: {}", i, e)))?;
            layers.push(DenseLayer {
                weights,
                bias: Array1::from(l.bias),
                activation: l.activation,
                alpha: l.alpha.unwrap_or(DEFAULT_LEAKY_ALPHA),
            });
            prev_out = Some(out_dim);
        }
        Ok(Self {
            variant: spec.variant,
            layers,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let spec: NetworkSpec = serde_json::from_str(s)
            .map_err(|e| PredictError::ModelLoad(format!("invalid network JSON: {}", e)))?;
        Self::from_spec(spec)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|e| {
            PredictError::ModelLoad(format!("failed to read model at {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&txt).map_err(|e| match e {
            PredictError::ModelLoad(msg) => {
                PredictError::ModelLoad(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn variant(&self) -> Option<ModelVariant> {
        self.variant
    }
}

impl ForwardModel for DenseNetwork {
    fn input_dim(&self) -> usize {
        self.layers[0].weights.ncols()
    }

    fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].weights.nrows()
    }

    fn forward(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.input_dim() {
            return Err(PredictError::Inference(format!(
                "feature length mismatch: got {}, expected {}",
                x.len(),
                self.input_dim()
            )));
        }
        let out = self
            .layers
            .iter()
            .fold(Array1::from(x.to_vec()), |h, layer| layer.apply(&h));
        Ok(out.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_layer_forward() {
        let net = DenseNetwork::from_json_str(
            r#"{"layers": [
                {"weights": [[1.0, -1.0], [0.5, 0.5]], "bias": [0.0, -1.0], "activation": "relu"},
                {"weights": [[2.0, 1.0]], "bias": [0.25]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(net.input_dim(), 2);
        assert_eq!(net.output_dim(), 1);
        // h = relu([3-1, 2-1]) = [2, 1]; y = 4 + 1 + 0.25
        assert_eq!(net.forward(&[3.0, 1.0]).unwrap(), vec![5.25]);
        // h = relu([-2, -0.5]) = [0, 0]
        assert_eq!(net.forward(&[-1.0, 1.0]).unwrap(), vec![0.25]);
    }

    #[test]
    fn test_leaky_relu_and_sigmoid() {
        let net = DenseNetwork::from_json_str(
            r#"{"layers": [
                {"weights": [[1.0]], "bias": [0.0], "activation": "leaky_relu", "alpha": 0.1},
                {"weights": [[1.0]], "bias": [0.0], "activation": "sigmoid"}
            ]}"#,
        )
        .unwrap();
        let y = net.forward(&[-10.0]).unwrap()[0];
        let expected = 1.0 / (1.0 + 1f64.exp());
        assert!((y - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_layers_fail_to_load() {
        let err = DenseNetwork::from_json_str(
            r#"{"layers": [
                {"weights": [[1.0, 1.0]], "bias": [0.0]},
                {"weights": [[1.0, 1.0]], "bias": [0.0]}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::ModelLoad(_)));
    }

    #[test]
    fn test_wrong_input_width_is_inference_failure() {
        let net = DenseNetwork::from_json_str(
            r#"{"layers": [{"weights": [[1.0, 1.0]], "bias": [0.0]}]}"#,
        )
        .unwrap();
        assert!(matches!(net.forward(&[1.0]), Err(PredictError::Inference(_))));
    }
}
