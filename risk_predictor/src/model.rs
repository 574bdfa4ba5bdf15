use anyhow::{bail, Context, Result};
use athlete_features::{
    ContractEngine, DenseNetwork, ForwardModel, ModelVariant, PredictError, Predictor, Scaler,
};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{ArtifactPaths, ServiceConfig};

/// Everything a request handler reads: one engine per deployed contract.
/// Immutable once built; reload builds a fresh one.
#[derive(Debug, Default)]
pub struct InferenceContext {
    engines: BTreeMap<ModelVariant, ContractEngine>,
}

impl InferenceContext {
    /// Loads every configured contract and probes each with a zero vector.
    /// Any failure aborts the whole load.
    pub fn load(cfg: &ServiceConfig) -> Result<Self> {
        let contracts = cfg.contracts();
        if contracts.is_empty() {
            bail!("no model contracts configured");
        }
        let mut engines = Vec::with_capacity(contracts.len());
        for variant in contracts {
            if let Some(paths) = cfg.artifacts(variant) {
                let engine = load_engine(variant, paths)
                    .with_context(|| format!("failed to load {} artifacts", variant))?;
                let dim = variant.input_dim();
                let probe = engine
                    .predict_scaled(&vec![0.0; dim])
                    .with_context(|| format!("{} warmup forward failed", variant))?;
                tracing::info!(
                    "loaded {} contract; model={} scaler={} warmup={:?}",
                    variant,
                    paths.model.display(),
                    paths.scaler.display(),
                    probe
                );
                engines.push(engine);
            }
        }
        Ok(Self::from_engines(engines))
    }

    pub fn from_engines(engines: impl IntoIterator<Item = ContractEngine>) -> Self {
        Self {
            engines: engines.into_iter().map(|e| (e.variant(), e)).collect(),
        }
    }

    pub fn engine(&self, variant: ModelVariant) -> Option<&ContractEngine> {
        self.engines.get(&variant)
    }

    pub fn contracts(&self) -> Vec<ModelVariant> {
        self.engines.keys().copied().collect()
    }
}

pub fn load_engine(
    variant: ModelVariant,
    paths: &ArtifactPaths,
) -> std::result::Result<ContractEngine, PredictError> {
    let scaler = Scaler::load(&paths.scaler)?;
    let model = load_forward_model(variant, &paths.model)?;
    let predictor = Predictor::for_variant(variant, model)?;
    ContractEngine::new(variant, scaler, predictor)
}

fn is_torchscript(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("pt") | Some("ts")
    )
}

fn load_forward_model(
    variant: ModelVariant,
    path: &Path,
) -> std::result::Result<Box<dyn ForwardModel>, PredictError> {
    if is_torchscript(path) {
        return load_torchscript(variant, path);
    }
    let net = DenseNetwork::load(path)?;
    if let Some(trained_for) = net.variant() {
        if trained_for != variant {
            return Err(PredictError::ModelLoad(format!(
                "{} was exported for the {} contract, not {}",
                path.display(),
                trained_for,
                variant
            )));
        }
    }
    Ok(Box::new(net))
}

#[cfg(feature = "torchscript")]
fn load_torchscript(
    variant: ModelVariant,
    path: &Path,
) -> std::result::Result<Box<dyn ForwardModel>, PredictError> {
    Ok(Box::new(torchscript::TorchScriptModel::load(
        path,
        variant.input_dim(),
    )?))
}

#[cfg(not(feature = "torchscript"))]
fn load_torchscript(
    _variant: ModelVariant,
    path: &Path,
) -> std::result::Result<Box<dyn ForwardModel>, PredictError> {
    Err(PredictError::ModelLoad(format!(
        "{} is a TorchScript model but this build lacks the `torchscript` feature",
        path.display()
    )))
}

#[cfg(feature = "torchscript")]
mod torchscript {
    use athlete_features::{ForwardModel, PredictError};
    use std::path::Path;
    use tch::{kind::Kind, CModule, Device, Tensor};

    /// TorchScript module taking `[1, in_dim]` float32 and returning any
    /// `[1, ...]` shaped output, flattened.
    pub struct TorchScriptModel {
        model: CModule,
        device: Device,
        in_dim: usize,
        out_dim: usize,
    }

    impl TorchScriptModel {
        pub fn load(path: &Path, in_dim: usize) -> Result<Self, PredictError> {
            let device = Device::Cpu;
            let model = CModule::load_on_device(path, device).map_err(|e| {
                PredictError::ModelLoad(format!(
                    "failed to load TorchScript {}: {}",
                    path.display(),
                    e
                ))
            })?;

            // Probe output shape with a dummy forward, expect [B=1, ...]
            let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
            let t = model
                .forward_ts(&[dummy])
                .map_err(|e| PredictError::ModelLoad(format!("probe forward failed: {}", e)))?;
            let sz = t.size();
            if sz.is_empty() || sz[0] != 1 {
                return Err(PredictError::ModelLoad(format!(
                    "unexpected model output size: {:?}",
                    sz
                )));
            }
            let out_dim = sz[1..].iter().product::<i64>().max(1) as usize;

            Ok(Self {
                model,
                device,
                in_dim,
                out_dim,
            })
        }
    }

    impl ForwardModel for TorchScriptModel {
        fn input_dim(&self) -> usize {
            self.in_dim
        }

        fn output_dim(&self) -> usize {
            self.out_dim
        }

        fn forward(&self, x: &[f64]) -> Result<Vec<f64>, PredictError> {
            if x.len() != self.in_dim {
                return Err(PredictError::Inference(format!(
                    "feature length mismatch: got {}, expected {}",
                    x.len(),
                    self.in_dim
                )));
            }
            let input: Vec<f32> = x.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&input)
                .reshape([1, self.in_dim as i64])
                .to_device(self.device);
            let t = self
                .model
                .forward_ts(&[input])
                .map_err(|e| PredictError::Inference(e.to_string()))?;
            let flat = t.to_kind(Kind::Double).reshape([-1]);
            Vec::<f64>::try_from(&flat).map_err(|e| PredictError::Inference(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FATIGUE_SCALER: &str = r#"{"feature_names": ["Speed", "Strength", "Stamina"],
        "kind": "standard", "mean": [5.5, 5.5, 5.5], "scale": [1.0, 1.0, 1.0]}"#;

    fn write_fatigue(dir: &Path, model: &str) -> ServiceConfig {
        fs::write(dir.join("scaler.json"), FATIGUE_SCALER).unwrap();
        fs::write(dir.join("model.json"), model).unwrap();
        let mut cfg = ServiceConfig::default();
        cfg.set_artifacts(
            ModelVariant::Fatigue,
            ArtifactPaths {
                model: dir.join("model.json"),
                scaler: dir.join("scaler.json"),
            },
        );
        cfg
    }

    #[test]
    fn test_load_configured_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_fatigue(
            dir.path(),
            r#"{"variant": "fatigue", "layers": [{"weights": [[0.0, 0.0, 0.0]], "bias": [0.5]}]}"#,
        );
        let ctx = InferenceContext::load(&cfg).unwrap();
        assert_eq!(ctx.contracts(), vec![ModelVariant::Fatigue]);
        assert!(ctx.engine(ModelVariant::InjuryBinary).is_none());
    }

    #[test]
    fn test_model_exported_for_other_contract_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_fatigue(
            dir.path(),
            r#"{"variant": "injury_triage", "layers": [{"weights": [[0.0, 0.0, 0.0]], "bias": [0.5]}]}"#,
        );
        assert!(InferenceContext::load(&cfg).is_err());
    }

    #[test]
    fn test_nothing_configured_fails() {
        assert!(InferenceContext::load(&ServiceConfig::default()).is_err());
    }

    #[cfg(not(feature = "torchscript"))]
    #[test]
    fn test_torchscript_needs_feature() {
        let Err(err) = load_forward_model(ModelVariant::Fatigue, Path::new("model.pt")) else {
            panic!("a .pt artifact must not load without the torchscript feature");
        };
        assert!(matches!(err, PredictError::ModelLoad(_)));
    }
}
