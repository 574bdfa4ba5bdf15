use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PredictError, Result};
use crate::features::FeatureVector;
use crate::variant::ModelVariant;

/// Per-feature statistics. A zero scale (or zero min/max range) means the
/// column was constant at fit time and is left unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

/// Persisted scaler state. `feature_names` records the order it was fit in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub feature_names: Vec<String>,
    #[serde(flatten)]
    pub params: ScalerParams,
}

fn non_zero(d: f64) -> f64 {
    if d == 0.0 {
        1.0
    } else {
        d
    }
}

impl Scaler {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| PredictError::ModelLoad(format!("invalid scaler JSON: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|e| {
            PredictError::ModelLoad(format!("failed to read scaler at {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&txt).map_err(|e| match e {
            PredictError::ModelLoad(msg) => {
                PredictError::ModelLoad(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let txt = serde_json::to_string_pretty(self)
            .map_err(|e| PredictError::ModelLoad(format!("failed to encode scaler: {}", e)))?;
        fs::write(path, txt).map_err(|e| {
            PredictError::ModelLoad(format!("failed to write scaler to {}: {}", path.display(), e))
        })
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Checks the scaler was fit on exactly `variant`'s feature order.
    pub fn validate_for(&self, variant: ModelVariant) -> Result<()> {
        let expected = variant.feature_names();
        if self.feature_names.len() != expected.len()
            || self.feature_names.iter().zip(expected).any(|(a, b)| a != b)
        {
            return Err(PredictError::ModelLoad(format!(
                "scaler feature order {:?} does not match {} contract {:?}",
                self.feature_names, variant, expected
            )));
        }
        let (a, b) = match &self.params {
            ScalerParams::Standard { mean, scale } => (mean.len(), scale.len()),
            ScalerParams::MinMax { min, max } => (min.len(), max.len()),
        };
        if a != expected.len() || b != expected.len() {
            return Err(PredictError::ModelLoad(format!(
                "scaler statistics have {}/{} entries, expected {}",
                a,
                b,
                expected.len()
            )));
        }
        let stats_finite = match &self.params {
            ScalerParams::Standard { mean, scale } => {
                mean.iter().chain(scale).all(|v| v.is_finite())
            }
            ScalerParams::MinMax { min, max } => min.iter().chain(max).all(|v| v.is_finite()),
        };
        if !stats_finite {
            return Err(PredictError::ModelLoad(
                "scaler statistics contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        if features.len() != self.len() {
            return Err(PredictError::Inference(format!(
                "feature length mismatch: got {}, scaler expects {}",
                features.len(),
                self.len()
            )));
        }
        let x = features.values();
        let out = match &self.params {
            ScalerParams::Standard { mean, scale } => x
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(v, (m, s))| (v - m) / non_zero(*s))
                .collect(),
            ScalerParams::MinMax { min, max } => x
                .iter()
                .zip(min.iter().zip(max))
                .map(|(v, (lo, hi))| (v - lo) / non_zero(hi - lo))
                .collect(),
        };
        Ok(out)
    }

    /// Fits mean and population standard deviation per column.
    pub fn fit_standard(variant: ModelVariant, rows: &[Vec<f64>]) -> Result<Self> {
        let dim = check_rows(variant, rows)?;
        let n = rows.len() as f64;
        let mut mean = vec![0.0; dim];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; dim];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let scale = var.into_iter().map(|v| (v / n).sqrt()).collect();

        Ok(Self {
            feature_names: names(variant),
            params: ScalerParams::Standard { mean, scale },
        })
    }

    pub fn fit_min_max(variant: ModelVariant, rows: &[Vec<f64>]) -> Result<Self> {
        let dim = check_rows(variant, rows)?;
        let mut min = vec![f64::INFINITY; dim];
        let mut max = vec![f64::NEG_INFINITY; dim];
        for row in rows {
            for (i, v) in row.iter().enumerate() {
                min[i] = min[i].min(*v);
                max[i] = max[i].max(*v);
            }
        }
        Ok(Self {
            feature_names: names(variant),
            params: ScalerParams::MinMax { min, max },
        })
    }
}

fn names(variant: ModelVariant) -> Vec<String> {
    variant.feature_names().iter().map(|s| s.to_string()).collect()
}

fn check_rows(variant: ModelVariant, rows: &[Vec<f64>]) -> Result<usize> {
    let dim = variant.input_dim();
    if rows.is_empty() {
        return Err(PredictError::InvalidInput(
            "cannot fit a scaler on zero rows".to_string(),
        ));
    }
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != dim || r.iter().any(|v| !v.is_finite()))
    {
        return Err(PredictError::InvalidInput(format!(
            "row {} has {} values (expected {} finite values)",
            i,
            row.len(),
            dim
        )));
    }
    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fatigue(values: [f64; 3]) -> FeatureVector {
        FeatureVector::new(ModelVariant::Fatigue, values.to_vec()).unwrap()
    }

    #[test]
    fn test_fit_standard_uses_population_std() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 5.0]];
        let s = Scaler::fit_standard(ModelVariant::Fatigue, &rows).unwrap();
        match &s.params {
            ScalerParams::Standard { mean, scale } => {
                assert_eq!(mean, &vec![2.0, 2.0, 4.0]);
                assert_eq!(scale, &vec![1.0, 0.0, 1.0]);
            }
            other => panic!("unexpected params {:?}", other),
        }
        // constant column passes through centred but unscaled
        let out = s.transform(&fatigue([3.0, 4.0, 4.0])).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_min_max_transform() {
        let rows = vec![vec![1.0, 1.0, 1.0], vec![10.0, 5.0, 1.0]];
        let s = Scaler::fit_min_max(ModelVariant::Fatigue, &rows).unwrap();
        let out = s.transform(&fatigue([5.5, 3.0, 7.0])).unwrap();
        assert_eq!(out, vec![0.5, 0.5, 6.0]);
    }

    #[test]
    fn test_validate_rejects_reordered_features() {
        let s = Scaler {
            feature_names: vec!["Stamina".into(), "Speed".into(), "Strength".into()],
            params: ScalerParams::Standard {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            },
        };
        assert!(matches!(
            s.validate_for(ModelVariant::Fatigue),
            Err(PredictError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_json_layout() {
        let txt = r#"{
            "feature_names": ["Speed", "Strength", "Stamina"],
            "kind": "standard",
            "mean": [5.5, 5.5, 5.5],
            "scale": [2.0, 2.0, 2.0]
        }"#;
        let s = Scaler::from_json_str(txt).unwrap();
        s.validate_for(ModelVariant::Fatigue).unwrap();
        assert_eq!(s.transform(&fatigue([7.5, 5.5, 3.5])).unwrap(), vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_fit_rejects_empty_input() {
        assert!(Scaler::fit_standard(ModelVariant::Fatigue, &[]).is_err());
    }
}
