use anyhow::{bail, Context, Result};
use athlete_features::ModelVariant;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/service.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Scaler + model files of one contract.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Log every derived feature vector at info level.
    #[serde(default)]
    pub log_predictions: bool,
    #[serde(default)]
    pub fatigue: Option<ArtifactPaths>,
    #[serde(default)]
    pub injury_triage: Option<ArtifactPaths>,
    #[serde(default)]
    pub injury_binary: Option<ArtifactPaths>,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_predictions: false,
            fatigue: None,
            injury_triage: None,
            injury_binary: None,
        }
    }
}

/// Env var names for a contract's model and scaler paths.
fn env_keys(variant: ModelVariant) -> (&'static str, &'static str) {
    match variant {
        ModelVariant::Fatigue => ("FATIGUE_MODEL_PATH", "FATIGUE_SCALER_PATH"),
        ModelVariant::InjuryTriage => ("TRIAGE_MODEL_PATH", "TRIAGE_SCALER_PATH"),
        ModelVariant::InjuryBinary => ("INJURY_MODEL_PATH", "INJURY_SCALER_PATH"),
    }
}

impl ServiceConfig {
    /// Reads a JSON config file. Relative artifact paths are taken relative
    /// to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let mut cfg: ServiceConfig = serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for variant in ModelVariant::ALL {
            if let Some(paths) = cfg.artifacts_mut(variant) {
                paths.model = resolve(base, &paths.model);
                paths.scaler = resolve(base, &paths.scaler);
            }
        }
        Ok(cfg)
    }

    /// `CONFIG_PATH` (or the default file when it exists), then environment
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let lookup = |k: &str| std::env::var(k).ok();
        let mut cfg = match lookup("CONFIG_PATH") {
            Some(p) => Self::load(Path::new(&p))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                tracing::warn!(
                    "no CONFIG_PATH and no {}; using environment only",
                    DEFAULT_CONFIG_PATH
                );
                Self::default()
            }
        };
        cfg.apply_env(lookup)?;
        Ok(cfg)
    }

    /// `PORT`, then `BIND_ADDR`, `LOG_PRED=1`, and per-contract path pairs.
    /// Setting only one path of a pair replaces that path; a contract absent
    /// from the file needs both.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(flag) = lookup("LOG_PRED") {
            self.log_predictions = flag.trim() == "1";
        }
        for variant in ModelVariant::ALL {
            let (model_key, scaler_key) = env_keys(variant);
            let model = lookup(model_key).map(PathBuf::from);
            let scaler = lookup(scaler_key).map(PathBuf::from);
            if model.is_none() && scaler.is_none() {
                continue;
            }
            if let Some(paths) = self.artifacts_mut(variant) {
                if let Some(m) = model {
                    paths.model = m;
                }
                if let Some(s) = scaler {
                    paths.scaler = s;
                }
                continue;
            }
            match (model, scaler) {
                (Some(model), Some(scaler)) => {
                    self.set_artifacts(variant, ArtifactPaths { model, scaler });
                }
                _ => bail!(
                    "{} needs both {} and {} when not configured in the file",
                    variant,
                    model_key,
                    scaler_key
                ),
            }
        }
        Ok(())
    }

    pub fn artifacts(&self, variant: ModelVariant) -> Option<&ArtifactPaths> {
        match variant {
            ModelVariant::Fatigue => self.fatigue.as_ref(),
            ModelVariant::InjuryTriage => self.injury_triage.as_ref(),
            ModelVariant::InjuryBinary => self.injury_binary.as_ref(),
        }
    }

    fn artifacts_mut(&mut self, variant: ModelVariant) -> Option<&mut ArtifactPaths> {
        match variant {
            ModelVariant::Fatigue => self.fatigue.as_mut(),
            ModelVariant::InjuryTriage => self.injury_triage.as_mut(),
            ModelVariant::InjuryBinary => self.injury_binary.as_mut(),
        }
    }

    pub fn set_artifacts(&mut self, variant: ModelVariant, paths: ArtifactPaths) {
        let slot = match variant {
            ModelVariant::Fatigue => &mut self.fatigue,
            ModelVariant::InjuryTriage => &mut self.injury_triage,
            ModelVariant::InjuryBinary => &mut self.injury_binary,
        };
        *slot = Some(paths);
    }

    /// Contracts that have artifacts configured.
    pub fn contracts(&self) -> Vec<ModelVariant> {
        ModelVariant::ALL
            .into_iter()
            .filter(|v| self.artifacts(*v).is_some())
            .collect()
    }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
