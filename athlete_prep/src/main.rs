mod dataset;

use anyhow::{Context, Result};
use athlete_features::synth::{FatigueSynthesizer, DEFAULT_NOISE_STD};
use athlete_features::{ModelVariant, Scaler};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Training-side preparation for the athlete risk models.
#[derive(Parser, Debug)]
#[command(name = "athlete_prep", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a synthetic fatigue training set (Speed, Strength, Stamina, Fatigue).
    Synth {
        #[arg(long, default_value_t = 1000)]
        rows: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Label noise standard deviation, in fatigue percent
        #[arg(long, default_value_t = DEFAULT_NOISE_STD)]
        noise: f64,
        #[arg(long, default_value = "synthetic_fatigue_data.csv")]
        out: PathBuf,
    },
    /// Fit a contract's scaler on a CSV training set and write it as JSON.
    FitScaler {
        /// fatigue, injury_triage or injury_binary
        #[arg(long)]
        variant: ModelVariant,
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ScalerKind::Standard)]
        kind: ScalerKind,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScalerKind {
    Standard,
    MinMax,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Synth {
            rows,
            seed,
            noise,
            out,
        } => {
            write_synthetic(&out, rows, seed, noise)?;
            tracing::info!("wrote {} synthetic rows (seed={}) to {}", rows, seed, out.display());
        }
        Command::FitScaler {
            variant,
            data,
            out,
            kind,
        } => {
            let (scaler, n) = fit_scaler(variant, &data, kind)?;
            scaler.save(&out)?;
            tracing::info!(
                "fit {:?} scaler for {} on {} rows; features={:?} -> {}",
                kind,
                variant,
                n,
                scaler.feature_names,
                out.display()
            );
        }
    }
    Ok(())
}

fn write_synthetic(out: &Path, rows: usize, seed: u64, noise: f64) -> Result<()> {
    let data = FatigueSynthesizer::new(seed).with_noise_std(noise).rows(rows);
    let file =
        File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    dataset::write_fatigue_csv(file, &data)
}

/// Returns the fitted scaler and the number of training rows it saw.
fn fit_scaler(variant: ModelVariant, data: &Path, kind: ScalerKind) -> Result<(Scaler, usize)> {
    let file = File::open(data).with_context(|| format!("failed to open {}", data.display()))?;
    let rows = dataset::training_rows(file, variant)
        .with_context(|| format!("failed to read {}", data.display()))?;
    let scaler = match kind {
        ScalerKind::Standard => Scaler::fit_standard(variant, &rows)?,
        ScalerKind::MinMax => Scaler::fit_min_max(variant, &rows)?,
    };
    Ok((scaler, rows.len()))
}
