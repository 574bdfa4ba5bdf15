use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::features::round_to;

/// Default standard deviation of the label noise, in fatigue percent.
pub const DEFAULT_NOISE_STD: f64 = 5.0;

/// One synthetic training row, column names as the fatigue trainer reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueRow {
    #[serde(rename = "Speed")]
    pub speed: u8,
    #[serde(rename = "Strength")]
    pub strength: u8,
    #[serde(rename = "Stamina")]
    pub stamina: u8,
    #[serde(rename = "Fatigue")]
    pub fatigue: f64,
}

/// Noise-free fatigue for the given ratings, before clamping.
///
/// Stamina weighs 0.4, speed and strength 0.3 each; a perfect 10/10/10
/// athlete sits at 0% and a 0/0/0 one at 100%.
pub fn fatigue_target(speed: f64, strength: f64, stamina: f64) -> f64 {
    let weighted = (0.3 * speed + 0.3 * strength + 0.4 * stamina) / 10.0;
    100.0 * (1.0 - weighted)
}

/// Seeded generator of fatigue rows. Ratings are uniform over 1..=10 and the
/// label is `fatigue_target` plus gaussian noise, rounded to 2 decimals and
/// clamped to [0,100].
pub struct FatigueSynthesizer {
    rng: StdRng,
    noise_std: f64,
}

impl FatigueSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise_std: DEFAULT_NOISE_STD,
        }
    }

    pub fn with_noise_std(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std.max(0.0);
        self
    }

    // Box-Muller; 1 - u keeps the log argument in (0, 1].
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn next_row(&mut self) -> FatigueRow {
        let speed = self.rng.gen_range(1..=10u8);
        let strength = self.rng.gen_range(1..=10u8);
        let stamina = self.rng.gen_range(1..=10u8);
        let noise = self.noise_std * self.gaussian();
        let fatigue = fatigue_target(speed as f64, strength as f64, stamina as f64) + noise;
        FatigueRow {
            speed,
            strength,
            stamina,
            fatigue: round_to(fatigue, 2).clamp(0.0, 100.0),
        }
    }

    pub fn rows(&mut self, n: usize) -> Vec<FatigueRow> {
        (0..n).map(|_| self.next_row()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_rows() {
        let a = FatigueSynthesizer::new(42).rows(50);
        let b = FatigueSynthesizer::new(42).rows(50);
        assert_eq!(a, b);
        assert_ne!(a, FatigueSynthesizer::new(7).rows(50));
    }

    #[test]
    fn test_rows_stay_in_bounds() {
        for row in FatigueSynthesizer::new(1).with_noise_std(40.0).rows(500) {
            assert!((1..=10).contains(&row.speed));
            assert!((1..=10).contains(&row.strength));
            assert!((1..=10).contains(&row.stamina));
            assert!((0.0..=100.0).contains(&row.fatigue));
            assert_eq!(round_to(row.fatigue, 2), row.fatigue);
        }
    }

    #[test]
    fn test_noiseless_rows_match_target() {
        for row in FatigueSynthesizer::new(3).with_noise_std(0.0).rows(20) {
            let t = fatigue_target(row.speed as f64, row.strength as f64, row.stamina as f64);
            assert!((row.fatigue - round_to(t, 2)).abs() < 1e-9);
        }
        assert!((fatigue_target(8.0, 6.0, 7.0) - 30.0).abs() < 1e-9);
    }
}
