use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{FringeError, Result};

#[derive(Clone, Debug, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    /// Standard deviation of additive intensity noise, relative to the peak
    pub intensity_std: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: None,
            intensity_std: 0.01,
        }
    }
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_intensity_std(mut self, std: f64) -> Self {
        self.intensity_std = std;
        self
    }
}

pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

fn normal(std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std)
        .map_err(|e| FringeError::Config(format!("invalid noise level {}: {}", std, e)))
}

/// Add zero-mean Gaussian noise with standard deviation `std` in place
pub fn add_gaussian_noise(signal: &mut [f64], std: f64, rng: &mut ChaCha8Rng) -> Result<()> {
    if std == 0.0 {
        return Ok(());
    }
    let normal = normal(std)?;
    for sample in signal.iter_mut() {
        *sample += normal.sample(rng);
    }
    Ok(())
}

/// Points on `value = slope·step + intercept` with Gaussian noise on both axes
///
/// Returns the perturbed `(steps, values)`.
pub fn synthetic_line(
    steps: &[f64],
    slope: f64,
    intercept: f64,
    step_std: f64,
    value_std: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut values: Vec<f64> = steps.iter().map(|&s| slope * s + intercept).collect();
    let mut noisy_steps = steps.to_vec();
    add_gaussian_noise(&mut noisy_steps, step_std, rng)?;
    add_gaussian_noise(&mut values, value_std, rng)?;
    Ok((noisy_steps, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = vec![0.0; 32];
        let mut b = vec![0.0; 32];
        add_gaussian_noise(&mut a, 0.1, &mut create_rng(Some(7))).unwrap();
        add_gaussian_noise(&mut b, 0.1, &mut create_rng(Some(7))).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_noise_level() {
        let mut signal = vec![0.0; 20_000];
        add_gaussian_noise(&mut signal, 0.5, &mut create_rng(Some(1))).unwrap();
        let var = signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64;
        assert!((var.sqrt() - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_negative_std_rejected() {
        let mut signal = vec![0.0; 4];
        let result = add_gaussian_noise(&mut signal, -1.0, &mut create_rng(Some(1)));
        assert!(matches!(result, Err(FringeError::Config(_))));
    }
}
