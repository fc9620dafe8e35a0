use rand_chacha::ChaCha8Rng;

use super::noise::{NoiseConfig, add_gaussian_noise, create_rng};
use crate::apparatus::ExperimentConfig;
use crate::dataset::RawScan;
use crate::error::Result;
use crate::fitting::{FringeParams, fringe_intensity};
use crate::signal_processing::math::linspace;

/// Sampling of one raw scan
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ScanConfig {
    pub x_start: f64,
    pub x_end: f64,
    pub num_samples: usize,
    /// Position of the central bright fringe on the scan axis
    pub peak_offset: f64,
    /// Detector reading at the central bright fringe
    pub peak_intensity: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            x_start: -0.05,
            x_end: 0.05,
            num_samples: 2001,
            peak_offset: 0.0,
            peak_intensity: 1.0,
        }
    }
}

/// Model parameters as a function of the step parameter
///
/// `km` and `kc` grow linearly with Δm from their values in `base`.
#[derive(Clone, Debug)]
pub struct SyntheticExperiment {
    pub base: FringeParams,
    pub km_per_step: f64,
    pub kc_per_step: f64,
}

impl Default for SyntheticExperiment {
    fn default() -> Self {
        Self {
            base: FringeParams {
                b: 1.0,
                c: 1.0,
                d: 200.0,
                km: 100.0,
                kc: 1000.0,
            },
            km_per_step: 0.0,
            kc_per_step: 0.0,
        }
    }
}

impl SyntheticExperiment {
    pub fn params_at(&self, step: f64) -> FringeParams {
        FringeParams {
            km: self.base.km + self.km_per_step * step,
            kc: self.base.kc + self.kc_per_step * step,
            ..self.base
        }
    }
}

/// One noisy scan of the fringe model
pub fn generate_scan(
    label: &str,
    params: &FringeParams,
    scan: &ScanConfig,
    noise_std: f64,
    rng: &mut ChaCha8Rng,
) -> Result<RawScan> {
    let x = linspace(scan.x_start, scan.x_end, scan.num_samples);
    let mut intensity: Vec<f64> = x
        .iter()
        .map(|&x| scan.peak_intensity * fringe_intensity(x - scan.peak_offset, params))
        .collect();
    add_gaussian_noise(&mut intensity, noise_std * scan.peak_intensity, rng)?;

    Ok(RawScan {
        label: label.to_string(),
        x,
        intensity,
    })
}

/// One scan per configured channel, in regime order
pub fn generate_experiment(
    experiment: &ExperimentConfig,
    model: &SyntheticExperiment,
    scan: &ScanConfig,
    noise: &NoiseConfig,
) -> Result<Vec<RawScan>> {
    let mut rng = create_rng(noise.seed);
    experiment
        .channel_specs()
        .iter()
        .map(|spec| {
            let params = model.params_at(spec.step);
            generate_scan(&spec.id, &params, scan, noise.intensity_std, &mut rng)
        })
        .collect()
}
