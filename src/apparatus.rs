//! Optical apparatus description and step-parameter uncertainties.
//!
//! Each measurement channel is taken with the double slit a distance `y`
//! from the diffraction grating. The step parameter Δm is read from the
//! geometry, so its uncertainty follows from the slit dimensions and the
//! tolerance on `y`:
//!
//! ```text
//! σ_Δm = d / (g·λ·y²) · σ_y + a / (g·λ·y)
//! ```

use serde::Deserialize;

use crate::error::{FringeError, Result};
use crate::processing::{ChannelSpec, Regime};

/// Laser and grating constants shared by every channel
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApparatusConfig {
    /// Laser wavelength in meters
    pub wavelength: f64,
    /// Grating constant factor `g`
    pub grating_factor: f64,
    /// Tolerance on the grating-to-slit distance in meters
    pub distance_uncertainty: f64,
}

impl Default for ApparatusConfig {
    fn default() -> Self {
        Self {
            // He-Ne
            wavelength: 632.8e-9,
            grating_factor: 4000.0,
            distance_uncertainty: 2e-4,
        }
    }
}

/// Double slit used for one regime
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SlitGeometry {
    /// Slit separation `d` in meters
    pub separation: f64,
    /// Slit width `a` in meters
    pub width: f64,
}

/// One measured channel of the experiment
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSetup {
    /// Column label in the dataset (`x<label>` / `I<label>`)
    pub label: String,
    /// Step parameter Δm
    pub step: f64,
    /// Grating-to-slit distance `y` in meters
    pub distance: f64,
}

/// Channels sharing one slit geometry, regressed together
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeConfig {
    pub name: String,
    pub slit: SlitGeometry,
    pub channels: Vec<ChannelSetup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub apparatus: ApparatusConfig,
    pub regimes: Vec<RegimeConfig>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let channel = |label: &str, step: f64, distance: f64| ChannelSetup {
            label: label.to_string(),
            step,
            distance,
        };
        Self {
            apparatus: ApparatusConfig::default(),
            regimes: vec![
                RegimeConfig {
                    name: "small steps".to_string(),
                    slit: SlitGeometry {
                        separation: 4e-4,
                        width: 5e-5,
                    },
                    channels: vec![
                        channel("1", 1.0, 0.016),
                        channel("2", 2.0, 0.008),
                        channel("3", 3.0, 0.005),
                    ],
                },
                RegimeConfig {
                    name: "large steps".to_string(),
                    slit: SlitGeometry {
                        separation: 1.25e-3,
                        width: 0.75e-4,
                    },
                    channels: vec![
                        channel("50", 50.0, 0.010),
                        channel("100", 100.0, 0.005),
                        channel("200", 200.0, 0.002),
                    ],
                },
            ],
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        let a = &self.apparatus;
        if !(a.wavelength > 0.0 && a.grating_factor > 0.0 && a.distance_uncertainty >= 0.0) {
            return Err(FringeError::Config(
                "apparatus constants must be positive".to_string(),
            ));
        }
        let mut labels = std::collections::HashSet::new();
        for regime in &self.regimes {
            for channel in &regime.channels {
                if !(channel.distance.is_finite() && channel.distance > 0.0) {
                    return Err(FringeError::Config(format!(
                        "channel {}: distance must be positive, got {}",
                        channel.label, channel.distance
                    )));
                }
                if !labels.insert(channel.label.as_str()) {
                    return Err(FringeError::Config(format!(
                        "channel label {} used more than once",
                        channel.label
                    )));
                }
            }
        }
        Ok(())
    }

    /// All channels in declaration order with their step uncertainties
    pub fn channel_specs(&self) -> Vec<ChannelSpec> {
        self.regimes
            .iter()
            .flat_map(|regime| {
                regime.channels.iter().map(|channel| ChannelSpec {
                    id: channel.label.clone(),
                    step: channel.step,
                    step_uncertainty: step_uncertainty(&self.apparatus, &regime.slit, channel.distance),
                })
            })
            .collect()
    }

    pub fn regimes(&self) -> Vec<Regime> {
        self.regimes
            .iter()
            .map(|regime| Regime {
                name: regime.name.clone(),
                channel_ids: regime.channels.iter().map(|c| c.label.clone()).collect(),
            })
            .collect()
    }
}

/// Uncertainty of the step parameter for a channel at distance `distance`
pub fn step_uncertainty(apparatus: &ApparatusConfig, slit: &SlitGeometry, distance: f64) -> f64 {
    let g_lambda = apparatus.grating_factor * apparatus.wavelength;
    slit.separation / (g_lambda * distance * distance) * apparatus.distance_uncertainty
        + slit.width / (g_lambda * distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_uncertainty_reference_channel() {
        let apparatus = ApparatusConfig::default();
        let slit = SlitGeometry {
            separation: 4e-4,
            width: 5e-5,
        };
        // 4e-4 / (2.5312e-3 * 0.016^2) * 2e-4 + 5e-5 / (2.5312e-3 * 0.016)
        let expected = 0.123_459_23 + 1.234_592_29;
        assert_relative_eq!(
            step_uncertainty(&apparatus, &slit, 0.016),
            expected,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_closer_slit_has_larger_uncertainty() {
        let apparatus = ApparatusConfig::default();
        let slit = SlitGeometry {
            separation: 1.25e-3,
            width: 0.75e-4,
        };
        let far = step_uncertainty(&apparatus, &slit, 0.010);
        let near = step_uncertainty(&apparatus, &slit, 0.002);
        assert!(near > far);
    }

    #[test]
    fn test_default_channel_specs() {
        let experiment = ExperimentConfig::default();
        let specs = experiment.channel_specs();
        let steps: Vec<f64> = specs.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![1.0, 2.0, 3.0, 50.0, 100.0, 200.0]);
        assert!(specs.iter().all(|s| s.step_uncertainty > 0.0));

        let regimes = experiment.regimes();
        assert_eq!(regimes.len(), 2);
        assert_eq!(regimes[1].channel_ids, vec!["50", "100", "200"]);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let mut experiment = ExperimentConfig::default();
        experiment.regimes[1].channels[0].label = "1".to_string();
        assert!(matches!(experiment.validate(), Err(FringeError::Config(_))));
    }
}
