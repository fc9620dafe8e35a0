//! Configuration for the fringe analysis pipeline.
//!
//! All tuned constants live here with their defaults. A TOML file only needs
//! to name the values it overrides:
//!
//! ```toml
//! [pipeline.spectral]
//! carrier_range = { low = 800.0, high = 1200.0 }
//!
//! [pipeline.filter]
//! width_factor = 0.25
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::apparatus::ExperimentConfig;
use crate::error::{FringeError, Result};

/// Half-open angular wavenumber interval `[low, high)` in rad/m
///
/// # Parsing formats
/// - `0-500` - low and high separated by a dash
/// - `900..1100` - Rust range syntax (needed when a bound is negative)
///
/// # Example
/// ```
/// use fringefit::config::WavenumberRange;
///
/// let range: WavenumberRange = "900-1100".parse().unwrap();
/// assert!(range.contains(900.0));
/// assert!(!range.contains(1100.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WavenumberRange {
    pub low: f64,
    pub high: f64,
}

impl WavenumberRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, k: f64) -> bool {
        k >= self.low && k < self.high
    }

    pub fn overlaps(&self, other: &WavenumberRange) -> bool {
        self.low < other.high && other.low < self.high
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low >= self.high {
            return Err(FringeError::Config(format!(
                "{} range {} is empty or not finite",
                name, self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for WavenumberRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) rad/m", self.low, self.high)
    }
}

impl FromStr for WavenumberRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        let (low, high) = s
            .split_once("..")
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| format!("invalid range: {} (expected low-high)", s))?;

        let low: f64 = low
            .trim()
            .parse()
            .map_err(|_| format!("invalid range start: {}", s))?;
        let high: f64 = high
            .trim()
            .parse()
            .map_err(|_| format!("invalid range end: {}", s))?;

        if low >= high {
            return Err("range start must be below range end".to_string());
        }
        Ok(Self { low, high })
    }
}

/// Top-level configuration: signal pipeline plus experiment description
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FringeConfig {
    pub pipeline: PipelineConfig,
    pub experiment: ExperimentConfig,
}

impl FringeConfig {
    /// Load a TOML file on top of the defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FringeConfig =
            toml::from_str(content).map_err(|e| FringeError::ConfigFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.experiment.validate()
    }
}

/// Signal pipeline configuration
///
/// Use `PipelineConfig::default()` for the values tuned to the reference
/// He-Ne setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resampling of raw measurements
    pub preprocess: PreprocessConfig,
    /// Wavenumber search windows
    pub spectral: SpectralConfig,
    /// Dual Gaussian band-pass
    pub filter: FilterConfig,
    /// Five-parameter fringe model fit
    pub fit: FitConfig,
    /// Errors-in-variables trend regression
    pub regression: RegressionConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.spectral.validate()?;
        self.filter.validate()?;
        self.fit.solver.validate()?;
        self.regression.solver.validate()
    }
}

/// Preprocessing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Number of points of the uniform output grid
    pub num_points: usize,
    /// Half-width in meters of the window kept around the intensity peak
    pub half_width: f64,
}

impl PreprocessConfig {
    fn validate(&self) -> Result<()> {
        if self.num_points < 2 {
            return Err(FringeError::Config(format!(
                "preprocess.num_points must be at least 2, got {}",
                self.num_points
            )));
        }
        if !(self.half_width.is_finite() && self.half_width > 0.0) {
            return Err(FringeError::Config(format!(
                "preprocess.half_width must be positive, got {}",
                self.half_width
            )));
        }
        Ok(())
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            num_points: 500,
            half_width: 0.04,
        }
    }
}

/// Spectral peak search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Search window for the envelope wavenumber
    pub envelope_range: WavenumberRange,
    /// Search window for the carrier wavenumber
    pub carrier_range: WavenumberRange,
}

impl SpectralConfig {
    pub fn validate(&self) -> Result<()> {
        self.envelope_range.validate("envelope")?;
        self.carrier_range.validate("carrier")?;
        if self.envelope_range.overlaps(&self.carrier_range) {
            return Err(FringeError::Config(format!(
                "envelope range {} overlaps carrier range {}",
                self.envelope_range, self.carrier_range
            )));
        }
        Ok(())
    }
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            envelope_range: WavenumberRange::new(0.0, 500.0),
            carrier_range: WavenumberRange::new(900.0, 1100.0),
        }
    }
}

/// Band-pass reconstruction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Gaussian width as a fraction of the estimated wavenumber
    pub width_factor: f64,
}

impl FilterConfig {
    fn validate(&self) -> Result<()> {
        if !(self.width_factor.is_finite() && self.width_factor > 0.0) {
            return Err(FringeError::Config(format!(
                "filter.width_factor must be positive, got {}",
                self.width_factor
            )));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { width_factor: 0.3 }
    }
}

/// Fringe model fit configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Initial guess for both Gaussian amplitudes `B` and `C`
    pub amplitude_guess: f64,
    /// Initial `D` as a multiple of the estimated envelope wavenumber
    pub lower_width_multiplier: f64,
    pub solver: SolverConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            amplitude_guess: 1.0,
            lower_width_multiplier: 2.0,
            solver: SolverConfig::default(),
        }
    }
}

/// Trend regression configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub initial_slope: f64,
    pub initial_intercept: f64,
    pub solver: SolverConfig,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            initial_slope: 1.0,
            initial_intercept: 0.0,
            solver: SolverConfig::default(),
        }
    }
}

/// Levenberg-Marquardt termination settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Outer iteration budget
    pub max_iterations: usize,
    /// Relative cost reduction below which the fit is converged
    pub ftol: f64,
    /// Relative step size below which the fit is converged
    pub xtol: f64,
    /// Cosine between residuals and Jacobian columns below which the fit is converged
    pub gtol: f64,
    /// Starting damping factor
    pub initial_damping: f64,
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(FringeError::Config(
                "solver.max_iterations must be positive".to_string(),
            ));
        }
        let tolerances = [self.ftol, self.xtol, self.gtol, self.initial_damping];
        if tolerances.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(FringeError::Config(
                "solver tolerances must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavenumber_range_dash() {
        let range: WavenumberRange = "0-500".parse().unwrap();
        assert_eq!(range, WavenumberRange::new(0.0, 500.0));
    }

    #[test]
    fn test_wavenumber_range_dots() {
        let range: WavenumberRange = "-20..40.5".parse().unwrap();
        assert_eq!(range, WavenumberRange::new(-20.0, 40.5));
    }

    #[test]
    fn test_wavenumber_range_invalid() {
        assert!("abc".parse::<WavenumberRange>().is_err());
        assert!("500-100".parse::<WavenumberRange>().is_err());
        assert!("100".parse::<WavenumberRange>().is_err());
    }

    #[test]
    fn test_wavenumber_range_half_open() {
        let range = WavenumberRange::new(900.0, 1100.0);
        assert!(range.contains(900.0));
        assert!(range.contains(1099.9));
        assert!(!range.contains(1100.0));
        assert!(!range.contains(899.9));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FringeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let spectral = SpectralConfig {
            envelope_range: WavenumberRange::new(0.0, 950.0),
            carrier_range: WavenumberRange::new(900.0, 1100.0),
        };
        assert!(matches!(spectral.validate(), Err(FringeError::Config(_))));
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config = FringeConfig::from_toml_str(
            r#"
            [pipeline.filter]
            width_factor = 0.25

            [pipeline.spectral]
            carrier_range = { low = 800.0, high = 1200.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.filter.width_factor, 0.25);
        assert_eq!(
            config.pipeline.spectral.carrier_range,
            WavenumberRange::new(800.0, 1200.0)
        );
        assert_eq!(
            config.pipeline.spectral.envelope_range,
            WavenumberRange::new(0.0, 500.0)
        );
        assert_eq!(config.pipeline.preprocess.num_points, 500);
    }

    #[test]
    fn test_invalid_toml_reported() {
        let result = FringeConfig::from_toml_str("[pipeline.filter]\nwidth_factor = -1.0\n");
        assert!(matches!(result, Err(FringeError::Config(_))));

        let result = FringeConfig::from_toml_str("not toml at all = = =");
        assert!(matches!(result, Err(FringeError::ConfigFile(_))));
    }
}
