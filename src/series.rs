use serde::Serialize;

use crate::constants::SPACING_RELATIVE_TOLERANCE;
use crate::error::{FringeError, Result};

/// Intensity profile sampled on a uniform position grid
///
/// Positions are in meters, intensities dimensionless. Construction checks
/// that both sequences have the same length (at least two samples) and that
/// the spacing is constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSeries {
    x: Vec<f64>,
    intensity: Vec<f64>,
}

impl MeasurementSeries {
    pub fn new(x: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if x.len() != intensity.len() {
            return Err(FringeError::Config(format!(
                "position and intensity lengths differ: {} vs {}",
                x.len(),
                intensity.len()
            )));
        }
        if x.len() < 2 {
            return Err(FringeError::Config(format!(
                "a series needs at least 2 samples, got {}",
                x.len()
            )));
        }
        if x.iter().chain(intensity.iter()).any(|v| !v.is_finite()) {
            return Err(FringeError::Config(
                "series contains non-finite values".to_string(),
            ));
        }

        let n = x.len();
        let dx = (x[n - 1] - x[0]) / (n - 1) as f64;
        if dx <= 0.0 {
            return Err(FringeError::Config(
                "positions must be strictly increasing".to_string(),
            ));
        }
        let tolerance = dx * SPACING_RELATIVE_TOLERANCE;
        if let Some(i) = x
            .windows(2)
            .position(|w| ((w[1] - w[0]) - dx).abs() > tolerance)
        {
            return Err(FringeError::Config(format!(
                "positions are not uniformly spaced (step {} at index {}, expected {})",
                x[i + 1] - x[i],
                i,
                dx
            )));
        }

        Ok(Self { x, intensity })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Mean sample spacing
    pub fn spacing(&self) -> f64 {
        let n = self.x.len();
        (self.x[n - 1] - self.x[0]) / (n - 1) as f64
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::math::linspace;

    #[test]
    fn test_uniform_series_accepted() {
        let x = linspace(-0.04, 0.04, 500);
        let intensity = vec![0.5; 500];
        let series = MeasurementSeries::new(x, intensity).unwrap();
        assert_eq!(series.len(), 500);
        assert!((series.spacing() - 0.08 / 499.0).abs() < 1e-15);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = MeasurementSeries::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0]);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_single_sample_rejected() {
        let result = MeasurementSeries::new(vec![0.0], vec![1.0]);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_non_uniform_rejected() {
        let result = MeasurementSeries::new(vec![0.0, 1.0, 3.0], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_decreasing_rejected() {
        let result = MeasurementSeries::new(vec![2.0, 1.0, 0.0], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }
}
