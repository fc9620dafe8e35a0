use crate::config::PreprocessConfig;
use crate::error::{FringeError, Result};
use crate::series::MeasurementSeries;
use crate::signal_processing::math::{argmax, interp_linear, linspace};

/// Center a raw scan on its brightest sample, crop, normalize and resample
///
/// 1. shift positions so the intensity maximum sits at `x = 0`
/// 2. keep samples with `|x| <= half_width`
/// 3. divide by the maximum intensity
/// 4. linearly interpolate onto `num_points` uniform positions spanning the
///    kept samples
///
/// # Errors
/// - `FringeError::Config` for mismatched lengths, non-finite samples,
///   positions that are not strictly increasing, fewer than two samples left
///   after cropping, or `num_points < 2`.
/// - `FringeError::DegenerateInput` if the maximum intensity is not positive.
pub fn normalize_and_resample(
    x: &[f64],
    intensity: &[f64],
    num_points: usize,
    half_width: f64,
) -> Result<MeasurementSeries> {
    if x.len() != intensity.len() {
        return Err(FringeError::Config(format!(
            "raw scan lengths differ: {} positions, {} intensities",
            x.len(),
            intensity.len()
        )));
    }
    if num_points < 2 {
        return Err(FringeError::Config(format!(
            "resampling needs at least 2 points, got {}",
            num_points
        )));
    }
    if x.iter().chain(intensity.iter()).any(|v| !v.is_finite()) {
        return Err(FringeError::Config(
            "raw scan contains non-finite values".to_string(),
        ));
    }
    if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
        return Err(FringeError::Config(format!(
            "raw positions must be strictly increasing (index {}: {} then {})",
            i,
            x[i],
            x[i + 1]
        )));
    }

    let peak = argmax(intensity)
        .ok_or_else(|| FringeError::Config("raw scan is empty".to_string()))?;
    let center = x[peak];
    let max = intensity[peak];
    if max <= 0.0 {
        return Err(FringeError::DegenerateInput(format!(
            "maximum intensity {} is not positive",
            max
        )));
    }

    let (kept_x, kept_i): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(intensity.iter())
        .map(|(&x, &i)| (x - center, i / max))
        .filter(|(x, _)| x.abs() <= half_width)
        .unzip();

    if kept_x.len() < 2 {
        return Err(FringeError::Config(format!(
            "only {} samples within ±{} m of the peak",
            kept_x.len(),
            half_width
        )));
    }

    let grid = linspace(kept_x[0], kept_x[kept_x.len() - 1], num_points);
    let resampled = grid
        .iter()
        .map(|&g| interp_linear(&kept_x, &kept_i, g))
        .collect();

    log::debug!(
        "Preprocessed {} raw samples: peak at {:.6} m, {} kept, resampled to {}",
        x.len(),
        center,
        kept_x.len(),
        num_points
    );

    MeasurementSeries::new(grid, resampled)
}

/// [`normalize_and_resample`] with the configured point count and window
pub fn preprocess(x: &[f64], intensity: &[f64], config: &PreprocessConfig) -> Result<MeasurementSeries> {
    normalize_and_resample(x, intensity, config.num_points, config.half_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centers_crops_and_normalizes() {
        // Triangle peaking at x = 0.012 with height 4
        let x: Vec<f64> = (0..=100).map(|i| i as f64 * 0.001 - 0.038).collect();
        let intensity: Vec<f64> = x
            .iter()
            .map(|&x| (4.0 - 100.0 * (x - 0.012).abs()).max(0.0))
            .collect();

        let series = normalize_and_resample(&x, &intensity, 51, 0.0205).unwrap();
        assert_eq!(series.len(), 51);
        assert_relative_eq!(series.x()[0], -0.02, epsilon = 1e-12);
        assert_relative_eq!(series.x()[50], 0.02, epsilon = 1e-12);

        let peak = argmax(series.intensity()).unwrap();
        assert_eq!(peak, 25);
        assert_relative_eq!(series.intensity()[25], 1.0, epsilon = 1e-12);
        assert!(series.intensity().iter().all(|&v| v <= 1.0 + 1e-12));
    }

    #[test]
    fn test_interpolates_between_samples() {
        let x = [-0.002, -0.001, 0.0, 0.001, 0.002];
        let intensity = [0.0, 1.0, 2.0, 1.0, 0.0];
        let series = normalize_and_resample(&x, &intensity, 9, 0.04).unwrap();
        // Midway between -0.001 (0.5 normalized) and 0.0 (1.0)
        assert_relative_eq!(series.intensity()[3], 0.75, epsilon = 1e-12);
        assert_relative_eq!(series.intensity()[4], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_maximum_is_degenerate() {
        let x = [0.0, 0.001, 0.002];
        let result = normalize_and_resample(&x, &[-1.0, -0.5, -2.0], 10, 0.04);
        assert!(matches!(result, Err(FringeError::DegenerateInput(_))));
    }

    #[test]
    fn test_unsorted_positions_rejected() {
        let result = normalize_and_resample(&[0.0, 0.002, 0.001], &[1.0, 2.0, 1.0], 10, 0.04);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_window_too_narrow_rejected() {
        let x = [0.0, 0.01, 0.02];
        let result = normalize_and_resample(&x, &[0.5, 1.0, 0.5], 10, 0.001);
        assert!(matches!(result, Err(FringeError::Config(_))));
    }
}
