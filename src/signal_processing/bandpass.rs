use num_complex::Complex64;
use serde::Serialize;

use crate::config::FilterConfig;
use crate::error::{FringeError, Result};
use crate::signal_processing::math::argmax;
use crate::signal_processing::spectrum::{FrequencySpectrum, WavenumberEstimate, inverse_fft};

/// Band-pass reconstructed fringe profile
///
/// Positions are centered on the filtered peak and exactly antisymmetric
/// (`x[j] == -x[n-1-j]`); intensities are exactly even
/// (`intensity[j] == intensity[n-1-j]`) and peak-normalized to 1. The length
/// is always odd with the peak sample at `x = 0`.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredSignal {
    x: Vec<f64>,
    intensity: Vec<f64>,
    /// Position of the filtered peak on the input grid before re-centering
    pub center_offset: f64,
}

impl FilteredSignal {
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

    /// Largest `|x|` retained after symmetric truncation
    pub fn half_width(&self) -> f64 {
        self.x.last().copied().unwrap_or(0.0)
    }
}

/// Dual Gaussian frequency-domain filter
///
/// Passes four Gaussian bands centered at `±km` and `±kc`. Each band's width
/// is proportional to its center wavenumber.
#[derive(Debug, Clone, Copy)]
pub struct DualGaussianBandpass {
    km: f64,
    kc: f64,
    sigma_m: f64,
    sigma_c: f64,
}

impl DualGaussianBandpass {
    /// Build the filter around the estimated wavenumbers
    ///
    /// # Errors
    /// Returns `FringeError::Config` if either width would be zero or not
    /// finite (an estimate at `k = 0`, or a non-positive width factor).
    pub fn new(estimate: &WavenumberEstimate, config: &FilterConfig) -> Result<Self> {
        let sigma_m = config.width_factor * estimate.km.abs();
        let sigma_c = config.width_factor * estimate.kc.abs();

        for (name, sigma) in [("envelope", sigma_m), ("carrier", sigma_c)] {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(FringeError::Config(format!(
                    "{} band width must be positive, got {} (estimate {:?}, factor {})",
                    name, sigma, estimate, config.width_factor
                )));
            }
        }

        Ok(Self {
            km: estimate.km,
            kc: estimate.kc,
            sigma_m,
            sigma_c,
        })
    }

    /// Filter gain at wavenumber `k`
    pub fn weight(&self, k: f64) -> f64 {
        let bump = |center: f64, sigma: f64| {
            let z = (k - center) / sigma;
            (-0.5 * z * z).exp()
        };
        bump(self.km, self.sigma_m)
            + bump(-self.km, self.sigma_m)
            + bump(self.kc, self.sigma_c)
            + bump(-self.kc, self.sigma_c)
    }

    /// Weight the spectrum and transform back, keeping the real part
    pub fn apply(&self, spectrum: &FrequencySpectrum) -> Vec<f64> {
        let weighted: Vec<Complex64> = spectrum
            .coefficients()
            .iter()
            .zip(spectrum.wavenumbers.iter())
            .map(|(&c, &k)| c * self.weight(k))
            .collect();

        inverse_fft(&weighted).into_iter().map(|c| c.re).collect()
    }
}

/// Band-pass reconstruct a fringe profile
///
/// `spectrum` must come from the mean-subtracted intensity sampled at
/// `positions`; `baseline` is the mean that was removed.
pub fn reconstruct(
    positions: &[f64],
    baseline: f64,
    spectrum: &FrequencySpectrum,
    estimate: &WavenumberEstimate,
    config: &FilterConfig,
) -> Result<FilteredSignal> {
    if positions.len() != spectrum.len() {
        return Err(FringeError::Config(format!(
            "spectrum has {} bins for {} positions",
            spectrum.len(),
            positions.len()
        )));
    }

    let filter = DualGaussianBandpass::new(estimate, config)?;
    let mut filtered = filter.apply(spectrum);
    for v in filtered.iter_mut() {
        *v += baseline;
    }

    symmetrize(positions, &filtered)
}

/// Re-center on the peak, truncate symmetrically, impose even symmetry and
/// normalize the peak to 1
///
/// Truncation keeps `half = min(peak, n - 1 - peak)` samples on each side of
/// the peak, which is the index form of keeping `|x| <= min(|x_first|, |x_last|)`.
/// Positions are rebuilt as `j·dx` so they mirror exactly.
///
/// # Errors
/// Returns `FringeError::DegenerateInput` when the peak sits on the edge of
/// the domain or the peak value is not positive.
pub fn symmetrize(positions: &[f64], values: &[f64]) -> Result<FilteredSignal> {
    let n = values.len();
    if positions.len() != n || n < 3 {
        return Err(FringeError::Config(format!(
            "cannot symmetrize {} values on {} positions",
            n,
            positions.len()
        )));
    }

    let peak = argmax(values).ok_or_else(|| {
        FringeError::DegenerateInput("filtered signal has no finite values".to_string())
    })?;
    let half = peak.min(n - 1 - peak);
    if half == 0 {
        return Err(FringeError::DegenerateInput(format!(
            "filtered peak at domain edge (index {} of {})",
            peak, n
        )));
    }

    let dx = (positions[n - 1] - positions[0]) / (n - 1) as f64;
    let mut kept = values[peak - half..=peak + half].to_vec();
    let m = kept.len();
    for j in 0..half {
        let avg = 0.5 * (kept[j] + kept[m - 1 - j]);
        kept[j] = avg;
        kept[m - 1 - j] = avg;
    }

    let max = kept.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return Err(FringeError::DegenerateInput(format!(
            "filtered peak value {} cannot be normalized",
            max
        )));
    }
    for v in kept.iter_mut() {
        *v /= max;
    }

    let half = half as i64;
    let x = (-half..=half).map(|j| j as f64 * dx).collect();

    log::debug!(
        "Symmetrized {} of {} samples around x = {:.6} m",
        m,
        n,
        positions[peak]
    );

    Ok(FilteredSignal {
        x,
        intensity: kept,
        center_offset: positions[peak],
    })
}
