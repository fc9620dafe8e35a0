use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::Serialize;

use crate::config::{SpectralConfig, WavenumberRange};
use crate::error::{FringeError, Result};
use crate::signal_processing::math::{argmax, fft_wavenumbers};

/// Discrete spectrum of a real signal
///
/// Bins follow the standard DFT ordering (non-negative wavenumbers first,
/// then negative ones). For real input the magnitude is symmetric about
/// `k = 0`. The complex coefficients are kept so the band-pass stage can
/// filter without transforming again.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencySpectrum {
    /// Angular wavenumber of each bin in rad/m
    pub wavenumbers: Vec<f64>,
    /// `|X_k|` for each bin
    pub magnitude: Vec<f64>,
    #[serde(skip)]
    coefficients: Vec<Complex64>,
}

impl FrequencySpectrum {
    pub fn coefficients(&self) -> &[Complex64] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.wavenumbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumbers.is_empty()
    }

    /// Wavenumber spacing between adjacent bins
    pub fn bin_width(&self) -> f64 {
        (self.wavenumbers[1] - self.wavenumbers[0]).abs()
    }

    /// Wavenumber of the largest magnitude inside `range`
    ///
    /// # Errors
    /// Returns `FringeError::Config` if no bin falls inside the range.
    pub fn peak_in_range(&self, range: &WavenumberRange) -> Result<f64> {
        let (ks, mags): (Vec<f64>, Vec<f64>) = self
            .wavenumbers
            .iter()
            .zip(self.magnitude.iter())
            .filter(|(k, _)| range.contains(**k))
            .map(|(&k, &m)| (k, m))
            .unzip();

        let idx = argmax(&mags).ok_or_else(|| {
            FringeError::Config(format!(
                "no spectral samples inside {} (bin width {:.3} rad/m)",
                range,
                self.bin_width()
            ))
        })?;
        Ok(ks[idx])
    }
}

/// Envelope and carrier wavenumbers picked from the spectrum, in rad/m
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavenumberEstimate {
    /// Envelope wavenumber
    pub km: f64,
    /// Carrier wavenumber
    pub kc: f64,
}

/// Compute the spectrum of a mean-subtracted signal sampled every `dx` meters
///
/// # Errors
/// Returns `FringeError::Config` for fewer than two samples or a spacing that
/// is not finite and positive.
pub fn compute_spectrum(signal: &[f64], dx: f64) -> Result<FrequencySpectrum> {
    if signal.len() < 2 {
        return Err(FringeError::Config(format!(
            "spectrum needs at least 2 samples, got {}",
            signal.len()
        )));
    }
    if !(dx.is_finite() && dx > 0.0) {
        return Err(FringeError::Config(format!(
            "sample spacing must be positive, got {}",
            dx
        )));
    }

    let coefficients = forward_fft(signal);
    let magnitude = coefficients.iter().map(|c| c.norm()).collect();
    let wavenumbers = fft_wavenumbers(signal.len(), dx);

    Ok(FrequencySpectrum {
        wavenumbers,
        magnitude,
        coefficients,
    })
}

/// Locate the envelope and carrier peaks inside their search windows
///
/// # Errors
/// Returns `FringeError::Config` if either window is empty or not finite, if
/// the two windows overlap, or if a window holds no spectral bin.
pub fn estimate_wavenumbers(
    spectrum: &FrequencySpectrum,
    config: &SpectralConfig,
) -> Result<WavenumberEstimate> {
    config.validate()?;
    let km = spectrum.peak_in_range(&config.envelope_range)?;
    let kc = spectrum.peak_in_range(&config.carrier_range)?;
    log::debug!("Spectral peaks: km = {:.2} rad/m, kc = {:.2} rad/m", km, kc);
    Ok(WavenumberEstimate { km, kc })
}

pub(crate) fn forward_fft(signal: &[f64]) -> Vec<Complex64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(signal.len());
    let mut buf: Vec<Complex64> = signal.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft.process(&mut buf);
    buf
}

/// Inverse transform normalized by `1/N`
pub(crate) fn inverse_fft(coefficients: &[Complex64]) -> Vec<Complex64> {
    let n = coefficients.len();
    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(n);
    let mut buf = coefficients.to_vec();
    ifft.process(&mut buf);
    let scale = 1.0 / n as f64;
    for c in buf.iter_mut() {
        *c *= scale;
    }
    buf
}
