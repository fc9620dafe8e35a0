pub mod bandpass;
pub mod math;
pub mod spectrum;

pub use bandpass::{DualGaussianBandpass, FilteredSignal, reconstruct, symmetrize};
pub use spectrum::{FrequencySpectrum, WavenumberEstimate, compute_spectrum, estimate_wavenumbers};
