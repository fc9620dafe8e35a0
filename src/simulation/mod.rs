//! Synthetic fringe scans and regression data for tests and demos

mod noise;
mod signal;

pub use noise::{NoiseConfig, add_gaussian_noise, create_rng, synthetic_line};
pub use signal::{ScanConfig, SyntheticExperiment, generate_experiment, generate_scan};
