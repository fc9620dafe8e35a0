//! Numeric constants for numerical stability
//!
//! Thresholds and epsilon values shared by the spectral, filtering and
//! fitting stages.

/// Relative tolerance on sample spacing when checking that a series is uniform.
pub const SPACING_RELATIVE_TOLERANCE: f64 = 1e-6;

/// Intensity span below which a series is considered constant.
pub const MIN_INTENSITY_SPAN: f64 = 1e-12;

/// Smallest diagonal entry used for Levenberg-Marquardt damping.
pub const MIN_DAMPING_DIAGONAL: f64 = 1e-300;

/// Damping factor at which the solver gives up looking for a downhill step.
pub const MAX_DAMPING: f64 = 1e16;

/// Damping factor floor after repeated successful steps.
pub const MIN_DAMPING: f64 = 1e-12;

/// Multiplier applied to the damping factor on a rejected (or accepted) step.
pub const DAMPING_STEP: f64 = 10.0;
