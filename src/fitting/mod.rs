pub mod fringe_model;
pub mod least_squares;
pub mod linear_odr;
pub mod rounding;

pub use fringe_model::{FitResult, FringeParams, fit_fringe, fit_model, fringe_intensity};
pub use least_squares::{FitOutcome, LeastSquaresProblem, LevenbergMarquardt, Termination};
pub use linear_odr::{RegressionResult, linear_estimation};
pub use rounding::{round_result, round_results};
