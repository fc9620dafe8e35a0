pub mod apparatus;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod fitting;
pub mod output;
pub mod preprocess;
pub mod processing;
pub mod series;
pub mod signal_processing;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::{FringeConfig, PipelineConfig};
pub use error::{FringeError, Result};
pub use processing::{analyze_trends, process_channel, process_channels, process_dataset};
pub use series::MeasurementSeries;
