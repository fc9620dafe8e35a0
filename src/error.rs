use thiserror::Error;

#[derive(Error, Debug)]
pub enum FringeError {
    /// Invalid configuration or malformed input shape (empty search range,
    /// mismatched lengths, too few points, invalid uncertainties).
    #[error("Configuration error: {0}")]
    Config(String),

    /// An iterative fit failed to reach a usable solution.
    #[error("Fit did not converge: {0}")]
    Convergence(String),

    /// Intensity data that cannot be normalized (zero, constant, non-positive peak).
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FringeError>;
