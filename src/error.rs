//! Error types for the head pose signal library.
//!
//! Warm-up ("not enough samples yet") is deliberately absent from this enum:
//! estimators report it as `None` from `estimate_current`.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The gaze ray points away from the screen plane
    #[error("Gaze direction does not intersect with screen plane")]
    NoGazeIntersection,

    /// A geometric computation hit a (near-)singular configuration
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Configuration error (zero-length windows, mismatched cardinalities, ...)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Estimator construction or lookup error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the caller can simply skip this frame and try again with the next one.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoGazeIntersection | Self::DegenerateGeometry(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
