//! Streaming scalar estimators for smoothing noisy tracker output.
//!
//! Every estimator consumes one raw sample per tick through
//! [`SignalEstimator::append`] and reports its current estimate, or `None`
//! while it is still warming up.

/// Fixed-window estimators with pluggable smoothing and estimation
pub mod sliding_window;

/// Stationary band with debounce on top of a sliding window
pub mod stationary;

/// Constant-acceleration Kalman filter and its thresholded variant
pub mod kalman;

/// Gaussian kernels, reflection padding and smoothing steps
pub mod smoothing;

/// Polynomial and RANSAC line fits over a window
pub mod regression;

use crate::{
    config::{EstimationConfig, EstimatorConfig, KernelSpec, SmoothingConfig, StationaryConfig},
    utils::safe_cast::f64_to_usize,
    Error, Result,
};

pub use kalman::{KalmanParams, KalmanPositionEstimator, KalmanThresholds, ThresholdKalmanEstimator};
pub use regression::RansacParams;
pub use sliding_window::{Estimation, SlidingWindowEstimator};
pub use smoothing::Smoothing;
pub use stationary::{StationaryHysteresisEstimator, StationaryState};

/// Trait for all scalar estimators
pub trait SignalEstimator: Send {
    /// Feed the next raw sample
    fn append(&mut self, sample: f64);

    /// Current estimate, `None` until enough samples have arrived
    fn estimate_current(&self) -> Option<f64>;

    /// Return to the freshly constructed state
    fn reset(&mut self);

    /// Get estimator name
    fn name(&self) -> &str;
}

/// Create an estimator from a short textual description
///
/// Accepted forms: `raw`, `mean:N`, `median:N`, `poly:N:DEGREE`,
/// `kernel:N:STD_DEV` (causal half-Gaussian weights), `ransac:N`,
/// `stationary:N:THRESHOLD:DEBOUNCE` (Gaussian-smoothed quartic base),
/// `kalman`, `threshold_kalman`.
///
/// # Errors
///
/// Returns `Error::FilterError` for unknown names or malformed arguments, and
/// the underlying configuration error when the arguments are out of range
pub fn create_estimator(spec: &str) -> Result<Box<dyn SignalEstimator>> {
    let lowered = spec.to_lowercase();
    let mut parts = lowered.split(':');
    let name = parts.next().unwrap_or_default();
    let args = parts
        .map(|arg| {
            arg.parse::<f64>()
                .map_err(|_| Error::FilterError(format!("Invalid argument '{arg}' in filter spec '{spec}'")))
        })
        .collect::<Result<Vec<f64>>>()?;

    let arg = |index: usize, default: f64| args.get(index).copied().unwrap_or(default);
    let count = |index: usize, default: usize| -> Result<usize> {
        args.get(index).map_or(Ok(default), |&v| {
            f64_to_usize(v).map_err(|_| Error::FilterError(format!("Window size must be a whole number, got {v}")))
        })
    };

    let config = match name {
        "raw" | "none" => EstimatorConfig::SlidingWindow {
            window_size: 1,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::Raw,
        },
        "mean" | "moving_average" => EstimatorConfig::SlidingWindow {
            window_size: count(0, 5)?,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::Mean,
        },
        "median" => EstimatorConfig::SlidingWindow {
            window_size: count(0, 5)?,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::Median,
        },
        "poly" | "polynomial" => EstimatorConfig::SlidingWindow {
            window_size: count(0, 8)?,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::Polynomial { degree: count(1, 3)? },
        },
        "kernel" => {
            let window_size = count(0, 20)?;
            EstimatorConfig::SlidingWindow {
                window_size,
                smoothing: SmoothingConfig::None,
                estimation: EstimationConfig::Kernel(KernelSpec::HalfGaussian {
                    length: window_size,
                    std_dev: arg(1, 10.0),
                }),
            }
        }
        "ransac" | "ransac_linear" => EstimatorConfig::SlidingWindow {
            window_size: count(0, 10)?,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::RansacLinear(RansacParams::DEFAULT),
        },
        "stationary" => EstimatorConfig::Stationary(StationaryConfig {
            window_size: count(0, 8)?,
            threshold: arg(1, 0.0),
            debounce_count: count(2, 3)?,
            ..StationaryConfig::DEFAULT
        }),
        "kalman" => EstimatorConfig::Kalman(KalmanParams::DEFAULT),
        "threshold_kalman" | "thresholdkalman" => EstimatorConfig::ThresholdKalman {
            params: KalmanParams::DEFAULT,
            thresholds: KalmanThresholds::DEFAULT,
        },
        _ => return Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    };

    config.build()
}
