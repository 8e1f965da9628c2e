use super::SignalEstimator;
use crate::{
    constants::{DEFAULT_KALMAN_INITIAL_COVARIANCE, DEFAULT_KALMAN_MEASUREMENT_NOISE, DEFAULT_KALMAN_PROCESS_GAIN},
    Error, Result,
};
use nalgebra::{Matrix3, RowVector3, Vector3};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Noise settings for the constant-acceleration Kalman filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanParams {
    /// Variance of a position measurement
    pub measurement_noise: f64,
    /// Diagonal of the initial state covariance
    pub initial_covariance: f64,
    /// Scale applied to the dt-dependent process noise
    pub process_gain: f64,
}

impl KalmanParams {
    pub const DEFAULT: Self = Self {
        measurement_noise: DEFAULT_KALMAN_MEASUREMENT_NOISE,
        initial_covariance: DEFAULT_KALMAN_INITIAL_COVARIANCE,
        process_gain: DEFAULT_KALMAN_PROCESS_GAIN,
    };

    /// Check every noise term is finite and in range
    fn validate(&self) -> Result<()> {
        if !(self.measurement_noise.is_finite() && self.measurement_noise > 0.0) {
            return Err(Error::ConfigError(format!(
                "Kalman measurement noise must be positive, got {}",
                self.measurement_noise
            )));
        }
        if !(self.initial_covariance.is_finite() && self.initial_covariance >= 0.0) {
            return Err(Error::ConfigError(format!(
                "Kalman initial covariance must be non-negative, got {}",
                self.initial_covariance
            )));
        }
        if !(self.process_gain.is_finite() && self.process_gain >= 0.0) {
            return Err(Error::ConfigError(format!(
                "Kalman process gain must be non-negative, got {}",
                self.process_gain
            )));
        }
        Ok(())
    }
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// 1-D constant-acceleration Kalman filter over (position, velocity, acceleration)
///
/// The time step is the wall-clock gap between successive appends. The very
/// first append has no gap and predicts with identity transition and identity
/// process noise.
#[derive(Debug, Clone)]
pub struct KalmanPositionEstimator {
    params: KalmanParams,
    state: Vector3<f64>,
    covariance: Matrix3<f64>,
    last_measurement_time: Option<Instant>,
    estimated: Option<Vector3<f64>>,
}

impl KalmanPositionEstimator {
    /// Create a new Kalman position estimator
    ///
    /// # Errors
    ///
    /// Returns an error if any noise parameter is out of range
    pub fn new(params: KalmanParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: Vector3::zeros(),
            covariance: Matrix3::identity() * params.initial_covariance,
            last_measurement_time: None,
            estimated: None,
        })
    }

    /// State transition for a constant-acceleration model over `dt` seconds
    #[must_use]
    pub fn transition(dt: f64) -> Matrix3<f64> {
        Matrix3::new(
            1.0, dt, 0.5 * dt * dt,
            0.0, 1.0, dt,
            0.0, 0.0, 1.0,
        )
    }

    /// Process noise for a constant-acceleration model over `dt` seconds, before gain
    #[must_use]
    pub fn process_noise(dt: f64) -> Matrix3<f64> {
        Matrix3::new(
            dt.powi(6) / 9.0, dt.powi(5) / 6.0, dt.powi(4) / 3.0,
            dt.powi(5) / 6.0, dt.powi(4) / 4.0, dt.powi(3) / 2.0,
            dt.powi(4) / 3.0, dt.powi(3) / 2.0, dt,
        )
    }

    /// Feed a measurement (or `None` for a dropped frame) taken at `timestamp`
    pub fn append_at(&mut self, measurement: Option<f64>, timestamp: Instant) {
        let (transition, process_noise) = match self.last_measurement_time {
            Some(previous) => {
                let dt = timestamp.saturating_duration_since(previous).as_secs_f64();
                (Self::transition(dt), Self::process_noise(dt) * self.params.process_gain)
            }
            None => (Matrix3::identity(), Matrix3::identity()),
        };
        self.last_measurement_time = Some(timestamp);

        self.predict(&transition, &process_noise);
        if let Some(x) = measurement {
            self.correct(x);
        }
        self.estimated = Some(self.state);
        log::trace!(
            "Kalman velocity {:.4}, acceleration {:.4}",
            self.state[1],
            self.state[2]
        );
    }

    /// Propagate state and covariance one step through the motion model
    fn predict(&mut self, transition: &Matrix3<f64>, process_noise: &Matrix3<f64>) {
        // Predict state
        self.state = transition * self.state;

        // Predict covariance
        self.covariance = transition * self.covariance * transition.transpose() + process_noise;
    }

    /// Fold a position measurement into the predicted state
    ///
    /// The observation model is `H = [1 0 0]`, so the innovation covariance is a
    /// scalar and the gain is the first covariance column scaled by its inverse.
    fn correct(&mut self, measurement: f64) {
        // Only position is observed
        let observation = RowVector3::new(1.0, 0.0, 0.0);

        // Innovation
        let innovation = measurement - self.state[0];

        // Innovation covariance
        let innovation_cov = self.covariance[(0, 0)] + self.params.measurement_noise;

        // Kalman gain
        let gain: Vector3<f64> = self.covariance.column(0) / innovation_cov;

        // Update state
        self.state += gain * innovation;

        // Update covariance
        self.covariance = (Matrix3::identity() - gain * observation) * self.covariance;
    }

    /// Filtered velocity, once at least one sample has been appended
    #[must_use]
    pub fn velocity(&self) -> Option<f64> {
        self.estimated.map(|s| s[1])
    }

    /// Filtered acceleration, once at least one sample has been appended
    #[must_use]
    pub fn acceleration(&self) -> Option<f64> {
        self.estimated.map(|s| s[2])
    }
}

impl SignalEstimator for KalmanPositionEstimator {
    fn append(&mut self, sample: f64) {
        self.append_at(Some(sample), Instant::now());
    }

    fn estimate_current(&self) -> Option<f64> {
        self.estimated.map(|s| s[0])
    }

    fn reset(&mut self) {
        self.state = Vector3::zeros();
        self.covariance = Matrix3::identity() * self.params.initial_covariance;
        self.last_measurement_time = None;
        self.estimated = None;
    }

    fn name(&self) -> &str {
        "KalmanPositionEstimator"
    }
}

/// Thresholds for the stationary layer on top of the Kalman filter
///
/// Entry requires both velocity and acceleration below their `to_stationary`
/// bounds; exit happens when position drift, velocity or acceleration exceed
/// their `from_stationary` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanThresholds {
    pub position_from_stationary: f64,
    pub velocity_from_stationary: f64,
    pub acceleration_from_stationary: f64,
    pub velocity_to_stationary: f64,
    pub acceleration_to_stationary: f64,
}

impl KalmanThresholds {
    pub const DEFAULT: Self = Self {
        position_from_stationary: 5.0,
        velocity_from_stationary: 5.0,
        acceleration_from_stationary: 8.0,
        velocity_to_stationary: 5.0,
        acceleration_to_stationary: 5.0,
    };
}

impl Default for KalmanThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Kalman filter with a velocity/acceleration driven stationary state
#[derive(Debug, Clone)]
pub struct ThresholdKalmanEstimator {
    kalman: KalmanPositionEstimator,
    thresholds: KalmanThresholds,
    stationary_value: Option<f64>,
}

impl ThresholdKalmanEstimator {
    /// Create a new thresholded Kalman estimator
    ///
    /// # Errors
    ///
    /// Returns an error if the Kalman parameters are out of range
    pub fn new(params: KalmanParams, thresholds: KalmanThresholds) -> Result<Self> {
        Ok(Self {
            kalman: KalmanPositionEstimator::new(params)?,
            thresholds,
            stationary_value: None,
        })
    }

    /// Feed a measurement (or `None` for a dropped frame) taken at `timestamp`
    pub fn append_at(&mut self, measurement: Option<f64>, timestamp: Instant) {
        self.kalman.append_at(measurement, timestamp);
        let Some(state) = self.kalman.estimated else {
            return;
        };
        let abs_velocity = state[1].abs();
        let abs_acceleration = state[2].abs();

        match self.stationary_value {
            None => {
                if abs_velocity < self.thresholds.velocity_to_stationary
                    && abs_acceleration < self.thresholds.acceleration_to_stationary
                {
                    log::debug!("Kalman stationary at {:.4}", state[0]);
                    self.stationary_value = Some(state[0]);
                }
            }
            Some(frozen) => {
                let abs_position = (state[0] - frozen).abs();
                if abs_position > self.thresholds.position_from_stationary
                    || abs_velocity > self.thresholds.velocity_from_stationary
                    || abs_acceleration > self.thresholds.acceleration_from_stationary
                {
                    log::debug!("Kalman released from {frozen:.4}");
                    self.stationary_value = None;
                }
            }
        }
    }

    /// Whether the output is currently frozen at a stationary value
    #[must_use]
    pub const fn is_stationary(&self) -> bool {
        self.stationary_value.is_some()
    }

    /// Underlying Kalman filter
    #[must_use]
    pub const fn kalman(&self) -> &KalmanPositionEstimator {
        &self.kalman
    }
}

impl SignalEstimator for ThresholdKalmanEstimator {
    fn append(&mut self, sample: f64) {
        self.append_at(Some(sample), Instant::now());
    }

    fn estimate_current(&self) -> Option<f64> {
        self.stationary_value.or_else(|| self.kalman.estimate_current())
    }

    fn reset(&mut self) {
        self.kalman.reset();
        self.stationary_value = None;
    }

    fn name(&self) -> &str {
        "ThresholdKalmanEstimator"
    }
}
