//! Constants used throughout the crate

/// Number of facial landmarks reported by the landmark tracker
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Default number of samples kept by the update-rate counter
pub const DEFAULT_FRAMERATE_WINDOW: usize = 20;

/// Offsets applied to raw tracker angles (degrees)
pub const TRACKER_YAW_OFFSET: f64 = -180.0;
pub const TRACKER_PITCH_OFFSET: f64 = -180.0;
pub const TRACKER_ROLL_OFFSET: f64 = 90.0;

/// Default RANSAC settings for the robust linear estimator
pub const DEFAULT_RANSAC_TRIALS: usize = 100;
pub const DEFAULT_RANSAC_SEED: u64 = 0x5eed_cafe;

/// Default Kalman filter parameters
pub const DEFAULT_KALMAN_MEASUREMENT_NOISE: f64 = 10.0;
pub const DEFAULT_KALMAN_INITIAL_COVARIANCE: f64 = 4.0;
pub const DEFAULT_KALMAN_PROCESS_GAIN: f64 = 1000.0;

/// Monitor geometry defaults (cm / px)
pub const MONITOR_WIDTH_CM: f64 = 53.0;
pub const MONITOR_HEIGHT_CM: f64 = 29.8;
pub const SCREEN_WIDTH_PX: f64 = 1920.0;
pub const SCREEN_HEIGHT_PX: f64 = 1080.0;

/// Below this magnitude a divisor is treated as zero
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Relative singular value ratio below which a matrix is treated as rank deficient
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Sweep limit for SVDs; non-finite input never converges
pub const SVD_MAX_ITERATIONS: usize = 1000;

/// Sine of the pitch angle beyond which Euler extraction is treated as gimbal locked
pub const GIMBAL_LOCK_THRESHOLD: f64 = 1e-6;
