//! Configuration for filter banks, stereo geometry and screen mapping
//!
//! Estimator settings are plain data ([`EstimatorConfig`]) turned into live
//! estimators with [`EstimatorConfig::build`]. The defaults used by the head
//! pose and landmark banks are named `const` presets, so no instance ever shares
//! mutable default state with another.

use crate::{
    calibration::HeadPoseCalibration,
    constants::{MONITOR_HEIGHT_CM, MONITOR_WIDTH_CM, NUM_FACIAL_LANDMARKS, SCREEN_HEIGHT_PX, SCREEN_WIDTH_PX},
    filters::{
        smoothing::{gaussian_window, half_gaussian_window},
        Estimation, KalmanParams, KalmanPositionEstimator, KalmanThresholds, RansacParams, SignalEstimator,
        SlidingWindowEstimator, Smoothing, StationaryHysteresisEstimator, ThresholdKalmanEstimator,
    },
    head_pose::HeadPoseParameter,
    pose_estimation::ReflectionMode,
    screen::ScreenGeometry,
    Error, Result,
};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape of a fixed weight vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum KernelSpec {
    /// Symmetric Gaussian, normalized
    Gaussian { length: usize, std_dev: f64 },
    /// Rising half of a Gaussian, normalized
    HalfGaussian { length: usize, std_dev: f64 },
    /// Weights used as given
    Explicit { weights: Vec<f64> },
}

impl KernelSpec {
    /// Materialize the kernel weights
    ///
    /// # Errors
    ///
    /// Returns an error for empty kernels or non-positive deviations
    pub fn weights(&self) -> Result<Vec<f64>> {
        match self {
            Self::Gaussian { length, std_dev } => gaussian_window(*length, *std_dev),
            Self::HalfGaussian { length, std_dev } => half_gaussian_window(*length, *std_dev),
            Self::Explicit { weights } if weights.is_empty() => {
                Err(Error::ConfigError("Explicit kernel must not be empty".to_string()))
            }
            Self::Explicit { weights } => Ok(weights.clone()),
        }
    }
}

/// Smoothing step applied before estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SmoothingConfig {
    None,
    Median { kernel_size: usize },
    Convolve { kernel: KernelSpec },
}

impl SmoothingConfig {
    fn build(&self) -> Result<Smoothing> {
        Ok(match self {
            Self::None => Smoothing::None,
            Self::Median { kernel_size } => Smoothing::Median {
                kernel_size: *kernel_size,
            },
            Self::Convolve { kernel } => Smoothing::Convolve {
                kernel: kernel.weights()?,
            },
        })
    }
}

/// Estimation step that reads the current value out of a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EstimationConfig {
    Raw,
    Mean,
    Median,
    Polynomial { degree: usize },
    Kernel(KernelSpec),
    RansacLinear(RansacParams),
}

impl EstimationConfig {
    fn build(&self) -> Result<Estimation> {
        Ok(match self {
            Self::Raw => Estimation::Raw,
            Self::Mean => Estimation::Mean,
            Self::Median => Estimation::Median,
            Self::Polynomial { degree } => Estimation::Polynomial { degree: *degree },
            Self::Kernel(spec) => Estimation::Kernel {
                weights: spec.weights()?,
            },
            Self::RansacLinear(params) => Estimation::RansacLinear(*params),
        })
    }
}

/// Stationary band on top of a sliding window estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationaryConfig {
    pub window_size: usize,
    pub threshold: f64,
    pub debounce_count: usize,
    pub smoothing: SmoothingConfig,
    pub estimation: EstimationConfig,
}

impl StationaryConfig {
    /// Window of 8, zero band, Gaussian(7, 2.0) smoothing and a quartic fit
    pub const DEFAULT: Self = Self {
        window_size: 8,
        threshold: 0.0,
        debounce_count: 3,
        smoothing: SmoothingConfig::Convolve {
            kernel: KernelSpec::Gaussian { length: 7, std_dev: 2.0 },
        },
        estimation: EstimationConfig::Polynomial { degree: 4 },
    };
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Any of the scalar estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorConfig {
    SlidingWindow {
        window_size: usize,
        smoothing: SmoothingConfig,
        estimation: EstimationConfig,
    },
    Stationary(StationaryConfig),
    Kalman(KalmanParams),
    ThresholdKalman {
        params: KalmanParams,
        thresholds: KalmanThresholds,
    },
}

impl EstimatorConfig {
    /// Construct a fresh estimator from this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the window, kernels or noise parameters are invalid
    pub fn build(&self) -> Result<Box<dyn SignalEstimator>> {
        Ok(match self {
            Self::SlidingWindow {
                window_size,
                smoothing,
                estimation,
            } => Box::new(SlidingWindowEstimator::new(
                *window_size,
                smoothing.build()?,
                estimation.build()?,
            )?),
            Self::Stationary(config) => {
                let base = SlidingWindowEstimator::new(
                    config.window_size,
                    config.smoothing.build()?,
                    config.estimation.build()?,
                )?;
                Box::new(StationaryHysteresisEstimator::new(
                    base,
                    config.threshold,
                    config.debounce_count,
                )?)
            }
            Self::Kalman(params) => Box::new(KalmanPositionEstimator::new(*params)?),
            Self::ThresholdKalman { params, thresholds } => {
                Box::new(ThresholdKalmanEstimator::new(*params, *thresholds)?)
            }
        })
    }
}

/// Yaw and roll: window of 10, half-degree band, debounce of 4
pub const ANGLE_PRESET: EstimatorConfig = EstimatorConfig::Stationary(StationaryConfig {
    window_size: 10,
    threshold: 0.5,
    debounce_count: 4,
    ..StationaryConfig::DEFAULT
});

/// Pitch: like [`ANGLE_PRESET`] with a one-degree band
pub const PITCH_PRESET: EstimatorConfig = EstimatorConfig::Stationary(StationaryConfig {
    window_size: 10,
    threshold: 1.0,
    debounce_count: 4,
    ..StationaryConfig::DEFAULT
});

/// Lateral and vertical head position
pub const POSITION_PRESET: EstimatorConfig = EstimatorConfig::Stationary(StationaryConfig {
    threshold: 0.005,
    ..StationaryConfig::DEFAULT
});

/// Head depth
pub const DEPTH_PRESET: EstimatorConfig = EstimatorConfig::Stationary(StationaryConfig::DEFAULT);

/// Per-axis landmark smoothing: causal half-Gaussian over 20 samples
pub const LANDMARK_PRESET: EstimatorConfig = EstimatorConfig::SlidingWindow {
    window_size: 20,
    smoothing: SmoothingConfig::None,
    estimation: EstimationConfig::Kernel(KernelSpec::HalfGaussian {
        length: 20,
        std_dev: 10.0,
    }),
};

/// Plain constant-acceleration Kalman filter
pub const KALMAN_PRESET: EstimatorConfig = EstimatorConfig::Kalman(KalmanParams::DEFAULT);

/// Kalman filter with velocity/acceleration hysteresis
pub const THRESHOLD_KALMAN_PRESET: EstimatorConfig = EstimatorConfig::ThresholdKalman {
    params: KalmanParams::DEFAULT,
    thresholds: KalmanThresholds::DEFAULT,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-parameter head pose filters
    pub head_pose: HeadPoseFilterConfig,

    /// Landmark filters
    pub landmarks: LandmarkFilterConfig,

    /// Stereo rig geometry
    pub stereo: StereoConfig,

    /// Physical screen geometry
    pub screen: ScreenConfig,

    /// Reference pose for the monocular screen transform
    pub reference_pose: HeadPoseCalibration,
}

/// One estimator configuration per head pose parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseFilterConfig {
    pub yaw: EstimatorConfig,
    pub pitch: EstimatorConfig,
    pub roll: EstimatorConfig,
    pub x: EstimatorConfig,
    pub y: EstimatorConfig,
    pub z: EstimatorConfig,
}

impl HeadPoseFilterConfig {
    /// Estimator configuration for one parameter
    #[must_use]
    pub const fn get(&self, parameter: HeadPoseParameter) -> &EstimatorConfig {
        match parameter {
            HeadPoseParameter::Yaw => &self.yaw,
            HeadPoseParameter::Pitch => &self.pitch,
            HeadPoseParameter::Roll => &self.roll,
            HeadPoseParameter::X => &self.x,
            HeadPoseParameter::Y => &self.y,
            HeadPoseParameter::Z => &self.z,
        }
    }
}

impl Default for HeadPoseFilterConfig {
    fn default() -> Self {
        Self {
            yaw: ANGLE_PRESET,
            pitch: PITCH_PRESET,
            roll: ANGLE_PRESET,
            x: POSITION_PRESET,
            y: POSITION_PRESET,
            z: DEPTH_PRESET,
        }
    }
}

/// Landmark filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkFilterConfig {
    /// Number of landmarks per face
    pub num_keypoints: usize,

    /// Estimator applied to each image axis of each landmark
    pub image_estimator: EstimatorConfig,

    /// Estimator applied to each axis of each triangulated point
    pub point_estimator: EstimatorConfig,
}

impl Default for LandmarkFilterConfig {
    fn default() -> Self {
        Self {
            num_keypoints: NUM_FACIAL_LANDMARKS,
            image_estimator: LANDMARK_PRESET,
            point_estimator: LANDMARK_PRESET,
        }
    }
}

/// Stereo rig configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoConfig {
    /// Lateral distance from the first camera to the second (positive = to its right)
    pub baseline: f64,

    /// Intrinsic matrix of the first camera, row-major
    pub intrinsics_left: [[f64; 3]; 3],

    /// Intrinsic matrix of the second camera, row-major
    pub intrinsics_right: [[f64; 3]; 3],

    /// Gauss-Newton refinement steps after the linear triangulation
    pub refinement_iterations: usize,

    /// How improper rotations from the SVD are handled
    pub reflection: ReflectionMode,

    /// Screen point the user looks at during calibration, camera-relative
    pub initial_gaze: [f64; 2],
}

impl StereoConfig {
    #[must_use]
    pub fn left_intrinsics(&self) -> Matrix3<f64> {
        row_major(&self.intrinsics_left)
    }

    #[must_use]
    pub fn right_intrinsics(&self) -> Matrix3<f64> {
        row_major(&self.intrinsics_right)
    }
}

fn row_major(rows: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| rows[r][c])
}

impl Default for StereoConfig {
    fn default() -> Self {
        let intrinsics = [[0.5, 0.0, 0.0], [0.0, 0.4, 0.0], [0.0, 0.0, 1.0]];
        Self {
            baseline: 1.0,
            intrinsics_left: intrinsics,
            intrinsics_right: intrinsics,
            refinement_iterations: 0,
            reflection: ReflectionMode::Literal,
            initial_gaze: [0.0, 0.0],
        }
    }
}

/// Physical monitor geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub monitor_width_cm: f64,
    pub monitor_height_cm: f64,
    pub screen_width_px: f64,
    pub screen_height_px: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            monitor_width_cm: MONITOR_WIDTH_CM,
            monitor_height_cm: MONITOR_HEIGHT_CM,
            screen_width_px: SCREEN_WIDTH_PX,
            screen_height_px: SCREEN_HEIGHT_PX,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found
    pub fn validate(&self) -> Result<()> {
        // Every estimator must be constructible
        for parameter in HeadPoseParameter::ALL {
            self.head_pose.get(parameter).build()?;
        }
        self.landmarks.image_estimator.build()?;
        self.landmarks.point_estimator.build()?;
        if self.landmarks.num_keypoints == 0 {
            return Err(Error::ConfigError(
                "Number of keypoints must be greater than 0".to_string(),
            ));
        }

        if !self.stereo.baseline.is_finite() || self.stereo.baseline == 0.0 {
            return Err(Error::ConfigError(
                "Stereo baseline must be finite and non-zero".to_string(),
            ));
        }
        for (name, k) in [
            ("left", self.stereo.left_intrinsics()),
            ("right", self.stereo.right_intrinsics()),
        ] {
            if k.try_inverse().is_none() {
                return Err(Error::ConfigError(format!("The {name} intrinsic matrix is singular")));
            }
        }

        ScreenGeometry::new(&self.screen)?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head pose signal configuration

# Per-parameter head pose filters
head_pose:
  yaw:
    type: stationary
    window_size: 10
    threshold: 0.5
    debounce_count: 4
    smoothing:
      mode: convolve
      kernel:
        shape: gaussian
        length: 7
        std_dev: 2.0
    estimation:
      mode: polynomial
      degree: 4
  pitch:
    type: threshold_kalman
    params:
      measurement_noise: 10.0
      initial_covariance: 4.0
      process_gain: 1000.0
    thresholds:
      position_from_stationary: 5.0
      velocity_from_stationary: 5.0
      acceleration_from_stationary: 8.0
      velocity_to_stationary: 5.0
      acceleration_to_stationary: 5.0
  z:
    type: sliding_window
    window_size: 10
    smoothing:
      mode: median
      kernel_size: 3
    estimation:
      mode: ransac_linear
      trials: 100

# Landmark filters
landmarks:
  num_keypoints: 68
  image_estimator:
    type: sliding_window
    window_size: 20
    smoothing:
      mode: none
    estimation:
      mode: kernel
      shape: half_gaussian
      length: 20
      std_dev: 10.0

# Stereo rig
stereo:
  baseline: 1.0
  intrinsics_left: [[0.5, 0.0, 0.0], [0.0, 0.4, 0.0], [0.0, 0.0, 1.0]]
  intrinsics_right: [[0.5, 0.0, 0.0], [0.0, 0.4, 0.0], [0.0, 0.0, 1.0]]
  refinement_iterations: 0
  reflection: literal
  initial_gaze: [0.0, 0.0]

# Screen geometry
screen:
  monitor_width_cm: 53.0
  monitor_height_cm: 29.8
  screen_width_px: 1920.0
  screen_height_px: 1080.0

# Reference pose for the monocular transform
reference_pose:
  pitch: 0.0
  yaw: 0.0
  roll: 0.0
  x: -0.13
  y: -0.2
  z: 1.3
"#;
