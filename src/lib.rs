//! Signal estimation and stereo geometry for head pose tracking.
//!
//! This library turns noisy per-frame tracker output into smooth, low-latency
//! control signals:
//! - Streaming scalar estimators (sliding windows, a stationary hysteresis band
//!   and a constant-acceleration Kalman filter)
//! - Filter banks that publish a parameter set only once every estimator is warm
//! - Two-camera triangulation and Kabsch pose recovery with gaze intersection
//! - A monocular screen transform and a two-phase calibration controller
//!
//! # Examples
//!
//! ## Filtering a scalar stream
//!
//! ```
//! use head_pose_signal::filters::{create_estimator, SignalEstimator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut filter = create_estimator("stationary:10:0.5:4")?;
//! for sample in [10.0, 10.1, 9.9, 10.0, 10.2, 9.8, 10.0, 10.1, 9.9, 10.0] {
//!     filter.append(sample);
//! }
//! if let Some(value) = filter.estimate_current() {
//!     println!("Filtered: {value:.2}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Head pose filter bank
//!
//! ```
//! use head_pose_signal::{config::HeadPoseFilterConfig, head_pose::{HeadPose, HeadPoseFilterBank}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut bank = HeadPoseFilterBank::new(&HeadPoseFilterConfig::default())?;
//! let sample = HeadPose { yaw: 5.0, pitch: -2.0, roll: 0.0, x: 0.1, y: 0.0, z: 1.2 };
//! // Nothing is published until every parameter has left warm-up
//! while bank.update(&sample)?.is_none() {}
//! # Ok(())
//! # }
//! ```
//!
//! ## Stereo pose and gaze
//!
//! ```
//! use head_pose_signal::{pose_estimation::RigidPoseEstimator, stereo::StereoTriangulator, Error};
//! use nalgebra::{Matrix3, Point3, Vector2, Vector3};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let k = Matrix3::from_diagonal(&Vector3::new(0.5, 0.4, 1.0));
//! let triangulator = StereoTriangulator::new(&k, &k, 1.0)?;
//! let model = vec![
//!     Point3::new(1.0, 1.0, 2.0),
//!     Point3::new(-1.0, -1.0, 2.0),
//!     Point3::new(0.8, -0.3, 1.0),
//!     Point3::new(-0.8, 0.3, 1.0),
//! ];
//! let observations = triangulator.map_3d_model(&model)?;
//! let estimator = RigidPoseEstimator::new(triangulator, model, Vector2::zeros())?;
//! match estimator.compute_gaze_location(&observations) {
//!     Ok(gaze) => println!("Looking at {:.2}, {:.2}", gaze.x, gaze.y),
//!     Err(Error::NoGazeIntersection) => println!("Looking away"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

/// Fixed-capacity circular buffer
pub mod ring_buffer;

/// Streaming scalar estimators
pub mod filters;

/// Banks of estimators updated in lockstep
pub mod filter_bank;

/// Head pose parameters, tracker remapping and the head pose bank
pub mod head_pose;

/// Two-camera triangulation
pub mod stereo;

/// Kabsch pose recovery and gaze intersection
pub mod pose_estimation;

/// Reference pose, monocular screen transform and calibration controller
pub mod calibration;

/// Monitor geometry
pub mod screen;

/// Update-rate meter
pub mod framerate;

/// Command-line pipelines
pub mod app;

/// Command-line arguments
pub mod cli;

/// Utility functions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
