//! Command-line pipelines: streaming head pose filtering and a synthetic stereo
//! round trip.

use crate::{
    calibration::HeadPoseCalibration,
    config::{Config, HeadPoseFilterConfig},
    head_pose::{HeadPose, HeadPoseFilterBank, SCREEN_MULTIPLIERS},
    pose_estimation::{centroid, Pose, RigidPoseEstimator},
    stereo::StereoTriangulator,
    Error, Result,
};
use log::{info, warn};
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{BufRead, Write};

/// How input rows are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Rows already in `yaw pitch roll x y z` convention
    Pose,
    /// Raw tracker rows that still need the tracker remap
    Tracker,
}

/// Settings for [`FilterApp`]
#[derive(Debug, Clone)]
pub struct FilterAppConfig {
    pub filters: HeadPoseFilterConfig,
    pub input: InputFormat,
    /// Screen point to push through the monocular transform for every row
    pub screen_point: Option<(f64, f64)>,
    pub reference: HeadPoseCalibration,
}

impl FilterAppConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            filters: config.head_pose.clone(),
            input: InputFormat::Pose,
            screen_point: None,
            reference: config.reference_pose,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub rows: usize,
    pub published: usize,
    pub skipped: usize,
}

/// Streams rows of head pose samples through a filter bank
pub struct FilterApp {
    bank: HeadPoseFilterBank,
    config: FilterAppConfig,
    stats: RunStats,
}

impl FilterApp {
    /// # Errors
    ///
    /// Returns an error if the filter configuration is invalid
    pub fn new(config: FilterAppConfig) -> Result<Self> {
        info!("Initializing filter pipeline ({:?} input)", config.input);
        Ok(Self {
            bank: HeadPoseFilterBank::new(&config.filters)?,
            config,
            stats: RunStats::default(),
        })
    }

    #[must_use]
    pub const fn stats(&self) -> RunStats {
        self.stats
    }

    /// Process one input line; `Ok(None)` for blank lines, comments and warm-up
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed rows
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let parsed = HeadPose::parse_row(line)?;
        self.stats.rows += 1;

        let filtered = match self.config.input {
            InputFormat::Pose => self.bank.update(&parsed)?,
            InputFormat::Tracker => self.bank.update_from_tracker(&parsed)?,
        };
        let Some(pose) = filtered else {
            return Ok(None);
        };

        let Some((screen_x, screen_y)) = self.config.screen_point else {
            self.stats.published += 1;
            return Ok(Some(pose.to_string()));
        };

        match self
            .config
            .reference
            .transform(screen_x, screen_y, &pose.scaled(&SCREEN_MULTIPLIERS))
        {
            Ok((x, y)) => {
                self.stats.published += 1;
                Ok(Some(format!("{pose} {x:.4} {y:.4}")))
            }
            Err(e) if e.is_recoverable() => {
                warn!("Skipping row {}: {e}", self.stats.rows);
                self.stats.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run until the input is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or the first malformed row
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<RunStats> {
        info!("Starting filter loop");
        for line in input.lines() {
            if let Some(row) = self.process_line(&line?)? {
                writeln!(output, "{row}")?;
            }
        }
        output.flush()?;
        if let Some(rate) = self.bank.update_rate() {
            info!("Average update rate: {rate:.1} rows/s");
        }
        info!(
            "Processed {} rows, published {}, skipped {}",
            self.stats.rows, self.stats.published, self.stats.skipped
        );
        Ok(self.stats)
    }
}

/// Result of a synthetic triangulation, pose and gaze round trip
#[derive(Debug, Clone, PartialEq)]
pub struct StereoCheckReport {
    /// Largest distance between a model point and its triangulation
    pub max_triangulation_error: f64,
    /// Frobenius norm of the rotation error
    pub rotation_error: f64,
    pub translation_error: f64,
    /// Recovered rotation as Euler angles in degrees
    pub euler_angles: Vector3<f64>,
    /// Gaze point for the recovered pose, `None` if the ray misses the screen
    pub gaze: Option<Point2<f64>>,
}

/// Reference landmark layout for the synthetic check
#[must_use]
pub fn synthetic_model() -> Vec<Point3<f64>> {
    vec![
        Point3::new(1.0, 1.0, 2.0),
        Point3::new(-1.0, -1.0, 2.0),
        Point3::new(0.4, 0.6, 1.5),
        Point3::new(-0.4, -0.6, 1.5),
        Point3::new(0.8, -0.3, 1.0),
        Point3::new(-0.8, 0.3, 1.0),
    ]
}

/// Rotate and shift the synthetic model, project it into the configured rig
/// with uniform noise of amplitude `noise`, and recover everything again
///
/// # Errors
///
/// Returns an error for invalid stereo settings or unrecoverable geometry
pub fn run_stereo_check(config: &Config, noise: f64, seed: u64) -> Result<StereoCheckReport> {
    if !(noise.is_finite() && noise >= 0.0) {
        return Err(Error::InvalidInput(format!("Noise amplitude must be non-negative, got {noise}")));
    }
    let stereo = &config.stereo;
    let triangulator = StereoTriangulator::new(&stereo.left_intrinsics(), &stereo.right_intrinsics(), stereo.baseline)?
        .with_iterations(stereo.refinement_iterations);

    let model = synthetic_model();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut perturb = |pairs: Vec<[Point2<f64>; 2]>| -> Vec<[Point2<f64>; 2]> {
        if noise == 0.0 {
            return pairs;
        }
        pairs
            .into_iter()
            .map(|pair| pair.map(|p| Point2::new(p.x + rng.gen_range(-noise..=noise), p.y + rng.gen_range(-noise..=noise))))
            .collect()
    };

    let reference_observations = perturb(triangulator.map_3d_model(&model)?);
    let triangulated = triangulator.compute_3d_model(&reference_observations)?;
    let max_triangulation_error = model
        .iter()
        .zip(&triangulated)
        .map(|(m, t)| (m - t).norm())
        .fold(0.0, f64::max);

    let estimator = RigidPoseEstimator::new(
        triangulator.clone(),
        model.clone(),
        Vector2::new(stereo.initial_gaze[0], stereo.initial_gaze[1]),
    )?
    .with_reflection_mode(stereo.reflection);

    let angle: f64 = 0.4;
    let (s, c) = angle.sin_cos();
    let truth = Pose {
        rotation: Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
        translation: Vector3::new(1.0, 2.0, 3.0),
    };
    let moved = truth.transform_model(&model);
    let observations = perturb(triangulator.map_3d_model(&moved)?);
    let pose = estimator.compute_rt(&observations)?;

    let gaze = match estimator.gaze_from_pose(&pose) {
        Ok(point) => Some(point),
        Err(Error::NoGazeIntersection) => {
            warn!("Gaze ray does not reach the screen");
            None
        }
        Err(e) => return Err(e),
    };

    if let Some(c) = centroid(&moved) {
        info!("Synthetic head centroid at ({:.3}, {:.3}, {:.3})", c.x, c.y, c.z);
    }

    Ok(StereoCheckReport {
        max_triangulation_error,
        rotation_error: (pose.rotation - truth.rotation).norm(),
        translation_error: (pose.translation - truth.translation).norm(),
        euler_angles: pose.euler_angles(),
        gaze,
    })
}
