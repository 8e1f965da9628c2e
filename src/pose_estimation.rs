use crate::{
    constants::{GEOMETRY_EPSILON, GIMBAL_LOCK_THRESHOLD, RANK_TOLERANCE, SVD_MAX_ITERATIONS},
    stereo::{ObservationPair, StereoTriangulator},
    utils::safe_cast::usize_to_f64,
    Error, Result,
};
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How an improper rotation (`det < 0`) out of the SVD is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionMode {
    /// Use `U·Vᵀ` as is, reflections included
    #[default]
    Literal,
    /// Flip the axis of the smallest singular value so that `det(R) = +1`
    Corrected,
}

/// Rigid transform from the reference model to the observed cloud
///
/// `rotation` acts about the model centroid and `translation` is the
/// displacement of that centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Pose {
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Apply the pose to a model: `R·(m - c) + c + T`
    #[must_use]
    pub fn transform_model(&self, model: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let Some(c) = centroid(model) else {
            return Vec::new();
        };
        model
            .iter()
            .map(|m| c + self.rotation * (m - c) + self.translation)
            .collect()
    }

    /// Rotation as Euler angles in degrees
    #[must_use]
    pub fn euler_angles(&self) -> Vector3<f64> {
        rotation_matrix_to_euler(&self.rotation)
    }
}

/// Euler angles `(x, y, z)` in degrees of a rotation matrix
///
/// Falls back to `z = 0` when the matrix is gimbal locked.
#[must_use]
pub fn rotation_matrix_to_euler(r: &Matrix3<f64>) -> Vector3<f64> {
    let sy = r[(0, 0)].hypot(r[(1, 0)]);

    let (x, y, z) = if sy < GIMBAL_LOCK_THRESHOLD {
        ((-r[(1, 2)]).atan2(r[(1, 1)]), (-r[(2, 0)]).atan2(sy), 0.0)
    } else {
        (
            r[(2, 1)].atan2(r[(2, 2)]),
            (-r[(2, 0)]).atan2(sy),
            r[(1, 0)].atan2(r[(0, 0)]),
        )
    };

    Vector3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Mean of a point set, `None` when empty
#[must_use]
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / usize_to_f64(points.len())))
}

/// Kabsch alignment of `model` onto `observed` (correspondence by index)
///
/// # Errors
///
/// Returns `ConfigError` when the clouds differ in size or hold fewer than three
/// points, and `DegenerateGeometry` when a coordinate is not finite or the
/// cross-covariance is rank deficient
pub fn kabsch(observed: &[Point3<f64>], model: &[Point3<f64>], mode: ReflectionMode) -> Result<Pose> {
    if observed.len() != model.len() {
        return Err(Error::ConfigError(format!(
            "Observed cloud has {} points but the model has {}",
            observed.len(),
            model.len()
        )));
    }
    let (Some(c_obs), Some(c_model)) = (centroid(observed), centroid(model)) else {
        return Err(Error::ConfigError("Pose recovery needs at least 3 points".to_string()));
    };
    if observed.len() < 3 {
        return Err(Error::ConfigError(format!(
            "Pose recovery needs at least 3 points, got {}",
            observed.len()
        )));
    }
    if observed.iter().chain(model).any(|p| !p.coords.iter().all(|c| c.is_finite())) {
        return Err(Error::DegenerateGeometry("Point clouds contain non-finite coordinates".to_string()));
    }

    let h: Matrix3<f64> = observed
        .iter()
        .zip(model)
        .map(|(o, m)| (o - c_obs) * (m - c_model).transpose())
        .sum();

    let svd = h
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| Error::DegenerateGeometry("SVD of the cross-covariance did not converge".to_string()))?;
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(Error::DegenerateGeometry("SVD of the cross-covariance failed".to_string()));
    };

    let mut sorted = svd.singular_values;
    sorted.as_mut_slice().sort_by(|a, b| b.total_cmp(a));
    if !(sorted[0] >= GEOMETRY_EPSILON && sorted[1] >= RANK_TOLERANCE * sorted[0]) {
        return Err(Error::DegenerateGeometry(format!(
            "Cross-covariance is rank deficient (singular values {:.3e}, {:.3e}, {:.3e})",
            sorted[0], sorted[1], sorted[2]
        )));
    }

    let mut rotation = u * v_t;
    if mode == ReflectionMode::Corrected && rotation.determinant() < 0.0 {
        let mut flip = Matrix3::identity();
        let smallest = svd.singular_values.imin();
        flip[(smallest, smallest)] = -1.0;
        rotation = u * flip * v_t;
    }

    Ok(Pose {
        rotation,
        translation: c_obs - c_model,
    })
}

/// RANSAC settings for pose recovery with outlying landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseRansacParams {
    /// Maximum distance between a transformed model point and its observation
    pub threshold: f64,
    /// Number of minimal three-point hypotheses
    pub iterations: usize,
    pub seed: u64,
}

impl Default for PoseRansacParams {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            iterations: 50,
            seed: 0,
        }
    }
}

/// Recovers the head pose from stereo landmark observations
pub struct RigidPoseEstimator {
    triangulator: StereoTriangulator,
    model: Vec<Point3<f64>>,
    model_centroid: Point3<f64>,
    initial_gaze: Vector2<f64>,
    reflection: ReflectionMode,
}

impl RigidPoseEstimator {
    /// Create an estimator around a reference model
    ///
    /// `initial_gaze` is the screen point, relative to the first camera, the user
    /// looked at while the model was captured.
    ///
    /// # Errors
    ///
    /// Returns an error if the model has fewer than 3 points
    pub fn new(triangulator: StereoTriangulator, model: Vec<Point3<f64>>, initial_gaze: Vector2<f64>) -> Result<Self> {
        let model_centroid = match centroid(&model) {
            Some(c) if model.len() >= 3 => c,
            _ => {
                return Err(Error::ConfigError(format!(
                    "Reference model needs at least 3 points, got {}",
                    model.len()
                )))
            }
        };
        log::info!("Initializing RigidPoseEstimator with {} model points", model.len());
        Ok(Self {
            triangulator,
            model,
            model_centroid,
            initial_gaze,
            reflection: ReflectionMode::default(),
        })
    }

    /// Capture the reference model from the current observations
    ///
    /// # Errors
    ///
    /// Returns an error if triangulation fails or too few points are observed
    pub fn from_observations(
        triangulator: StereoTriangulator,
        points: &[ObservationPair],
        initial_gaze: Vector2<f64>,
    ) -> Result<Self> {
        let model = triangulator.compute_3d_model(points)?;
        Self::new(triangulator, model, initial_gaze)
    }

    /// Load the reference model from a text file of whitespace-separated coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Vec<Point3<f64>>> {
        let content = fs::read_to_string(path)?;
        Self::parse_model_points(&content)
    }

    /// Parse model points, three coordinates per point
    fn parse_model_points(content: &str) -> Result<Vec<Point3<f64>>> {
        let values = content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidInput(format!("Invalid model coordinate '{token}'")))
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.is_empty() || values.len() % 3 != 0 {
            return Err(Error::InvalidInput(format!(
                "Expected a multiple of 3 coordinate values, got {}",
                values.len()
            )));
        }

        Ok(values.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2])).collect())
    }

    #[must_use]
    pub const fn with_reflection_mode(mut self, mode: ReflectionMode) -> Self {
        self.reflection = mode;
        self
    }

    #[must_use]
    pub fn model(&self) -> &[Point3<f64>] {
        &self.model
    }

    #[must_use]
    pub const fn model_centroid(&self) -> Point3<f64> {
        self.model_centroid
    }

    #[must_use]
    pub const fn triangulator(&self) -> &StereoTriangulator {
        &self.triangulator
    }

    /// Triangulate the observations and align the model to them
    ///
    /// # Errors
    ///
    /// Returns an error if triangulation fails, the cardinalities differ, or the
    /// cloud is degenerate
    pub fn compute_rt(&self, points: &[ObservationPair]) -> Result<Pose> {
        let points_3d = self.triangulator.compute_3d_model(points)?;
        self.compute_rt_from_points(&points_3d)
    }

    /// Align the model to an already triangulated cloud
    ///
    /// # Errors
    ///
    /// Returns an error if the cardinalities differ or the cloud is degenerate
    pub fn compute_rt_from_points(&self, points_3d: &[Point3<f64>]) -> Result<Pose> {
        kabsch(points_3d, &self.model, self.reflection)
    }

    /// Robust alignment that ignores landmarks farther than `threshold` from the
    /// best three-point hypothesis
    ///
    /// Returns the pose refitted on the consensus set and the inlier mask.
    ///
    /// # Errors
    ///
    /// Returns an error if the cardinalities differ, or no hypothesis is usable
    pub fn compute_rt_ransac(&self, points_3d: &[Point3<f64>], params: &PoseRansacParams) -> Result<(Pose, Vec<bool>)> {
        if points_3d.len() != self.model.len() {
            return Err(Error::ConfigError(format!(
                "Observed cloud has {} points but the model has {}",
                points_3d.len(),
                self.model.len()
            )));
        }
        let n = points_3d.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<Vec<bool>> = None;
        let mut best_count = 0;

        for _ in 0..params.iterations {
            let sample = rand::seq::index::sample(&mut rng, n, 3);
            let observed: Vec<_> = sample.iter().map(|i| points_3d[i]).collect();
            let model: Vec<_> = sample.iter().map(|i| self.model[i]).collect();
            // Three centered points are coplanar, so only a proper rotation is meaningful
            let Ok(candidate) = kabsch(&observed, &model, ReflectionMode::Corrected) else {
                continue;
            };
            let (Some(c_obs), Some(c_model)) = (centroid(&observed), centroid(&model)) else {
                continue;
            };

            let inliers: Vec<bool> = points_3d
                .iter()
                .zip(&self.model)
                .map(|(o, m)| {
                    let predicted = c_obs + candidate.rotation * (m - c_model);
                    (predicted - o).norm() <= params.threshold
                })
                .collect();
            let count = inliers.iter().filter(|&&inlier| inlier).count();
            if count > best_count {
                best_count = count;
                best = Some(inliers);
            }
        }

        let inliers = best
            .filter(|_| best_count >= 3)
            .ok_or_else(|| Error::DegenerateGeometry("RANSAC found no consensus set".to_string()))?;

        let observed: Vec<_> = points_3d.iter().zip(&inliers).filter(|&(_, &inlier)| inlier).map(|(p, _)| *p).collect();
        let model: Vec<_> = self.model.iter().zip(&inliers).filter(|&(_, &inlier)| inlier).map(|(p, _)| *p).collect();
        let refit = kabsch(&observed, &model, self.reflection)?;

        // Re-express the translation as the displacement of the full model centroid
        let (Some(c_obs), Some(c_model)) = (centroid(&observed), centroid(&model)) else {
            return Err(Error::DegenerateGeometry("Empty consensus set".to_string()));
        };
        let moved = c_obs + refit.rotation * (self.model_centroid - c_model);
        let pose = Pose {
            rotation: refit.rotation,
            translation: moved - self.model_centroid,
        };
        log::trace!("Pose RANSAC kept {best_count}/{n} landmarks");
        Ok((pose, inliers))
    }

    /// Screen point the user is looking at, relative to the first camera
    ///
    /// # Errors
    ///
    /// Returns `NoGazeIntersection` when the gaze ray points away from the
    /// screen plane, and the pose recovery errors otherwise
    pub fn compute_gaze_location(&self, points: &[ObservationPair]) -> Result<Point2<f64>> {
        let pose = self.compute_rt(points)?;
        self.gaze_from_pose(&pose)
    }

    /// Intersect the gaze ray of a pose with the screen plane `z = 0`
    ///
    /// # Errors
    ///
    /// Returns `NoGazeIntersection` when the ray points away from the screen and
    /// `DegenerateGeometry` when it runs parallel to it
    pub fn gaze_from_pose(&self, pose: &Pose) -> Result<Point2<f64>> {
        let base_gaze_dir = Vector3::new(self.initial_gaze.x, self.initial_gaze.y, 0.0) - self.model_centroid.coords;
        let gaze_dir = pose.rotation * base_gaze_dir;
        let new_centroid = self.model_centroid + pose.translation;

        if gaze_dir.z.abs() < GEOMETRY_EPSILON {
            return Err(Error::DegenerateGeometry(
                "Gaze direction is parallel to the screen plane".to_string(),
            ));
        }
        let theta = -new_centroid.z / gaze_dir.z;
        if theta < 0.0 {
            return Err(Error::NoGazeIntersection);
        }

        let intersection = new_centroid + gaze_dir * theta;
        Ok(Point2::new(intersection.x, intersection.y))
    }
}
