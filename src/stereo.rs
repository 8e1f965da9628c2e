//! Two-camera triangulation for a parallel stereo rig
//!
//! Coordinates follow the camera convention: `+x` to the right of the first
//! camera, `+y` downward and `+z` away from the cameras. The first camera sits at
//! the origin and the second is shifted along `+x` by the baseline.

use crate::{
    constants::{GEOMETRY_EPSILON, SVD_MAX_ITERATIONS},
    Error, Result,
};
use nalgebra::{Matrix3, Matrix3x4, Matrix4, Matrix4x3, Point2, Point3, Vector3, Vector4};

/// Projective `3×4` matrix of one camera
pub type CameraMatrix = Matrix3x4<f64>;

/// Image observations of one point, indexed by camera
pub type ObservationPair = [Point2<f64>; 2];

/// Build the camera matrices of two parallel cameras
///
/// The first camera is `[K1 | 0]`. The second is `K1 · [I | -baseline·e_x]`:
/// both cameras are assumed to share the first camera's intrinsics, so `_k2` is
/// accepted for symmetry only.
#[must_use]
pub fn make_parallel_camera_matrices(k1: &Matrix3<f64>, _k2: &Matrix3<f64>, baseline: f64) -> [CameraMatrix; 2] {
    let mut first = CameraMatrix::zeros();
    first.fixed_view_mut::<3, 3>(0, 0).copy_from(k1);

    let mut extrinsics = CameraMatrix::identity();
    extrinsics[(0, 3)] = -baseline;
    let second = k1 * extrinsics;

    [first, second]
}

fn project(camera: &CameraMatrix, point: &Point3<f64>) -> Result<Point2<f64>> {
    let image = camera * point.to_homogeneous();
    if image.z.abs() < GEOMETRY_EPSILON {
        return Err(Error::DegenerateGeometry(format!(
            "Point {point} projects onto the camera plane"
        )));
    }
    Ok(Point2::new(image.x / image.z, image.y / image.z))
}

/// Linear (DLT) triangulation of one point
///
/// Stacks the two projection equations of each camera into a `4×4` homogeneous
/// system and takes the right singular vector of the smallest singular value.
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the solution lies at infinity or the
/// decomposition fails
pub fn linear_estimate_3d_point(observations: &ObservationPair, cameras: &[CameraMatrix; 2]) -> Result<Point3<f64>> {
    let mut a = Matrix4::<f64>::zeros();
    for (i, (point, camera)) in observations.iter().zip(cameras).enumerate() {
        a.set_row(2 * i, &(point.x * camera.row(2) - camera.row(0)));
        a.set_row(2 * i + 1, &(point.y * camera.row(2) - camera.row(1)));
    }

    let svd = a
        .try_svd(false, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| Error::DegenerateGeometry("SVD did not converge during triangulation".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::DegenerateGeometry("SVD failed during triangulation".to_string()))?;
    // Singular values are not guaranteed to be sorted
    let smallest = svd.singular_values.imin();
    let solution = v_t.row(smallest);

    let w = solution[3];
    if w.abs() < GEOMETRY_EPSILON {
        return Err(Error::DegenerateGeometry(
            "Triangulated point lies at infinity".to_string(),
        ));
    }
    Ok(Point3::new(solution[0] / w, solution[1] / w, solution[2] / w))
}

/// Stacked reprojection residuals `(u1, v1, u2, v2)` of a point against its observations
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the point projects onto a camera plane
pub fn reprojection_error(
    point: &Point3<f64>,
    observations: &ObservationPair,
    cameras: &[CameraMatrix; 2],
) -> Result<Vector4<f64>> {
    let mut error = Vector4::zeros();
    for (i, (observed, camera)) in observations.iter().zip(cameras).enumerate() {
        let projected = project(camera, point)?;
        error[2 * i] = projected.x - observed.x;
        error[2 * i + 1] = projected.y - observed.y;
    }
    Ok(error)
}

/// Analytic Jacobian of the stacked projections with respect to the point
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the point projects onto a camera plane
pub fn jacobian(point: &Point3<f64>, cameras: &[CameraMatrix; 2]) -> Result<Matrix4x3<f64>> {
    let mut jacobian = Matrix4x3::zeros();
    let homogeneous = point.to_homogeneous();
    for (i, camera) in cameras.iter().enumerate() {
        let p = camera * homogeneous;
        if p.z.abs() < GEOMETRY_EPSILON {
            return Err(Error::DegenerateGeometry(format!(
                "Point {point} projects onto the camera plane"
            )));
        }
        let m0 = camera.fixed_view::<1, 3>(0, 0);
        let m1 = camera.fixed_view::<1, 3>(1, 0);
        let m2 = camera.fixed_view::<1, 3>(2, 0);
        let scale = p.z * p.z;
        jacobian.set_row(2 * i, &((p.z * m0 - p.x * m2) / scale));
        jacobian.set_row(2 * i + 1, &((p.z * m1 - p.y * m2) / scale));
    }
    Ok(jacobian)
}

/// Linear triangulation followed by `iterations` Gauss-Newton steps
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the linear estimate fails or the normal
/// equations become singular
pub fn nonlinear_estimate_3d_point(
    observations: &ObservationPair,
    cameras: &[CameraMatrix; 2],
    iterations: usize,
) -> Result<Point3<f64>> {
    let mut estimate = linear_estimate_3d_point(observations, cameras)?;
    for _ in 0..iterations {
        let j = jacobian(&estimate, cameras)?;
        let e = reprojection_error(&estimate, observations, cameras)?;
        let normal = (j.transpose() * j)
            .try_inverse()
            .ok_or_else(|| Error::DegenerateGeometry("Singular Gauss-Newton normal matrix".to_string()))?;
        let step: Vector3<f64> = normal * j.transpose() * e;
        estimate -= step;
    }
    Ok(estimate)
}

/// Triangulate every observation pair
///
/// # Errors
///
/// Returns the first triangulation failure
pub fn compute_3d_model(
    points: &[ObservationPair],
    cameras: &[CameraMatrix; 2],
    iterations: usize,
) -> Result<Vec<Point3<f64>>> {
    points
        .iter()
        .map(|pair| nonlinear_estimate_3d_point(pair, cameras, iterations))
        .collect()
}

/// Project a 3-D model into both cameras
///
/// # Errors
///
/// Returns `DegenerateGeometry` if a point projects onto a camera plane
pub fn map_3d_model(model: &[Point3<f64>], cameras: &[CameraMatrix; 2]) -> Result<Vec<ObservationPair>> {
    model
        .iter()
        .map(|point| Ok([project(&cameras[0], point)?, project(&cameras[1], point)?]))
        .collect()
}

/// Triangulator bound to one calibrated rig
#[derive(Debug, Clone)]
pub struct StereoTriangulator {
    cameras: [CameraMatrix; 2],
    iterations: usize,
}

impl StereoTriangulator {
    /// Create a triangulator for two parallel cameras
    ///
    /// # Errors
    ///
    /// Returns an error if the baseline is zero or not finite
    pub fn new(k1: &Matrix3<f64>, k2: &Matrix3<f64>, baseline: f64) -> Result<Self> {
        if !baseline.is_finite() || baseline.abs() < GEOMETRY_EPSILON {
            return Err(Error::ConfigError(format!(
                "Stereo baseline must be finite and non-zero, got {baseline}"
            )));
        }
        log::info!("Initializing StereoTriangulator with baseline {baseline}");
        Ok(Self {
            cameras: make_parallel_camera_matrices(k1, k2, baseline),
            iterations: 0,
        })
    }

    /// Set the number of Gauss-Newton refinement steps (default 0)
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub const fn cameras(&self) -> &[CameraMatrix; 2] {
        &self.cameras
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Triangulate a single observation pair
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` for unrecoverable configurations
    pub fn triangulate(&self, observations: &ObservationPair) -> Result<Point3<f64>> {
        nonlinear_estimate_3d_point(observations, &self.cameras, self.iterations)
    }

    /// Triangulate a whole set of observation pairs
    ///
    /// # Errors
    ///
    /// Returns the first triangulation failure
    pub fn compute_3d_model(&self, points: &[ObservationPair]) -> Result<Vec<Point3<f64>>> {
        compute_3d_model(points, &self.cameras, self.iterations)
    }

    /// Project a model into both cameras of this rig
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` if a point projects onto a camera plane
    pub fn map_3d_model(&self, model: &[Point3<f64>]) -> Result<Vec<ObservationPair>> {
        map_3d_model(model, &self.cameras)
    }
}
