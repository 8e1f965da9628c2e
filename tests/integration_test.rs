//! Integration tests for the stereo, pose, filtering and calibration pipeline


use head_pose_signal::{
    app::{run_stereo_check, FilterApp, FilterAppConfig, InputFormat, RunStats},
    calibration::{CalibrationController, CalibrationPhase, ControllerOutput, HeadPoseCalibration},
    config::{Config, EstimationConfig, EstimatorConfig, HeadPoseFilterConfig, SmoothingConfig},
    filter_bank::PointCloudFilterBank,
    head_pose::{HeadPose, HeadPoseFilterBank},
    pose_estimation::{Pose, PoseRansacParams, ReflectionMode, RigidPoseEstimator},
    stereo::{linear_estimate_3d_point, nonlinear_estimate_3d_point},
};
use nalgebra::{Point2, Point3, Vector2, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_helpers::{rotation, test_model, test_rig};

fn mean_filters(window_size: usize) -> HeadPoseFilterConfig {
    let mean = EstimatorConfig::SlidingWindow {
        window_size,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Mean,
    };
    HeadPoseFilterConfig {
        yaw: mean.clone(),
        pitch: mean.clone(),
        roll: mean.clone(),
        x: mean.clone(),
        y: mean.clone(),
        z: mean,
    }
}

/// Triangulate a moved model and recover the motion
#[test]
fn test_stereo_pose_round_trip() {
    let rig = test_rig();
    let model = test_model();
    let estimator = RigidPoseEstimator::new(rig.clone(), model.clone(), Vector2::zeros()).unwrap();

    let truth = Pose {
        rotation: rotation(Vector3::new(0.2, 1.0, -0.3), 0.35),
        translation: Vector3::new(-0.4, 0.25, 1.5),
    };
    let moved = truth.transform_model(&model);
    let observations = rig.map_3d_model(&moved).unwrap();

    let triangulated = rig.compute_3d_model(&observations).unwrap();
    for (expected, actual) in moved.iter().zip(&triangulated) {
        assert!((expected - actual).norm() < 1e-9, "triangulation drifted: {expected} vs {actual}");
    }

    let pose = estimator.compute_rt(&observations).unwrap();
    assert!((pose.rotation - truth.rotation).norm() < 1e-9);
    assert!((pose.translation - truth.translation).norm() < 1e-9);
    assert!((pose.rotation.determinant() - 1.0).abs() < 1e-9);
}

#[test]
fn test_refinement_reduces_reprojection_error() {
    let rig = test_rig();
    let point = Point3::new(0.3, -0.2, 2.5);
    let clean = rig.map_3d_model(&[point]).unwrap()[0];
    let noisy = [
        Point2::new(clean[0].x + 0.004, clean[0].y - 0.003),
        Point2::new(clean[1].x - 0.002, clean[1].y + 0.004),
    ];

    let residual = |p: &Point3<f64>| {
        let projected = rig.map_3d_model(&[*p]).unwrap()[0];
        (projected[0] - noisy[0]).norm_squared() + (projected[1] - noisy[1]).norm_squared()
    };

    let linear = linear_estimate_3d_point(&noisy, rig.cameras()).unwrap();
    let refined = nonlinear_estimate_3d_point(&noisy, rig.cameras(), 10).unwrap();
    assert!(residual(&refined) <= residual(&linear) + 1e-15);
    assert!((refined - point).norm() < 0.1);
}

#[test]
fn test_gaze_follows_head_motion() {
    let rig = test_rig();
    let model = test_model();
    let estimator = RigidPoseEstimator::new(rig.clone(), model.clone(), Vector2::new(0.1, -0.2)).unwrap();

    // The reference pose looks at the initial gaze point
    let still = rig.map_3d_model(&model).unwrap();
    let gaze = estimator.compute_gaze_location(&still).unwrap();
    assert!((gaze - Point2::new(0.1, -0.2)).norm() < 1e-9);

    // Pure translation moves the gaze point by the same amount
    let shifted = Pose {
        rotation: rotation(Vector3::z(), 0.0),
        translation: Vector3::new(0.5, 0.25, 0.0),
    };
    let observations = rig.map_3d_model(&shifted.transform_model(&model)).unwrap();
    let gaze = estimator.compute_gaze_location(&observations).unwrap();
    assert!((gaze - Point2::new(0.6, 0.05)).norm() < 1e-9);
}

#[test]
fn test_pose_ransac_with_outlier_landmark() {
    let rig = test_rig();
    let model = test_model();
    let estimator = RigidPoseEstimator::new(rig, model.clone(), Vector2::zeros())
        .unwrap()
        .with_reflection_mode(ReflectionMode::Corrected);

    let truth = Pose {
        rotation: rotation(Vector3::x(), 0.3),
        translation: Vector3::new(0.2, 0.0, 0.5),
    };
    let mut observed = truth.transform_model(&model);
    observed[3] += Vector3::new(10.0, -4.0, 3.0);

    let (pose, inliers) = estimator.compute_rt_ransac(&observed, &PoseRansacParams::default()).unwrap();
    assert_eq!(inliers, vec![true, true, true, false, true, true]);
    assert!((pose.rotation - truth.rotation).norm() < 1e-9);
    assert!((pose.translation - truth.translation).norm() < 1e-9);

    // Plain alignment is dragged off by the outlier
    let plain = estimator.compute_rt_from_points(&observed).unwrap();
    assert!((plain.translation - truth.translation).norm() > 0.5);
}

#[test]
fn test_model_capture_and_reload() {
    let rig = test_rig();
    let model = test_model();
    let observations = rig.map_3d_model(&model).unwrap();
    let estimator = RigidPoseEstimator::from_observations(rig, &observations, Vector2::zeros()).unwrap();
    assert!((estimator.model_centroid() - Point3::new(0.0, 0.0, 1.5)).norm() < 1e-9);

    let path = std::env::temp_dir().join(format!("head_pose_signal_model_{}.txt", std::process::id()));
    let text: String = model.iter().map(|p| format!("{} {} {}\n", p.x, p.y, p.z)).collect();
    std::fs::write(&path, text).unwrap();
    let loaded = RigidPoseEstimator::load_model(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, model);
}

#[test]
fn test_point_cloud_bank_smooths_triangulated_landmarks() {
    let rig = test_rig();
    let model = test_model();
    let config = EstimatorConfig::SlidingWindow {
        window_size: 10,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Mean,
    };
    let mut bank = PointCloudFilterBank::new(model.len(), &config).unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    let mut filtered = None;
    for _ in 0..50 {
        let noisy: Vec<[Point2<f64>; 2]> = rig
            .map_3d_model(&model)
            .unwrap()
            .into_iter()
            .map(|pair| pair.map(|p| Point2::new(p.x + rng.gen_range(-1e-3..1e-3), p.y + rng.gen_range(-1e-3..1e-3))))
            .collect();
        let cloud: Vec<[f64; 3]> = rig
            .compute_3d_model(&noisy)
            .unwrap()
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect();
        filtered = bank.update(&cloud).unwrap();
    }

    let filtered = filtered.unwrap();
    for (point, expected) in filtered.iter().zip(&model) {
        let point = Point3::new(point[0], point[1], point[2]);
        assert!((point - expected).norm() < 0.05, "{point} too far from {expected}");
    }
}

#[test]
fn test_filter_app_pipeline() {
    let config = FilterAppConfig {
        filters: mean_filters(4),
        input: InputFormat::Tracker,
        screen_point: None,
        reference: HeadPoseCalibration::default(),
    };
    let mut app = FilterApp::new(config).unwrap();
    // Raw tracker rows: angles offset by the tracker origin, position as (depth, lateral, vertical)
    let input = (0..10).map(|_| "180 180 -90 1.2 0.1 -0.05\n").collect::<String>();
    let mut output = Vec::new();
    let stats = app.run(input.as_bytes(), &mut output).unwrap();

    assert_eq!(stats, RunStats { rows: 10, published: 10, skipped: 0 });
    let text = String::from_utf8(output).unwrap();
    let last = HeadPose::parse_row(text.lines().last().unwrap()).unwrap();
    let expected = HeadPose {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
        x: 0.1,
        y: -0.05,
        z: 1.2,
    };
    for (a, b) in [
        (last.yaw, expected.yaw),
        (last.pitch, expected.pitch),
        (last.roll, expected.roll),
        (last.x, expected.x),
        (last.y, expected.y),
        (last.z, expected.z),
    ] {
        assert!((a - b).abs() < 1e-4, "expected {expected}, got {last}");
    }
}

#[test]
fn test_calibration_workflow() {
    let mut controller = CalibrationController::new(&mean_filters(5), &mean_filters(2)).unwrap();
    let rest = HeadPose {
        yaw: 4.0,
        pitch: -3.0,
        roll: 1.0,
        x: 0.1,
        y: 0.0,
        z: 1.1,
    };

    assert_eq!(controller.update(&rest).unwrap(), ControllerOutput::Idle);
    assert_eq!(controller.advance().unwrap(), CalibrationPhase::Calibrating);
    for _ in 0..10 {
        assert!(matches!(controller.update(&rest).unwrap(), ControllerOutput::Calibrating(Some(_))));
    }
    assert_eq!(controller.advance().unwrap(), CalibrationPhase::Responding);
    assert_eq!(controller.offset().unwrap().reference(), &rest);

    let turned = HeadPose { yaw: 14.0, ..rest };
    let ControllerOutput::Responding(Some(relative)) = controller.update(&turned).unwrap() else {
        panic!("response bank should publish immediately for mean filters");
    };
    assert!((relative.yaw - 10.0).abs() < 1e-12);
    assert!(relative.z.abs() < 1e-12);

    // Re-calibrating discards the old reference
    assert_eq!(controller.advance().unwrap(), CalibrationPhase::Calibrating);
    assert!(controller.offset().is_none());
}

#[test]
fn test_calibrated_screen_transform_pipeline() {
    let mut bank = HeadPoseFilterBank::new(&mean_filters(3)).unwrap();
    let reference = HeadPoseCalibration {
        z: 60.0,
        ..HeadPoseCalibration::default()
    };
    let pose = HeadPose {
        z: 60.0,
        ..HeadPose::default()
    };
    let filtered = bank.update(&pose).unwrap().unwrap();
    let (x, y) = reference.transform(12.0, -7.0, &filtered).unwrap();
    assert!((x - 12.0).abs() < 1e-9);
    assert!((y + 7.0).abs() < 1e-9);

    // Moving the head sideways shifts the mapped point the other way
    let shifted = HeadPose { x: 2.0, ..pose };
    let (x, _) = reference.transform(12.0, -7.0, &shifted).unwrap();
    assert!((x - 10.0).abs() < 1e-9);
}

#[test]
fn test_stereo_check_with_noise() {
    let report = run_stereo_check(&Config::default(), 1e-4, 42).unwrap();
    assert!(report.max_triangulation_error < 0.05);
    assert!(report.rotation_error < 0.05);
    assert!(report.gaze.is_some());

    let again = run_stereo_check(&Config::default(), 1e-4, 42).unwrap();
    assert_eq!(report, again, "seeded noise must be reproducible");
}
