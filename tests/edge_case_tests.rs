//! Edge case tests for estimators, filter banks and the geometry helpers


use head_pose_signal::{
    config::{EstimationConfig, EstimatorConfig, SmoothingConfig},
    filter_bank::{KeypointFilterBank, ParameterFilterBank},
    filters::{create_estimator, SignalEstimator},
    head_pose::HeadPose,
    pose_estimation::{kabsch, ReflectionMode},
    ring_buffer::RingBuffer,
    Error,
};
use nalgebra::Point3;
use proptest::prelude::*;
use test_helpers::create_test_estimator;

#[test]
fn test_estimator_extreme_values() {
    let specs = [
        "raw",
        "mean:5",
        "median:5",
        "poly:6:2",
        "kernel:8:4",
        "ransac:6",
        "stationary:8:0.5:3",
        "kalman",
        "threshold_kalman",
    ];

    for spec in specs {
        let mut filter = create_test_estimator(spec).unwrap();
        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, f64::MAX, f64::MIN, 1e100, -1e100, 0.0] {
            filter.append(value);
            // Only the absence of a panic matters here
            let _ = filter.estimate_current();
        }
    }
}

#[test]
fn test_estimator_reset_behavior() {
    for spec in ["mean:3", "median:3", "poly:4:1", "stationary:8:0.5:3", "kalman", "threshold_kalman"] {
        let mut filter = create_estimator(spec).unwrap();
        for i in 0..20 {
            filter.append(f64::from(i));
        }
        assert!(filter.estimate_current().is_some(), "{spec} should be warm after 20 samples");

        filter.reset();
        assert_eq!(filter.estimate_current(), None, "{spec} should be back in warm-up after reset");
    }
}

#[test]
fn test_ring_buffer_wraparound() {
    let mut buffer = RingBuffer::new(3).unwrap();
    for value in 1..=7 {
        buffer.append(f64::from(value));
    }
    assert_eq!(buffer.get_continuous(), vec![5.0, 6.0, 7.0]);
    assert_eq!(buffer.get_head(), Some(7.0));
    assert_eq!(buffer.get_tail(), Some(5.0));
    assert!(RingBuffer::<f64>::new(0).is_err());
}

#[test]
fn test_bank_publishes_after_slowest_member() {
    let mean = EstimatorConfig::SlidingWindow {
        window_size: 3,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Mean,
    };
    let poly = EstimatorConfig::SlidingWindow {
        window_size: 5,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Polynomial { degree: 1 },
    };
    let mut bank = ParameterFilterBank::from_configs([("fast", &mean), ("slow", &poly)]).unwrap();

    for i in 0..4 {
        let published = bank.update(&[("fast", f64::from(i)), ("slow", f64::from(i))]).unwrap();
        assert!(published.is_none(), "sample {i} arrives before the slow member is warm");
    }
    let published = bank.update(&[("slow", 4.0), ("fast", 4.0)]).unwrap().unwrap();
    assert_eq!(published.get("fast"), Some(3.0));
    assert!((published.get("slow").unwrap() - 4.0).abs() < 1e-9);
}

#[test]
fn test_bank_rejects_incomplete_updates_without_side_effects() {
    let raw = EstimatorConfig::SlidingWindow {
        window_size: 1,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Raw,
    };
    let mut bank = ParameterFilterBank::from_configs([("a", &raw), ("b", &raw)]).unwrap();
    assert!(matches!(bank.update(&[("a", 1.0)]), Err(Error::InvalidInput(_))));
    assert!(matches!(bank.update(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]), Err(Error::InvalidInput(_))));
    assert!(bank.current().is_none(), "rejected updates must not reach any estimator");
}

#[test]
fn test_keypoint_bank_cardinality() {
    let raw = EstimatorConfig::SlidingWindow {
        window_size: 1,
        smoothing: SmoothingConfig::None,
        estimation: EstimationConfig::Raw,
    };
    let mut bank = KeypointFilterBank::<2>::new(3, &raw).unwrap();
    assert!(bank.update(&[[0.0, 0.0], [1.0, 1.0]]).is_err());
    let filtered = bank.update(&[[0.0, 0.0], [1.0, 1.0], [2.0, -2.0]]).unwrap().unwrap();
    assert_eq!(filtered[2], [2.0, -2.0]);
    assert!(KeypointFilterBank::<3>::new(0, &raw).is_err());
}

#[test]
fn test_parse_row_edge_cases() {
    assert!(HeadPose::parse_row("1 2 3 4 5").is_err());
    assert!(HeadPose::parse_row("1 2 3 4 5 6 7").is_err());
    assert!(HeadPose::parse_row("1 2 3 x 5 6").is_err());
    let pose = HeadPose::parse_row("  1,2  3\t4 ,5 6 ").unwrap();
    assert_eq!(pose.z, 6.0);
}

#[test]
fn test_kabsch_degenerate_clouds() {
    let collinear: Vec<_> = (0..5).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    assert!(matches!(
        kabsch(&collinear, &collinear, ReflectionMode::Literal),
        Err(Error::DegenerateGeometry(_))
    ));

    let coincident = vec![Point3::new(1.0, 2.0, 3.0); 4];
    assert!(matches!(
        kabsch(&coincident, &coincident, ReflectionMode::Corrected),
        Err(Error::DegenerateGeometry(_))
    ));

    let two = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
    assert!(matches!(kabsch(&two, &two, ReflectionMode::Literal), Err(Error::ConfigError(_))));
}

proptest! {
    #[test]
    fn test_full_window_modes_warm_up(window in 2usize..20, degree in 0usize..6, values in prop::collection::vec(-1e3f64..1e3, 40)) {
        prop_assume!(degree < window);
        let config = EstimatorConfig::SlidingWindow {
            window_size: window,
            smoothing: SmoothingConfig::None,
            estimation: EstimationConfig::Polynomial { degree },
        };
        let mut filter = config.build().unwrap();
        for (i, &value) in values.iter().enumerate() {
            filter.append(value);
            prop_assert_eq!(filter.estimate_current().is_some(), i + 1 >= window);
        }
    }

    #[test]
    fn test_mean_stays_within_sample_range(values in prop::collection::vec(-1e6f64..1e6, 1..50), window in 1usize..10) {
        let mut filter = create_estimator(&format!("mean:{window}")).unwrap();
        for (i, &value) in values.iter().enumerate() {
            filter.append(value);
            let start = (i + 1).saturating_sub(window);
            let recent = &values[start..=i];
            let lo = recent.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let estimate = filter.estimate_current().unwrap();
            prop_assert!(estimate >= lo - 1e-6 && estimate <= hi + 1e-6);
        }
    }

    #[test]
    fn test_relative_to_inverts_offset(yaw in -90.0f64..90.0, x in -1.0f64..1.0, z in 0.1f64..3.0) {
        let reference = HeadPose { yaw, pitch: 0.0, roll: 0.0, x, y: 0.0, z };
        let relative = reference.relative_to(&reference);
        prop_assert_eq!(relative, HeadPose::default());
    }
}
