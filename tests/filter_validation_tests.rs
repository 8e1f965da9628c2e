//! Validation tests for estimator construction and configuration

use head_pose_signal::{
    config::{
        Config, EstimationConfig, EstimatorConfig, KernelSpec, SmoothingConfig, StationaryConfig, ANGLE_PRESET,
        KALMAN_PRESET, LANDMARK_PRESET, THRESHOLD_KALMAN_PRESET,
    },
    filters::{create_estimator, KalmanParams, SignalEstimator},
    Error,
};

fn sliding(window_size: usize, smoothing: SmoothingConfig, estimation: EstimationConfig) -> EstimatorConfig {
    EstimatorConfig::SlidingWindow {
        window_size,
        smoothing,
        estimation,
    }
}

#[test]
fn test_create_estimator_rejects_bad_specs() {
    // Unknown names and unparsable arguments
    {
        assert!(matches!(create_estimator("lowpass:0.5"), Err(Error::FilterError(_))));
        assert!(matches!(create_estimator(""), Err(Error::FilterError(_))));
        assert!(matches!(create_estimator("mean:five"), Err(Error::FilterError(_))));
        assert!(matches!(create_estimator("median:-3"), Err(Error::FilterError(_))));
    }

    // Parsable but out of range
    {
        assert!(matches!(create_estimator("mean:0"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("poly:4:4"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("poly:4:9"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("kernel:0"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("kernel:10:0"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("ransac:1"), Err(Error::ConfigError(_))));
        assert!(matches!(create_estimator("stationary:8:-1"), Err(Error::ConfigError(_))));
    }
}

#[test]
fn test_create_estimator_is_case_insensitive() {
    for spec in ["MEAN:3", "Median:3", "Kalman", "THRESHOLD_KALMAN", "Stationary:8:0.5:2"] {
        assert!(create_estimator(spec).is_ok(), "{spec} should be accepted");
    }
}

#[test]
fn test_smoothing_kernel_validation() {
    // Even kernels have no centre sample
    let even_median = sliding(8, SmoothingConfig::Median { kernel_size: 4 }, EstimationConfig::Mean);
    assert!(matches!(even_median.build(), Err(Error::ConfigError(_))));

    let even_gaussian = sliding(
        8,
        SmoothingConfig::Convolve {
            kernel: KernelSpec::Gaussian { length: 6, std_dev: 2.0 },
        },
        EstimationConfig::Mean,
    );
    assert!(even_gaussian.build().is_err());

    // A kernel wider than the window cannot be reflected
    let too_wide = sliding(4, SmoothingConfig::Median { kernel_size: 9 }, EstimationConfig::Mean);
    assert!(too_wide.build().is_err());

    let fits = sliding(8, SmoothingConfig::Median { kernel_size: 3 }, EstimationConfig::Mean);
    assert!(fits.build().is_ok());
}

#[test]
fn test_estimation_validation() {
    let mismatched_kernel = sliding(
        5,
        SmoothingConfig::None,
        EstimationConfig::Kernel(KernelSpec::Explicit {
            weights: vec![0.25, 0.25, 0.5],
        }),
    );
    assert!(matches!(mismatched_kernel.build(), Err(Error::ConfigError(_))));

    let empty_kernel = sliding(
        3,
        SmoothingConfig::None,
        EstimationConfig::Kernel(KernelSpec::Explicit { weights: vec![] }),
    );
    assert!(empty_kernel.build().is_err());

    let matched_kernel = sliding(
        3,
        SmoothingConfig::None,
        EstimationConfig::Kernel(KernelSpec::Explicit {
            weights: vec![0.25, 0.25, 0.5],
        }),
    );
    assert!(matched_kernel.build().is_ok());

    let zero_window = sliding(0, SmoothingConfig::None, EstimationConfig::Raw);
    assert!(matches!(zero_window.build(), Err(Error::ConfigError(_))));
}

#[test]
fn test_stationary_and_kalman_validation() {
    let negative_threshold = EstimatorConfig::Stationary(StationaryConfig {
        threshold: -0.1,
        ..StationaryConfig::DEFAULT
    });
    assert!(negative_threshold.build().is_err());

    let bad_noise = EstimatorConfig::Kalman(KalmanParams {
        measurement_noise: 0.0,
        ..KalmanParams::DEFAULT
    });
    assert!(matches!(bad_noise.build(), Err(Error::ConfigError(_))));

    let nan_gain = EstimatorConfig::Kalman(KalmanParams {
        process_gain: f64::NAN,
        ..KalmanParams::DEFAULT
    });
    assert!(nan_gain.build().is_err());
}

#[test]
fn test_presets_build() {
    for preset in [ANGLE_PRESET, LANDMARK_PRESET, KALMAN_PRESET, THRESHOLD_KALMAN_PRESET] {
        let estimator = preset.build();
        assert!(estimator.is_ok(), "{preset:?} should build");
        assert_eq!(estimator.unwrap().estimate_current(), None, "fresh estimators are warming up");
    }
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let mut config = Config::default();
    config.stereo.baseline = 0.0;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

    let mut config = Config::default();
    config.stereo.intrinsics_right = [[0.0; 3]; 3];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.landmarks.num_keypoints = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.screen.screen_height_px = -1080.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.head_pose.roll = sliding(3, SmoothingConfig::None, EstimationConfig::Polynomial { degree: 3 });
    assert!(config.validate().is_err());
}
