//! Tests for command-line argument parsing

use clap::{CommandFactory, Parser};
use head_pose_signal::cli::{Args, Command};

#[test]
fn test_argument_definitions_are_consistent() {
    Args::command().debug_assert();
}

#[test]
fn test_help_argument() {
    let result = Args::try_parse_from(["head-pose-signal", "--help"]);

    // Help should cause an error (but a specific help error)
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn test_subcommand_required() {
    assert!(Args::try_parse_from(["head-pose-signal"]).is_err());
}

#[test]
fn test_filter_subcommand() {
    let args = Args::try_parse_from(["head-pose-signal", "filter", "--tracker"]).unwrap();
    assert!(!args.debug);
    assert!(args.config.is_none());
    match args.command {
        Command::Filter { tracker, screen_point } => {
            assert!(tracker);
            assert!(screen_point.is_none());
        }
        other => panic!("Expected filter, got {other:?}"),
    }
}

#[test]
fn test_screen_point_takes_two_values() {
    let args = Args::try_parse_from(["head-pose-signal", "filter", "--screen-point", "12.5", "-7"]).unwrap();
    let Command::Filter { tracker, screen_point } = args.command else {
        panic!("Expected filter");
    };
    assert!(!tracker);
    assert_eq!(screen_point, Some(vec![12.5, -7.0]));

    assert!(Args::try_parse_from(["head-pose-signal", "filter", "--screen-point", "1"]).is_err());
}

#[test]
fn test_stereo_check_defaults() {
    let args = Args::try_parse_from(["head-pose-signal", "stereo-check"]).unwrap();
    let Command::StereoCheck { noise, seed } = args.command else {
        panic!("Expected stereo-check");
    };
    assert_eq!(noise, 0.0);
    assert_eq!(seed, 0);
}

#[test]
fn test_stereo_check_rejects_bad_numbers() {
    assert!(Args::try_parse_from(["head-pose-signal", "stereo-check", "--seed", "-1"]).is_err());
    assert!(Args::try_parse_from(["head-pose-signal", "stereo-check", "--noise", "lots"]).is_err());
}

#[test]
fn test_global_arguments_after_subcommand() {
    let args = Args::try_parse_from(["head-pose-signal", "example-config", "-d", "-C", "config.yaml"]).unwrap();
    assert!(args.debug);
    assert_eq!(args.config.as_deref(), Some("config.yaml"));
    assert!(matches!(args.command, Command::ExampleConfig));
}
