//! Head pose signal tool: filters head pose streams and checks the stereo geometry.

use anyhow::{Context, Result};
use clap::Parser;
use head_pose_signal::{
    app::{run_stereo_check, FilterApp, FilterAppConfig, InputFormat},
    cli::{Args, Command},
    config::{Config, EXAMPLE_CONFIG},
};
use log::info;
use std::io::{self, BufWriter};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Filter { tracker, screen_point } => {
            let mut app_config = FilterAppConfig::from_config(&config);
            if tracker {
                app_config.input = InputFormat::Tracker;
            }
            app_config.screen_point = screen_point.and_then(|p| match *p.as_slice() {
                [x, y] => Some((x, y)),
                _ => None,
            });

            let mut app = FilterApp::new(app_config)?;
            let stdout = io::stdout();
            app.run(io::stdin().lock(), BufWriter::new(stdout.lock()))?;
        }
        Command::StereoCheck { noise, seed } => {
            let report = run_stereo_check(&config, noise, seed)?;
            println!("max triangulation error: {:.3e}", report.max_triangulation_error);
            println!("rotation error:          {:.3e}", report.rotation_error);
            println!("translation error:       {:.3e}", report.translation_error);
            println!(
                "euler angles (deg):      {:.3} {:.3} {:.3}",
                report.euler_angles.x, report.euler_angles.y, report.euler_angles.z
            );
            match report.gaze {
                Some(gaze) => println!("gaze point:              {:.4} {:.4}", gaze.x, gaze.y),
                None => println!("gaze point:              none"),
            }
        }
        Command::ExampleConfig => print!("{EXAMPLE_CONFIG}"),
    }

    Ok(())
}
