//! Command-line arguments of the `head-pose-signal` binary

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "head-pose-signal", author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter rows of `yaw pitch roll x y z` read from stdin
    Filter {
        /// Rows are raw tracker output and need remapping
        #[arg(long)]
        tracker: bool,

        /// Also map this screen point through the calibrated transform
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
        screen_point: Option<Vec<f64>>,
    },

    /// Run a synthetic triangulation, pose and gaze round trip
    StereoCheck {
        /// Uniform noise amplitude added to the image observations
        #[arg(long, default_value = "0.0")]
        noise: f64,

        /// Seed for the observation noise
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Print an example configuration file
    ExampleConfig,
}
