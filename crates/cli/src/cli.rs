//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depthrig - Multi-sensor depth/color rig diagnostics
#[derive(Parser, Debug)]
#[command(
    name = "depthrig",
    author,
    version,
    about = "Multi-sensor depth/color rig diagnostics",
    long_about = "Drives a depth/color sensor rig: lazy initialization, barrier-synchronized \n\
                  capture, depth-to-color viewpoint alignment and two-point intrinsics \n\
                  estimation. Frames can be dumped as PGM/PPM for inspection."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DEPTHRIG_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DEPTHRIG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture routine: calibrate, align, then capture frames
    Capture(CaptureArgs),

    /// Report calibration estimates of depth sensors
    Calibrate(CalibrateArgs),

    /// Enumerate sensors and show pairs
    Info(InfoArgs),

    /// Validate configuration file without touching sensors
    Validate(ValidateArgs),
}

/// Arguments for the `capture` command
#[derive(Parser, Debug, Clone)]
pub struct CaptureArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "DEPTHRIG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the number of barrier rounds to capture
    #[arg(long, env = "DEPTHRIG_FRAMES")]
    pub frames: Option<u32>,

    /// Override the dump directory
    #[arg(short, long, env = "DEPTHRIG_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Capture without writing PGM/PPM files
    #[arg(long)]
    pub no_dump: bool,

    /// Override the barrier timeout in milliseconds
    #[arg(long, env = "DEPTHRIG_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DEPTHRIG_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `calibrate` command
#[derive(Parser, Debug)]
pub struct CalibrateArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long, env = "DEPTHRIG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Depth sensor index (all depth sensors when omitted)
    #[arg(short, long)]
    pub index: Option<usize>,

    /// Align depth to color before estimating
    #[arg(long)]
    pub align: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long, env = "DEPTHRIG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
