//! RigConfig - Config Loader output
//!
//! Describes the rig: output mode, pairing policy, barrier bounds, the simulated
//! driver and the capture routine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::OutputMode;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete rig configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Output mode applied to every generator
    #[serde(default)]
    pub output_mode: OutputMode,

    /// How depth sensors are paired with color sensors
    #[serde(default)]
    pub pairing: PairingPolicy,

    /// Synchronization barrier settings
    #[serde(default)]
    pub barrier: BarrierConfig,

    /// Simulated driver settings
    #[serde(default)]
    pub driver: DriverConfig,

    /// Capture routine settings
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Depth/color pairing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Depth and color counts must match; alignment fails otherwise
    #[default]
    Strict,
    /// Pair by position up to the shorter list, leaving the rest unpaired
    Positional,
}

/// Synchronization barrier settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierConfig {
    /// Upper bound for a single barrier wait (None = wait forever)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BarrierConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Simulated driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Number of depth nodes to enumerate
    #[serde(default = "default_sensor_count")]
    pub depth_sensors: usize,

    /// Number of image nodes to enumerate
    #[serde(default = "default_sensor_count")]
    pub image_sensors: usize,

    /// Pinhole focal length in pixels
    #[serde(default = "default_focal_length")]
    pub focal_length: f64,

    /// Principal point in pixels (defaults to the image centre)
    #[serde(default)]
    pub principal_point: Option<(f64, f64)>,

    /// Delay before a waiting caller sees a new frame
    #[serde(default)]
    pub frame_interval_ms: u64,
}

fn default_sensor_count() -> usize {
    1
}

fn default_focal_length() -> f64 {
    575.8157
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            depth_sensors: default_sensor_count(),
            image_sensors: default_sensor_count(),
            focal_length: default_focal_length(),
            principal_point: None,
            frame_interval_ms: 0,
        }
    }
}

/// Capture routine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Number of barrier rounds to capture
    #[serde(default = "default_frames")]
    pub frames: u32,

    /// Directory receiving PGM/PPM dumps
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Re-register depth viewpoints after every captured frame
    #[serde(default = "default_realign")]
    pub realign_each_frame: bool,
}

fn default_frames() -> u32 {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_realign() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            output_dir: default_output_dir(),
            realign_each_frame: default_realign(),
        }
    }
}
