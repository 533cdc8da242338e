//! Rig assembly shared by the sensor-facing commands.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RigConfig;
use rig_engine::SensorRig;
use sensor_driver::{MockConfig, MockDriver, PinholeIntrinsics};
use tracing::info;

/// Load the rig configuration, falling back to built-in defaults without a path
pub fn load_config(path: Option<&Path>) -> Result<RigConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RigConfig::default());
    };

    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let config = ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    info!(
        config = %path.display(),
        depth_sensors = config.driver.depth_sensors,
        image_sensors = config.driver.image_sensors,
        pairing = ?config.pairing,
        "Configuration loaded"
    );
    Ok(config)
}

/// Build the simulated driver described by `config.driver`
///
/// The principal point defaults to the centre of the configured output mode.
pub fn build_driver(config: &RigConfig) -> MockDriver {
    let driver = &config.driver;
    let (cx, cy) = driver.principal_point.unwrap_or((
        f64::from(config.output_mode.width) / 2.0,
        f64::from(config.output_mode.height) / 2.0,
    ));

    MockDriver::with_config(MockConfig {
        depth_sensors: driver.depth_sensors,
        image_sensors: driver.image_sensors,
        intrinsics: PinholeIntrinsics {
            focal_length: driver.focal_length,
            cx,
            cy,
        },
        frame_interval: Duration::from_millis(driver.frame_interval_ms),
        ..Default::default()
    })
}

/// Build a rig over the simulated driver
pub fn build_rig(config: RigConfig) -> SensorRig<MockDriver> {
    SensorRig::new(build_driver(&config), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_principal_point_defaults_to_mode_centre() {
        let mut config = RigConfig::default();
        config.output_mode.width = 320;
        config.output_mode.height = 240;

        let driver = build_driver(&config);
        let intrinsics = driver.config().intrinsics;
        assert_eq!((intrinsics.cx, intrinsics.cy), (160.0, 120.0));
    }

    #[test]
    fn test_explicit_principal_point_wins() {
        let mut config = RigConfig::default();
        config.driver.principal_point = Some((300.5, 250.5));
        config.driver.depth_sensors = 3;

        let driver = build_driver(&config);
        assert_eq!(driver.config().intrinsics.cx, 300.5);
        assert_eq!(driver.config().depth_sensors, 3);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/rig.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[capture]\nframes = 2").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.capture.frames, 2);
    }
}
