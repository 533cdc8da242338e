//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PairingPolicy, RigConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    output_mode: String,
    pairing: PairingPolicy,
    depth_sensors: usize,
    image_sensors: usize,
    barrier_timeout_ms: Option<u64>,
    capture_frames: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(ConfigSummary {
                version: format!("{:?}", config.version),
                output_mode: format!(
                    "{}x{}@{}",
                    config.output_mode.width, config.output_mode.height, config.output_mode.fps
                ),
                pairing: config.pairing,
                depth_sensors: config.driver.depth_sensors,
                image_sensors: config.driver.image_sensors,
                barrier_timeout_ms: config.barrier.timeout_ms,
                capture_frames: config.capture.frames,
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RigConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let driver = &config.driver;

    if driver.depth_sensors != driver.image_sensors {
        match config.pairing {
            PairingPolicy::Strict => warnings.push(format!(
                "{} depth vs {} image sensors - alignment fails under strict pairing",
                driver.depth_sensors, driver.image_sensors
            )),
            PairingPolicy::Positional => warnings.push(format!(
                "{} sensors stay unpaired under positional pairing",
                driver.depth_sensors.abs_diff(driver.image_sensors)
            )),
        }
    }

    if driver.depth_sensors == 0 {
        warnings.push("No depth sensors - calibration has nothing to estimate".to_string());
    }

    if config.barrier.timeout_ms.is_none() {
        warnings.push("barrier.timeout_ms not set - a stalled sensor blocks capture".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Output mode: {}", summary.output_mode);
            println!("  Pairing: {:?}", summary.pairing);
            println!(
                "  Sensors: {} depth / {} image",
                summary.depth_sensors, summary.image_sensors
            );
            match summary.barrier_timeout_ms {
                Some(ms) => println!("  Barrier timeout: {} ms", ms),
                None => println!("  Barrier timeout: unbounded"),
            }
            println!("  Capture frames: {}", summary.capture_frames);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for("[driver]\ndepth_sensors = 2\nimage_sensors = 1\n");
        let result = validate_config(&args);

        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("strict pairing")));
        assert_eq!(result.summary.unwrap().depth_sensors, 2);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let (_file, args) = args_for("[barrier]\ntimeout_ms = 0\n");
        let result = validate_config(&args);

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("timeout_ms"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/rig.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
