//! # Config Loader
//!
//! Rig configuration loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `RigConfig` with every omitted section defaulted
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("rig.toml")).unwrap();
//! println!("pairing: {:?}", config.pairing);
//! ```

mod parser;
mod validator;

pub use contracts::RigConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Rig configuration loader
///
/// Every section of the file is optional; a missing section takes its defaults
/// and the result is validated as a whole.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RigConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RigConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Re-validate a configuration after programmatic overrides
    pub fn validate(config: &RigConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize RigConfig to TOML string
    pub fn to_toml(config: &RigConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RigConfig to JSON string
    pub fn to_json(config: &RigConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RigConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PairingPolicy;
    use std::io::Write;

    const RIG_TOML: &str = r#"
pairing = "positional"

[barrier]
timeout_ms = 1500

[driver]
depth_sensors = 2
image_sensors = 2
focal_length = 525.0
frame_interval_ms = 33

[capture]
frames = 3
output_dir = "./dump"
realign_each_frame = false
"#;

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(RIG_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.pairing, PairingPolicy::Positional);
        assert_eq!(config.driver.focal_length, 525.0);
        assert!(!config.capture.realign_each_frame);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(RIG_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.barrier, again.barrier);
        assert_eq!(config.driver, again.driver);
        assert_eq!(config.capture, again.capture);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(RIG_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.pairing, again.pairing);
        assert_eq!(config.output_mode, again.output_mode);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let result = ConfigLoader::load_from_str("[capture]\nframes = 0", ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { ref field, .. }) if field == "capture.frames"
        ));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "driver": {{ "depth_sensors": 3 }} }}"#).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.driver.depth_sensors, 3);
    }

    #[test]
    fn test_load_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"), "got: {err}");
    }
}
