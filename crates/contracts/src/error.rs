//! Layered error definitions
//!
//! Categorized by source: config / driver

use thiserror::Error;

use crate::NodeKind;

/// Configuration and I/O error shared by loaders and consumers
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Non-success status reported by a sensor driver
///
/// Carries the driver's descriptive status string so callers can surface it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Generic non-success status
    #[error("{message}")]
    Status { message: String },

    /// The driver context has not been initialized (or was released)
    #[error("driver context is not initialized")]
    ContextNotInitialized,

    /// The node descriptor is not known to the driver
    #[error("unknown {kind} node '{name}'")]
    UnknownNode { kind: NodeKind, name: String },

    /// The generator handle is not known to the driver
    #[error("unknown generator handle {handle}")]
    UnknownHandle { handle: u32 },
}

impl DriverError {
    /// Create status error
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }
}

/// Driver result alias
pub type DriverResult<T> = std::result::Result<T, DriverError>;
