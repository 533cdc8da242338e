//! Rig engine error types

use contracts::{DriverError, NodeKind, SensorIndex};
use thiserror::Error;

/// Rig engine error
///
/// Every driver failure carries the driver's status message.
#[derive(Debug, Error)]
pub enum RigError {
    /// Driver context initialization failed
    #[error("failed to initialize driver context: {message}")]
    ContextInit { message: String },

    /// Node enumeration failed
    #[error("failed to enumerate {kind} generators: {message}")]
    Enumeration { kind: NodeKind, message: String },

    /// Production tree creation failed
    #[error("failed to create {kind} generator '{node}': {message}")]
    ProductionTreeCreate {
        kind: NodeKind,
        node: String,
        message: String,
    },

    /// Generator instance lookup failed
    #[error("failed to get {kind} generator instance '{node}': {message}")]
    GeneratorInstance {
        kind: NodeKind,
        node: String,
        message: String,
    },

    /// Output mode could not be applied
    #[error("failed to set {kind} generator map output mode on '{node}': {message}")]
    OutputMode {
        kind: NodeKind,
        node: String,
        message: String,
    },

    /// Index not returned by registration
    #[error("{kind} sensor index {index} out of range (registered: {len})")]
    IndexOutOfRange {
        kind: NodeKind,
        index: SensorIndex,
        len: usize,
    },

    /// Generator could not be started
    #[error("failed to start {kind} generator {index}: {message}")]
    StartGenerating {
        kind: NodeKind,
        index: SensorIndex,
        message: String,
    },

    /// Frame metadata could not be read
    #[error("failed to fetch {kind} frame from generator {index}: {message}")]
    Fetch {
        kind: NodeKind,
        index: SensorIndex,
        message: String,
    },

    /// Viewpoint registration failed
    #[error("failed to align depth {depth_index} to color {color_index}: {message}")]
    Alignment {
        depth_index: SensorIndex,
        color_index: SensorIndex,
        message: String,
    },

    /// Depth and color counts differ under strict pairing
    #[error("cannot pair {depth} depth generators with {image} image generators")]
    PairingMismatch { depth: usize, image: usize },

    /// Real-world to projective conversion failed
    #[error("failed to convert point for depth generator {index}: {message}")]
    Conversion { index: SensorIndex, message: String },

    /// Driver wait primitive failed
    #[error("failed waiting for sensor update: {message}")]
    Wait { message: String },

    /// Barrier wait cancelled by the caller
    #[error("wait for sensor update cancelled")]
    WaitCancelled,

    /// Barrier wait exceeded its bound
    #[error("no sensor update within {waited_ms}ms")]
    WaitTimeout { waited_ms: u64 },

    /// Driver context release reported failure
    #[error("failed to release driver context: {message}")]
    Shutdown { message: String },
}

impl RigError {
    pub(crate) fn index_out_of_range(kind: NodeKind, index: SensorIndex, len: usize) -> Self {
        Self::IndexOutOfRange { kind, index, len }
    }

    pub(crate) fn fetch(kind: NodeKind, index: SensorIndex, err: DriverError) -> Self {
        Self::Fetch {
            kind,
            index,
            message: err.to_string(),
        }
    }

    /// Whether the error is a programming error rather than a driver failure
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RigError>;
