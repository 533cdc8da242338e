//! Production nodes, generator handles and sensor indices

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor modality of a production node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Depth map generator (16-bit millimetres)
    Depth,
    /// Color image generator (RGB24)
    Image,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of an enumerated production node
///
/// Returned by driver enumeration; used to create the production tree and fetch the
/// generator instance backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node modality
    pub kind: NodeKind,

    /// Driver-assigned instance name, unique within a context
    pub name: String,

    /// Vendor string reported by the driver
    pub vendor: String,
}

impl NodeInfo {
    pub fn new(kind: NodeKind, name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            vendor: vendor.into(),
        }
    }
}

/// Opaque handle to a live generator
///
/// Deliberately not `Clone`: the registry owns each handle exclusively and
/// lends it to the driver by reference.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct GeneratorHandle {
    raw: u32,
    kind: NodeKind,
}

impl GeneratorHandle {
    /// Wrap a driver-assigned id. Only drivers should mint handles.
    pub fn new(raw: u32, kind: NodeKind) -> Self {
        Self { raw, kind }
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

impl fmt::Display for GeneratorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.raw)
    }
}

/// 0-based sensor index, assigned per modality in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorIndex(usize);

impl SensorIndex {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for SensorIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for SensorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explicit depth/color pairing recorded at the end of initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPair {
    pub depth_index: SensorIndex,
    pub color_index: SensorIndex,
}
