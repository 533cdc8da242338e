//! # Contracts
//!
//! Shared interface contracts between the driver facade, the rig engine and its consumers.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Coordinate Model
//! - Real-world points are metric, with the sensor looking down the negative Z axis
//! - Projective points are pixel coordinates plus the original depth in `z`

mod calibration;
mod config;
mod error;
mod frame;
mod node;

pub use calibration::*;
pub use config::*;
pub use error::*;
pub use frame::*;
pub use node::*;
