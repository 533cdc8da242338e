//! # Sensor Driver
//!
//! Driver facade for depth/color sensor stacks.
//!
//! Responsibilities:
//! - Define the `SensorDriver` contract the rig engine is written against
//! - Provide `MockDriver`, a deterministic simulated stack with fault injection
//!
//! Real device drivers live outside this workspace and implement the same trait.

pub mod driver;
pub mod mock;

pub use contracts::{DriverError, DriverResult, GeneratorHandle, NodeInfo, NodeKind};
pub use driver::SensorDriver;
pub use mock::{MockConfig, MockDriver, PinholeIntrinsics};
