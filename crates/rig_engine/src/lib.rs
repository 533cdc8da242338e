//! # Rig Engine
//!
//! 多传感器 depth/color 采集引擎。
//!
//! 负责：
//! - 驱动上下文生命周期（惰性初始化、fail-fast、shutdown 后可重新初始化）
//! - 按需启动 generator 并原地刷新帧缓冲
//! - 同步屏障：任一 generator 更新后刷新全部 metadata
//! - depth → color 视点对齐
//! - 两点法内参估计
//!
//! ## 使用示例
//!
//! ```ignore
//! use rig_engine::{SensorIndex, SensorRig};
//! use sensor_driver::MockDriver;
//!
//! let mut rig = SensorRig::new(MockDriver::new(), RigConfig::default());
//! rig.align_all_depth_to_color().await?;
//!
//! loop {
//!     rig.wait_for_any_update().await?;
//!     let depth = rig.get_depth_frame(SensorIndex::new(0)).await?;
//!     // depth 借用在下一次调用前有效
//! }
//! ```

mod alignment;
mod barrier;
mod calibration;
mod error;
mod registry;
mod rig;

// Re-exports
pub use contracts::{
    CalibrationEstimate, DepthMetadata, FrameHeader, ImageMetadata, NodeKind, OutputMode,
    PairingPolicy, RigConfig, SensorIndex, SensorPair,
};
pub use error::{Result, RigError};
pub use registry::{GeneratorRegistry, SensorSlot};
pub use rig::{SensorRig, SharedSensorRig};
pub use tokio_util::sync::CancellationToken;
