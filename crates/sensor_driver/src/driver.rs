//! Sensor driver abstraction
//!
//! Defines the primitives the rig engine needs from a depth/color driver stack,
//! supporting real implementations and mock testing.

use std::future::Future;

use contracts::{
    DepthMetadata, DriverResult, GeneratorHandle, ImageMetadata, NodeInfo, NodeKind, OutputMode,
    Point3,
};

/// Sensor driver trait
///
/// One implementation owns one driver context. Calls are not expected to be
/// safe concurrently, so every method that touches the context takes `&mut self`
/// and the caller serializes access.
pub trait SensorDriver: Send {
    /// Initialize the driver context
    fn init_context(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Enumerate production nodes of the given modality, in discovery order
    fn enumerate(&mut self, kind: NodeKind) -> impl Future<Output = DriverResult<Vec<NodeInfo>>> + Send;

    /// Instantiate the production tree backing an enumerated node
    fn create_production_tree(
        &mut self,
        node: &NodeInfo,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Get the generator instance of a created node
    fn generator_instance(&mut self, node: &NodeInfo) -> DriverResult<GeneratorHandle>;

    /// Apply an output mode to a generator
    fn set_output_mode(&mut self, handle: &GeneratorHandle, mode: OutputMode) -> DriverResult<()>;

    /// Start frame generation
    ///
    /// Idempotent: starting an already-generating generator returns Ok.
    fn start_generating(
        &mut self,
        handle: &GeneratorHandle,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Copy the latest available depth frame into `metadata`, overwriting it in place
    ///
    /// A generator that has not produced a frame leaves `metadata` untouched.
    fn fetch_depth(&self, handle: &GeneratorHandle, metadata: &mut DepthMetadata)
        -> DriverResult<()>;

    /// Copy the latest available color frame into `metadata`, overwriting it in place
    fn fetch_image(&self, handle: &GeneratorHandle, metadata: &mut ImageMetadata)
        -> DriverResult<()>;

    /// Block until any generating node has a new frame, then advance every node's
    /// latest available frame
    ///
    /// Has no timeout and no cancellation hook; callers race it against their own.
    fn wait_any_update_all(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Register the depth generator's output viewpoint to the color generator
    fn set_viewpoint(
        &mut self,
        depth: &GeneratorHandle,
        color: &GeneratorHandle,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Convert a real-world point into the depth generator's projective space
    fn real_world_to_projective(&self, depth: &GeneratorHandle, point: Point3)
        -> DriverResult<Point3>;

    /// Release the context and every node it owns
    fn release_context(&mut self) -> DriverResult<()>;
}
