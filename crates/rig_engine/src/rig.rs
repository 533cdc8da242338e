//! SensorRig: lifecycle manager and per-sensor frame fetch
//!
//! Owns one driver context. Readiness is "holds a registry": `initialize` builds
//! it, `shutdown` drops it, and every sensor-facing operation re-initializes lazily.

use std::sync::Arc;

use contracts::{
    DepthMetadata, GeneratorHandle, ImageMetadata, NodeInfo, NodeKind, RigConfig, SensorIndex,
};
use sensor_driver::SensorDriver;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, RigError};
use crate::registry::GeneratorRegistry;

/// A rig shared between tasks; the mutex serializes every driver call
pub type SharedSensorRig<D> = Arc<Mutex<SensorRig<D>>>;

/// Multi-sensor depth/color rig
///
/// All operations take `&mut self`: the driver context tolerates no concurrent
/// calls, and borrowed frames stay valid exactly until the next call.
pub struct SensorRig<D: SensorDriver> {
    driver: D,
    config: RigConfig,
    registry: Option<GeneratorRegistry>,
    /// init_context 成功后置位，release_context 后清除；可能先于 registry 存在
    context_live: bool,
}

impl<D: SensorDriver> SensorRig<D> {
    /// Create an uninitialized rig
    pub fn new(driver: D, config: RigConfig) -> Self {
        Self {
            driver,
            config,
            registry: None,
            context_live: false,
        }
    }

    /// Move the rig behind a shared async mutex
    pub fn into_shared(self) -> SharedSensorRig<D> {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Readiness flag
    pub fn is_ready(&self) -> bool {
        self.registry.is_some()
    }

    /// Registry of the current initialization, if any
    pub fn registry(&self) -> Option<&GeneratorRegistry> {
        self.registry.as_ref()
    }

    /// Initialize the driver context and create every generator
    ///
    /// No-op when already initialized. Fail-fast: the first failing step aborts
    /// the sequence; nodes created before it are not rolled back. Generators are
    /// configured but not started.
    #[instrument(name = "sensor_rig_initialize", skip(self))]
    pub async fn initialize(&mut self) -> Result<()> {
        if self.registry.is_some() {
            debug!("already initialized");
            return Ok(());
        }

        // 上一次失败的初始化留下的 context
        if self.context_live {
            warn!("releasing context left by a failed initialization");
            self.context_live = false;
            if let Err(e) = self.driver.release_context() {
                warn!(error = %e, "failed to release stale context");
            }
        }

        match self.build_registry().await {
            Ok(registry) => {
                info!(
                    depth = registry.depth_count(),
                    image = registry.image_count(),
                    pairs = registry.pairs().len(),
                    "rig initialized"
                );
                observability::record_initialized(registry.depth_count(), registry.image_count());
                self.registry = Some(registry);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "initialization failed");
                Err(e)
            }
        }
    }

    /// Initialize iff not ready
    pub async fn ensure_initialized(&mut self) -> Result<()> {
        if self.registry.is_none() {
            self.initialize().await?;
        }
        Ok(())
    }

    /// Release the driver context and every generator it owns
    ///
    /// Also releases a context left live by a failed `initialize`. Readiness is
    /// cleared even when the driver reports a release failure; the failure is
    /// logged and returned. No-op when no context is live.
    #[instrument(name = "sensor_rig_shutdown", skip(self))]
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.context_live && self.registry.is_none() {
            return Ok(());
        }

        match self.registry.take() {
            Some(registry) => info!(
                depth = registry.depth_count(),
                image = registry.image_count(),
                "shutting down"
            ),
            None => info!("releasing context of a failed initialization"),
        }
        self.context_live = false;

        self.driver.release_context().map_err(|e| {
            error!(error = %e, "failed to release driver context");
            RigError::Shutdown {
                message: e.to_string(),
            }
        })
    }

    /// Start (on first use) and fetch the latest color frame of `index`
    ///
    /// The returned buffer is overwritten by the next fetch; clone it to keep it.
    #[instrument(name = "sensor_rig_get_video_frame", skip(self), fields(index = %index))]
    pub async fn get_video_frame(&mut self, index: SensorIndex) -> Result<&ImageMetadata> {
        let (driver, registry) = self.ready_parts().await?;
        let slot = registry.image_slot_mut(index)?;

        if !slot.is_generating() {
            start(driver, slot.handle(), NodeKind::Image, index).await?;
            slot.mark_generating();
        }

        let (handle, metadata) = slot.parts_mut();
        driver
            .fetch_image(handle, metadata)
            .map_err(|e| RigError::fetch(NodeKind::Image, index, e))?;
        observability::record_frame_fetched(NodeKind::Image, index, metadata.frame_number());
        Ok(metadata)
    }

    /// Start (on first use) and fetch the latest depth frame of `index`
    ///
    /// Before `align_all_depth_to_color`, values are in the depth sensor's own
    /// projective space.
    #[instrument(name = "sensor_rig_get_depth_frame", skip(self), fields(index = %index))]
    pub async fn get_depth_frame(&mut self, index: SensorIndex) -> Result<&DepthMetadata> {
        let (driver, registry) = self.ready_parts().await?;
        let slot = registry.depth_slot_mut(index)?;

        if !slot.is_generating() {
            start(driver, slot.handle(), NodeKind::Depth, index).await?;
            slot.mark_generating();
        }

        let (handle, metadata) = slot.parts_mut();
        driver
            .fetch_depth(handle, metadata)
            .map_err(|e| RigError::fetch(NodeKind::Depth, index, e))?;
        observability::record_frame_fetched(NodeKind::Depth, index, metadata.frame_number());
        Ok(metadata)
    }

    /// Driver and registry after lazy initialization
    pub(crate) async fn ready_parts(&mut self) -> Result<(&mut D, &mut GeneratorRegistry)> {
        self.ensure_initialized().await?;
        let registry = self
            .registry
            .as_mut()
            .ok_or_else(|| RigError::ContextInit {
                message: "context released during initialization".into(),
            })?;
        Ok((&mut self.driver, registry))
    }

    async fn build_registry(&mut self) -> Result<GeneratorRegistry> {
        self.driver
            .init_context()
            .await
            .map_err(|e| RigError::ContextInit {
                message: e.to_string(),
            })?;
        self.context_live = true;

        let mut registry = GeneratorRegistry::new();

        for node in self.enumerate(NodeKind::Depth).await? {
            let handle = self.create_generator(&node).await?;
            let index = registry.register_depth_generator(handle);
            debug!(node = %node.name, index = %index, "depth generator registered");
        }

        for node in self.enumerate(NodeKind::Image).await? {
            let handle = self.create_generator(&node).await?;
            let index = registry.register_image_generator(handle);
            debug!(node = %node.name, index = %index, "image generator registered");
        }

        registry.pair_positionally();
        if !registry.is_balanced() {
            warn!(
                depth = registry.depth_count(),
                image = registry.image_count(),
                "depth and image generator counts differ"
            );
        }
        Ok(registry)
    }

    async fn enumerate(&mut self, kind: NodeKind) -> Result<Vec<NodeInfo>> {
        let nodes = self
            .driver
            .enumerate(kind)
            .await
            .map_err(|e| RigError::Enumeration {
                kind,
                message: e.to_string(),
            })?;
        debug!(kind = %kind, count = nodes.len(), "nodes enumerated");
        Ok(nodes)
    }

    /// Create production tree, get instance, apply output mode
    #[instrument(
        name = "sensor_rig_create_generator",
        skip(self, node),
        fields(kind = %node.kind, node = %node.name)
    )]
    async fn create_generator(&mut self, node: &NodeInfo) -> Result<GeneratorHandle> {
        let kind = node.kind;

        self.driver
            .create_production_tree(node)
            .await
            .map_err(|e| RigError::ProductionTreeCreate {
                kind,
                node: node.name.clone(),
                message: e.to_string(),
            })?;

        let handle =
            self.driver
                .generator_instance(node)
                .map_err(|e| RigError::GeneratorInstance {
                    kind,
                    node: node.name.clone(),
                    message: e.to_string(),
                })?;

        let mode = self.config.output_mode;
        self.driver
            .set_output_mode(&handle, mode)
            .map_err(|e| RigError::OutputMode {
                kind,
                node: node.name.clone(),
                message: e.to_string(),
            })?;

        debug!(
            handle = %handle,
            width = mode.width,
            height = mode.height,
            fps = mode.fps,
            "generator created"
        );
        Ok(handle)
    }
}

async fn start<D: SensorDriver>(
    driver: &mut D,
    handle: &GeneratorHandle,
    kind: NodeKind,
    index: SensorIndex,
) -> Result<()> {
    driver
        .start_generating(handle)
        .await
        .map_err(|e| RigError::StartGenerating {
            kind,
            index,
            message: e.to_string(),
        })?;
    info!(kind = %kind, index = %index, "generator started");
    observability::record_generator_started(kind, index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OutputMode;
    use sensor_driver::{MockConfig, MockDriver};

    fn mock_rig(config: MockConfig) -> SensorRig<MockDriver> {
        SensorRig::new(MockDriver::with_config(config), RigConfig::default())
    }

    #[tokio::test]
    async fn test_initialize_registers_every_node() {
        let mut rig = mock_rig(MockConfig::with_sensors(2, 3));
        rig.initialize().await.unwrap();

        let registry = rig.registry().unwrap();
        assert_eq!(registry.depth_count(), 2);
        assert_eq!(registry.image_count(), 3);
        assert!(rig.is_ready());
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let mut rig = mock_rig(MockConfig::default());
        rig.initialize().await.unwrap();
        let before = rig.driver().stats();
        rig.initialize().await.unwrap();
        assert_eq!(rig.driver().stats(), before);
        assert_eq!(before.init_calls, 1);
    }

    #[tokio::test]
    async fn test_initialize_does_not_start_generators() {
        let mut rig = mock_rig(MockConfig::with_sensors(2, 2));
        rig.initialize().await.unwrap();
        assert_eq!(rig.driver().generating_count(), 0);
    }

    #[tokio::test]
    async fn test_context_init_failure() {
        let mut rig = mock_rig(MockConfig {
            fail_init: true,
            ..Default::default()
        });
        let err = rig.initialize().await.unwrap_err();
        assert!(matches!(err, RigError::ContextInit { .. }));
        assert!(err.to_string().contains("no devices found"));
        assert!(!rig.is_ready());
    }

    #[tokio::test]
    async fn test_enumeration_failure_names_kind() {
        let mut rig = mock_rig(MockConfig {
            fail_enumerate: vec![NodeKind::Image],
            ..Default::default()
        });
        let err = rig.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            RigError::Enumeration {
                kind: NodeKind::Image,
                ..
            }
        ));
        assert!(!rig.is_ready());
    }

    #[tokio::test]
    async fn test_create_failure_is_fail_fast() {
        let mut rig = mock_rig(MockConfig {
            depth_sensors: 3,
            fail_create: vec!["depth_1".to_string()],
            ..Default::default()
        });
        let err = rig.initialize().await.unwrap_err();
        match err {
            RigError::ProductionTreeCreate { node, message, .. } => {
                assert_eq!(node, "depth_1");
                assert!(message.contains("mock failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // depth_2 and the image nodes were never attempted
        assert_eq!(rig.driver().stats().create_calls, 2);
        assert_eq!(rig.driver().stats().enumerate_calls, 1);
    }

    #[tokio::test]
    async fn test_instance_and_output_mode_failures() {
        let mut rig = mock_rig(MockConfig {
            fail_instance: vec!["image_0".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            rig.initialize().await,
            Err(RigError::GeneratorInstance { .. })
        ));

        let mut rig = mock_rig(MockConfig {
            fail_output_mode: vec!["depth_0".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            rig.initialize().await,
            Err(RigError::OutputMode {
                kind: NodeKind::Depth,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fetch_initializes_lazily_and_starts_once() {
        let mut rig = mock_rig(MockConfig::default());
        let index = SensorIndex::new(0);

        let frame = rig.get_depth_frame(index).await.unwrap();
        assert_eq!(frame.pixels().len(), 640 * 480);

        assert!(rig.is_ready());
        assert!(rig
            .registry()
            .unwrap()
            .is_generating(NodeKind::Depth, index)
            .unwrap());
        assert!(!rig
            .registry()
            .unwrap()
            .is_generating(NodeKind::Image, index)
            .unwrap());

        rig.get_depth_frame(index).await.unwrap();
        assert_eq!(rig.driver().stats().start_calls, 1);
    }

    #[tokio::test]
    async fn test_video_frame_is_rgb24() {
        let mut rig = mock_rig(MockConfig::default());
        let frame = rig.get_video_frame(SensorIndex::new(0)).await.unwrap();
        assert_eq!(frame.header().width, 640);
        assert_eq!(frame.pixels().len(), 640 * 480 * 3);
    }

    #[tokio::test]
    async fn test_fetch_out_of_range() {
        let mut rig = mock_rig(MockConfig::with_sensors(1, 1));
        let err = rig.get_video_frame(SensorIndex::new(1)).await.unwrap_err();
        assert!(matches!(err, RigError::IndexOutOfRange { len: 1, .. }));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_slot_idle() {
        let mut rig = mock_rig(MockConfig {
            fail_start: vec!["image_0".to_string()],
            ..Default::default()
        });
        let index = SensorIndex::new(0);
        assert!(matches!(
            rig.get_video_frame(index).await,
            Err(RigError::StartGenerating { .. })
        ));
        assert!(!rig
            .registry()
            .unwrap()
            .is_generating(NodeKind::Image, index)
            .unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_clears_readiness() {
        let mut rig = mock_rig(MockConfig::default());
        rig.initialize().await.unwrap();
        rig.shutdown().unwrap();
        assert!(!rig.is_ready());
        assert!(!rig.driver().is_context_initialized());

        // 未初始化时 shutdown 为 no-op
        rig.shutdown().unwrap();
        assert_eq!(rig.driver().stats().release_calls, 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_context_after_failed_initialize() {
        let mut rig = mock_rig(MockConfig {
            fail_output_mode: vec!["image_0".to_string()],
            ..Default::default()
        });
        assert!(rig.initialize().await.is_err());
        assert!(!rig.is_ready());
        assert!(rig.driver().is_context_initialized());

        rig.shutdown().unwrap();
        assert_eq!(rig.driver().stats().release_calls, 1);
        assert!(!rig.driver().is_context_initialized());

        // 第二次 shutdown 不再释放
        rig.shutdown().unwrap();
        assert_eq!(rig.driver().stats().release_calls, 1);
    }

    #[tokio::test]
    async fn test_retry_after_failed_initialize_releases_stale_context() {
        let mut rig = mock_rig(MockConfig {
            fail_output_mode: vec!["image_0".to_string()],
            ..Default::default()
        });
        assert!(rig.initialize().await.is_err());

        rig.driver_mut().config_mut().fail_output_mode.clear();
        rig.initialize().await.unwrap();
        assert!(rig.is_ready());
        assert_eq!(rig.driver().stats().release_calls, 1);
        assert_eq!(rig.driver().stats().init_calls, 2);

        rig.shutdown().unwrap();
        assert_eq!(rig.driver().stats().release_calls, 2);
    }

    #[tokio::test]
    async fn test_configured_output_mode_shapes_frames() {
        assert_eq!(RigConfig::default().output_mode, OutputMode::VGA_30);

        let mode = OutputMode {
            width: 320,
            height: 240,
            fps: 60,
        };
        let mut rig = SensorRig::new(
            MockDriver::with_config(MockConfig::default()),
            RigConfig {
                output_mode: mode,
                ..Default::default()
            },
        );
        let index = SensorIndex::new(0);
        assert_eq!(rig.get_depth_frame(index).await.unwrap().pixels().len(), 320 * 240);
        assert_eq!(
            rig.get_video_frame(index).await.unwrap().pixels().len(),
            320 * 240 * contracts::RGB24_CHANNELS
        );
    }

    #[tokio::test]
    async fn test_shutdown_failure_still_clears_readiness() {
        let mut rig = mock_rig(MockConfig {
            fail_release: true,
            ..Default::default()
        });
        rig.initialize().await.unwrap();
        assert!(matches!(rig.shutdown(), Err(RigError::Shutdown { .. })));
        assert!(!rig.is_ready());
    }
}
