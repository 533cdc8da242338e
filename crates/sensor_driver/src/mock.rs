//! Mock sensor driver
//!
//! Deterministic simulated depth/color stack for tests and offline runs.
//! Supports fault injection at every lifecycle step.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use contracts::{
    DepthMetadata, DriverError, DriverResult, FrameHeader, GeneratorHandle, ImageMetadata,
    NodeInfo, NodeKind, OutputMode, Point3, RGB24_CHANNELS,
};
use tracing::{debug, instrument};

use crate::driver::SensorDriver;

/// Horizontal shift (pixels) of depth frames once registered to a color viewpoint
pub const ALIGNMENT_SHIFT_PX: u32 = 24;

/// Ideal pinhole model in the driver's sign convention
///
/// Real-world points sit in front of the sensor at negative Z. Projective X grows
/// opposite to real-world X, projective Y grows with it:
/// `px = cx + f·x/z`, `py = cy − f·y/z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

impl PinholeIntrinsics {
    pub fn project(&self, point: Point3) -> DriverResult<Point3> {
        if point.z == 0.0 {
            return Err(DriverError::status("cannot project a point at z = 0"));
        }
        Ok(Point3::new(
            self.cx + self.focal_length * point.x / point.z,
            self.cy - self.focal_length * point.y / point.z,
            point.z,
        ))
    }
}

impl Default for PinholeIntrinsics {
    fn default() -> Self {
        Self {
            focal_length: 575.8157,
            cx: 320.0,
            cy: 240.0,
        }
    }
}

/// Mock 驱动配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 枚举出的 depth 节点数量
    pub depth_sensors: usize,
    /// 枚举出的 image 节点数量
    pub image_sensors: usize,
    /// 投影模型
    pub intrinsics: PinholeIntrinsics,
    /// wait 返回前的模拟帧间隔
    pub frame_interval: Duration,
    /// context 初始化失败
    pub fail_init: bool,
    /// 枚举失败的模态
    pub fail_enumerate: Vec<NodeKind>,
    /// 创建 production tree 失败的节点名
    pub fail_create: Vec<String>,
    /// 获取 generator 实例失败的节点名
    pub fail_instance: Vec<String>,
    /// 设置 output mode 失败的节点名
    pub fail_output_mode: Vec<String>,
    /// 启动失败的节点名
    pub fail_start: Vec<String>,
    /// 设置视点失败的 depth 节点名
    pub fail_viewpoint: Vec<String>,
    /// 坐标转换失败
    pub fail_conversion: bool,
    /// 释放 context 失败
    pub fail_release: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            depth_sensors: 1,
            image_sensors: 1,
            intrinsics: PinholeIntrinsics::default(),
            frame_interval: Duration::ZERO,
            fail_init: false,
            fail_enumerate: Vec::new(),
            fail_create: Vec::new(),
            fail_instance: Vec::new(),
            fail_output_mode: Vec::new(),
            fail_start: Vec::new(),
            fail_viewpoint: Vec::new(),
            fail_conversion: false,
            fail_release: false,
        }
    }
}

impl MockConfig {
    /// `depth` depth nodes and `image` image nodes, no faults
    pub fn with_sensors(depth: usize, image: usize) -> Self {
        Self {
            depth_sensors: depth,
            image_sensors: image,
            ..Default::default()
        }
    }
}

/// Call counters, for asserting what the engine asked of the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub init_calls: u32,
    pub enumerate_calls: u32,
    pub create_calls: u32,
    pub start_calls: u32,
    pub wait_calls: u32,
    pub viewpoint_calls: u32,
    pub release_calls: u32,
}

#[derive(Debug)]
struct MockGenerator {
    node: NodeInfo,
    mode: Option<OutputMode>,
    generating: bool,
    /// Raw handle of the color generator this depth generator is registered to
    viewpoint: Option<u32>,
    /// Latest available frame, 0 = none yet
    frame_number: u32,
}

/// Mock 传感器驱动
pub struct MockDriver {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// context 状态
    context_initialized: bool,
    /// 句柄计数器
    next_handle: u32,
    /// 已创建 production tree 的节点名
    created: HashSet<String>,
    /// 节点名 -> 句柄
    instances: HashMap<String, u32>,
    /// 句柄 -> generator 状态
    generators: HashMap<u32, MockGenerator>,
    stats: MockStats,
}

impl MockDriver {
    /// 创建默认 mock 驱动 (1 depth + 1 image)
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 驱动
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            context_initialized: false,
            next_handle: 1000, // 从 1000 开始，便于识别
            created: HashSet::new(),
            instances: HashMap::new(),
            generators: HashMap::new(),
            stats: MockStats::default(),
        }
    }

    /// 模拟热插拔：修改下次枚举返回的节点数量
    pub fn set_sensor_counts(&mut self, depth: usize, image: usize) {
        self.config.depth_sensors = depth;
        self.config.image_sensors = image;
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Mutable access to the fault-injection config
    pub fn config_mut(&mut self) -> &mut MockConfig {
        &mut self.config
    }

    pub fn stats(&self) -> MockStats {
        self.stats
    }

    pub fn is_context_initialized(&self) -> bool {
        self.context_initialized
    }

    /// Whether the generator behind `handle` is producing frames
    pub fn is_generating(&self, handle: &GeneratorHandle) -> bool {
        self.generator(handle).map(|g| g.generating).unwrap_or(false)
    }

    /// Number of generators currently producing frames
    pub fn generating_count(&self) -> usize {
        self.generators.values().filter(|g| g.generating).count()
    }

    /// `(depth node, color node)` names of every registered viewpoint, sorted
    pub fn registered_viewpoints(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .generators
            .values()
            .filter_map(|g| {
                let color = self.generators.get(&g.viewpoint?)?;
                Some((g.node.name.clone(), color.node.name.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    fn ensure_context(&self) -> DriverResult<()> {
        if self.context_initialized {
            Ok(())
        } else {
            Err(DriverError::ContextNotInitialized)
        }
    }

    fn generator(&self, handle: &GeneratorHandle) -> DriverResult<&MockGenerator> {
        self.generators
            .get(&handle.raw())
            .filter(|g| g.node.kind == handle.kind())
            .ok_or(DriverError::UnknownHandle {
                handle: handle.raw(),
            })
    }

    fn generator_mut(&mut self, handle: &GeneratorHandle) -> DriverResult<&mut MockGenerator> {
        self.generators
            .get_mut(&handle.raw())
            .filter(|g| g.node.kind == handle.kind())
            .ok_or(DriverError::UnknownHandle {
                handle: handle.raw(),
            })
    }

    fn injected(list: &[String], node: &NodeInfo, what: &str) -> DriverResult<()> {
        if list.contains(&node.name) {
            Err(DriverError::status(format!(
                "mock failure: {what} '{}'",
                node.name
            )))
        } else {
            Ok(())
        }
    }

    fn frame_header(generator: &MockGenerator) -> (FrameHeader, OutputMode) {
        let mode = generator.mode.unwrap_or_default();
        let header = FrameHeader {
            width: mode.width,
            height: mode.height,
            timestamp_us: u64::from(generator.frame_number) * mode.frame_interval_us(),
            frame_number: generator.frame_number,
        };
        (header, mode)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for MockDriver {
    #[instrument(name = "mock_driver_init_context", skip(self))]
    async fn init_context(&mut self) -> DriverResult<()> {
        self.stats.init_calls += 1;
        if self.config.fail_init {
            return Err(DriverError::status("mock failure: no devices found"));
        }
        self.context_initialized = true;
        Ok(())
    }

    #[instrument(name = "mock_driver_enumerate", skip(self), fields(kind = %kind))]
    async fn enumerate(&mut self, kind: NodeKind) -> DriverResult<Vec<NodeInfo>> {
        self.ensure_context()?;
        self.stats.enumerate_calls += 1;

        if self.config.fail_enumerate.contains(&kind) {
            return Err(DriverError::status(format!(
                "mock failure: enumerate {kind} nodes"
            )));
        }

        let count = match kind {
            NodeKind::Depth => self.config.depth_sensors,
            NodeKind::Image => self.config.image_sensors,
        };
        Ok((0..count)
            .map(|i| NodeInfo::new(kind, format!("{kind}_{i}"), "mock"))
            .collect())
    }

    #[instrument(name = "mock_driver_create_production_tree", skip(self, node), fields(node = %node.name))]
    async fn create_production_tree(&mut self, node: &NodeInfo) -> DriverResult<()> {
        self.ensure_context()?;
        self.stats.create_calls += 1;
        Self::injected(&self.config.fail_create, node, "create production tree")?;
        self.created.insert(node.name.clone());
        Ok(())
    }

    fn generator_instance(&mut self, node: &NodeInfo) -> DriverResult<GeneratorHandle> {
        self.ensure_context()?;
        if !self.created.contains(&node.name) {
            return Err(DriverError::UnknownNode {
                kind: node.kind,
                name: node.name.clone(),
            });
        }
        Self::injected(&self.config.fail_instance, node, "get generator instance")?;

        if let Some(&raw) = self.instances.get(&node.name) {
            return Ok(GeneratorHandle::new(raw, node.kind));
        }

        let raw = self.next_handle;
        self.next_handle += 1;
        self.instances.insert(node.name.clone(), raw);
        self.generators.insert(
            raw,
            MockGenerator {
                node: node.clone(),
                mode: None,
                generating: false,
                viewpoint: None,
                frame_number: 0,
            },
        );
        Ok(GeneratorHandle::new(raw, node.kind))
    }

    fn set_output_mode(&mut self, handle: &GeneratorHandle, mode: OutputMode) -> DriverResult<()> {
        self.ensure_context()?;
        let fail_list = self.config.fail_output_mode.clone();
        let generator = self.generator_mut(handle)?;
        Self::injected(&fail_list, &generator.node, "set output mode")?;
        generator.mode = Some(mode);
        Ok(())
    }

    #[instrument(name = "mock_driver_start_generating", skip(self), fields(handle = %handle))]
    async fn start_generating(&mut self, handle: &GeneratorHandle) -> DriverResult<()> {
        self.ensure_context()?;
        self.stats.start_calls += 1;
        let fail_list = self.config.fail_start.clone();
        let generator = self.generator_mut(handle)?;
        Self::injected(&fail_list, &generator.node, "start generating")?;

        // 幂等：已在生成则直接返回
        if !generator.generating {
            generator.generating = true;
            generator.frame_number = 1;
            debug!(node = %generator.node.name, "generator started");
        }
        Ok(())
    }

    fn fetch_depth(
        &self,
        handle: &GeneratorHandle,
        metadata: &mut DepthMetadata,
    ) -> DriverResult<()> {
        self.ensure_context()?;
        let generator = self.generator(handle)?;
        if !generator.generating || generator.frame_number == 0 {
            return Ok(());
        }

        let (header, mode) = Self::frame_header(generator);
        let shift = if generator.viewpoint.is_some() {
            ALIGNMENT_SHIFT_PX
        } else {
            0
        };
        let frame = generator.frame_number % 1000;
        let width = mode.width as usize;
        let pixels = metadata.overwrite(header, mode.pixel_count());
        for (i, px) in pixels.iter_mut().enumerate() {
            let (x, y) = ((i % width) as u32, (i / width) as u32);
            *px = (500 + (x + shift) % 512 + y % 1024 + frame) as u16;
        }
        Ok(())
    }

    fn fetch_image(
        &self,
        handle: &GeneratorHandle,
        metadata: &mut ImageMetadata,
    ) -> DriverResult<()> {
        self.ensure_context()?;
        let generator = self.generator(handle)?;
        if !generator.generating || generator.frame_number == 0 {
            return Ok(());
        }

        let (header, mode) = Self::frame_header(generator);
        let frame = generator.frame_number as u8;
        let width = mode.width as usize;
        let pixels = metadata.overwrite(header, mode.pixel_count() * RGB24_CHANNELS);
        for (i, rgb) in pixels.chunks_exact_mut(RGB24_CHANNELS).enumerate() {
            let (x, y) = (i % width, i / width);
            rgb[0] = (x as u8) ^ frame;
            rgb[1] = y as u8;
            rgb[2] = frame;
        }
        Ok(())
    }

    #[instrument(name = "mock_driver_wait_any_update_all", skip(self))]
    async fn wait_any_update_all(&mut self) -> DriverResult<()> {
        self.ensure_context()?;
        self.stats.wait_calls += 1;

        // 没有正在生成的节点时永远阻塞，与真实驱动一致
        if !self.generators.values().any(|g| g.generating) {
            std::future::pending::<()>().await;
        }
        if !self.config.frame_interval.is_zero() {
            tokio::time::sleep(self.config.frame_interval).await;
        }

        for generator in self.generators.values_mut().filter(|g| g.generating) {
            generator.frame_number += 1;
        }
        Ok(())
    }

    #[instrument(name = "mock_driver_set_viewpoint", skip(self), fields(depth = %depth, color = %color))]
    async fn set_viewpoint(
        &mut self,
        depth: &GeneratorHandle,
        color: &GeneratorHandle,
    ) -> DriverResult<()> {
        self.ensure_context()?;
        self.stats.viewpoint_calls += 1;
        self.generator(color)?;
        let fail_list = self.config.fail_viewpoint.clone();
        let generator = self.generator_mut(depth)?;
        Self::injected(&fail_list, &generator.node, "set viewpoint")?;
        generator.viewpoint = Some(color.raw());
        Ok(())
    }

    fn real_world_to_projective(
        &self,
        depth: &GeneratorHandle,
        point: Point3,
    ) -> DriverResult<Point3> {
        self.ensure_context()?;
        self.generator(depth)?;
        if self.config.fail_conversion {
            return Err(DriverError::status("mock failure: convert real world to projective"));
        }
        self.config.intrinsics.project(point)
    }

    #[instrument(name = "mock_driver_release_context", skip(self))]
    fn release_context(&mut self) -> DriverResult<()> {
        self.stats.release_calls += 1;
        self.context_initialized = false;
        self.created.clear();
        self.instances.clear();
        self.generators.clear();

        if self.config.fail_release {
            return Err(DriverError::status("mock failure: release context"));
        }
        Ok(())
    }
}
