//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - Rig 指标记录与采集统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig::default())?;
//! let depth = rig.get_depth_frame(SensorIndex::new(0)).await?;
//! observability::record_frame_fetched(NodeKind::Depth, SensorIndex::new(0), depth.frame_number());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_alignment, record_barrier_wait_ms, record_calibration, record_frame_fetched,
    record_generator_started, record_initialized, CaptureMetricsAggregator, CaptureSummary,
    RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别 (RUST_LOG 未设置时生效)
    pub default_log_level: String,
    /// 忽略 RUST_LOG，强制使用默认级别
    pub force_level: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            default_log_level: "info".to_string(),
            force_level: false,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化 Tracing 与 (可选) Prometheus
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = if config.force_level {
        EnvFilter::new(&config.default_log_level)
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level))
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
