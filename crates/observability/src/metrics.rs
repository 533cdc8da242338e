//! Rig 指标收集模块
//!
//! 记录生命周期、取帧、屏障等待与标定探测指标，并提供内存聚合器用于输出摘要。

use std::collections::BTreeMap;

use contracts::{CalibrationEstimate, NodeKind, SensorIndex};
use metrics::{counter, gauge, histogram};

/// 记录一次成功的初始化
pub fn record_initialized(depth_sensors: usize, image_sensors: usize) {
    counter!("depthrig_initializations_total").increment(1);
    gauge!("depthrig_sensors", "kind" => "depth").set(depth_sensors as f64);
    gauge!("depthrig_sensors", "kind" => "image").set(image_sensors as f64);
}

/// 记录 generator 首次启动
pub fn record_generator_started(kind: NodeKind, index: SensorIndex) {
    counter!(
        "depthrig_generators_started_total",
        "kind" => kind.as_str(),
        "index" => index.to_string()
    )
    .increment(1);
}

/// 记录单次取帧
pub fn record_frame_fetched(kind: NodeKind, index: SensorIndex, frame_number: u32) {
    counter!(
        "depthrig_frames_fetched_total",
        "kind" => kind.as_str(),
        "index" => index.to_string()
    )
    .increment(1);

    // 帧号 (用于检测跳帧)
    gauge!(
        "depthrig_last_frame_number",
        "kind" => kind.as_str(),
        "index" => index.to_string()
    )
    .set(f64::from(frame_number));
}

/// 记录屏障等待耗时
pub fn record_barrier_wait_ms(wait_ms: f64, outcome: &'static str) {
    histogram!("depthrig_barrier_wait_ms").record(wait_ms);
    counter!("depthrig_barrier_waits_total", "outcome" => outcome).increment(1);
}

/// 记录视点对齐
pub fn record_alignment(pairs: usize) {
    counter!("depthrig_alignments_total").increment(1);
    gauge!("depthrig_aligned_pairs").set(pairs as f64);
}

/// 记录标定估计结果
pub fn record_calibration(index: SensorIndex, estimate: &CalibrationEstimate) {
    let index = index.to_string();
    gauge!("depthrig_calibration_cx", "index" => index.clone()).set(estimate.cx());
    gauge!("depthrig_calibration_cy", "index" => index.clone()).set(estimate.cy());
    gauge!("depthrig_calibration_fx", "index" => index.clone()).set(estimate.fx());
    gauge!("depthrig_calibration_fy", "index" => index).set(estimate.fy());
}

/// 采集指标聚合器
///
/// 在内存中聚合一次采集运行的指标，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CaptureMetricsAggregator {
    /// 屏障轮数
    pub rounds: u64,

    /// 重新对齐次数
    pub realignments: u64,

    /// 屏障等待统计 (ms)
    pub wait_stats: RunningStats,

    /// 各传感器取帧次数 ("depth/0" -> n)
    pub frame_counts: BTreeMap<String, u64>,
}

impl CaptureMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一轮屏障等待完成
    pub fn record_round(&mut self, wait_ms: f64) {
        self.rounds += 1;
        self.wait_stats.push(wait_ms);
    }

    pub fn record_frame(&mut self, kind: NodeKind, index: SensorIndex) {
        *self
            .frame_counts
            .entry(format!("{kind}/{index}"))
            .or_insert(0) += 1;
    }

    pub fn record_realignment(&mut self) {
        self.realignments += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            rounds: self.rounds,
            realignments: self.realignments,
            total_frames: self.frame_counts.values().sum(),
            wait_ms: StatsSummary::from(&self.wait_stats),
            frame_counts: self.frame_counts.clone(),
        }
    }
}

/// 采集摘要
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub rounds: u64,
    pub realignments: u64,
    pub total_frames: u64,
    pub wait_ms: StatsSummary,
    pub frame_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Barrier rounds: {}", self.rounds)?;
        writeln!(f, "Frames fetched: {}", self.total_frames)?;
        writeln!(f, "Realignments: {}", self.realignments)?;
        writeln!(f, "Barrier wait (ms): {}", self.wait_ms)?;

        if !self.frame_counts.is_empty() {
            writeln!(f, "Frames per sensor:")?;
            for (sensor, count) in &self.frame_counts {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
