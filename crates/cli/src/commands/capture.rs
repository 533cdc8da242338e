//! `capture` command implementation.
//!
//! Initialize, estimate calibration of depth 0, align depth to color, estimate
//! again, then capture frames on the barrier until the round budget is spent or
//! Ctrl+C cancels the wait.

use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{CaptureConfig, NodeKind, SensorIndex, SensorPair};
use observability::{CaptureMetricsAggregator, CaptureSummary};
use rig_engine::{CancellationToken, RigError, SensorRig};
use sensor_driver::SensorDriver;
use tracing::{debug, info, warn};

use crate::cli::CaptureArgs;
use crate::dump::FrameDumper;
use crate::setup::{build_rig, load_config};

/// Execute the `capture` command
pub async fn run_capture(args: &CaptureArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(frames) = args.frames {
        info!(frames, "Overriding capture frames from CLI");
        config.capture.frames = frames;
    }
    if let Some(ref dir) = args.output_dir {
        info!(output_dir = %dir.display(), "Overriding output directory from CLI");
        config.capture.output_dir = dir.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.barrier.timeout_ms = Some(timeout_ms);
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid capture overrides")?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let dumper = if args.no_dump {
        None
    } else {
        Some(FrameDumper::new(&config.capture.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.capture.output_dir.display()
            )
        })?)
    };

    let capture = config.capture.clone();
    let mut rig = build_rig(config);

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let result = capture_frames(&mut rig, &capture, dumper, &cancel).await;
    signal.abort();

    // 无论采集成功与否都释放 context
    if let Err(e) = rig.shutdown() {
        warn!(error = %e, "Failed to release sensor rig");
    }

    let summary = result?;
    println!("{summary}");
    info!("depthrig capture finished");
    Ok(())
}

/// Run the capture routine against an already constructed rig
pub async fn capture_frames<D: SensorDriver>(
    rig: &mut SensorRig<D>,
    capture: &CaptureConfig,
    mut dumper: Option<FrameDumper>,
    cancel: &CancellationToken,
) -> Result<CaptureSummary> {
    rig.initialize()
        .await
        .context("Failed to initialize sensor rig")?;

    let has_depth = rig.registry().is_some_and(|r| r.depth_count() > 0);
    if has_depth {
        let estimate = rig.estimate_calibration(SensorIndex::new(0)).await?;
        info!(%estimate, "Calibration before alignment");
    }

    rig.align_all_depth_to_color()
        .await
        .context("Failed to align depth to color")?;

    if has_depth {
        let estimate = rig.estimate_calibration(SensorIndex::new(0)).await?;
        info!(%estimate, "Calibration after alignment");
    }

    let pairs: Vec<SensorPair> = rig
        .registry()
        .map(|r| r.pairs().to_vec())
        .unwrap_or_default();
    if pairs.is_empty() {
        warn!("No depth/color pairs, nothing to capture");
    }

    // 首次取帧触发惰性启动，否则屏障没有可等待的 generator
    for pair in &pairs {
        rig.get_depth_frame(pair.depth_index).await?;
        rig.get_video_frame(pair.color_index).await?;
    }

    let mut aggregator = CaptureMetricsAggregator::new();
    for round in 0..capture.frames {
        if pairs.is_empty() {
            break;
        }

        let started = Instant::now();
        match rig.wait_for_any_update_until(cancel).await {
            Ok(()) => {}
            Err(RigError::WaitCancelled) => {
                warn!(round, "Capture cancelled");
                break;
            }
            Err(e) => return Err(e).context("Barrier wait failed"),
        }
        aggregator.record_round(started.elapsed().as_secs_f64() * 1000.0);

        for pair in &pairs {
            let depth = rig.get_depth_frame(pair.depth_index).await?;
            aggregator.record_frame(NodeKind::Depth, pair.depth_index);
            if let Some(ref mut dumper) = dumper {
                dumper.write_depth(pair.depth_index, depth)?;
            }

            let color = rig.get_video_frame(pair.color_index).await?;
            aggregator.record_frame(NodeKind::Image, pair.color_index);
            if let Some(ref mut dumper) = dumper {
                dumper.write_image(pair.color_index, color)?;
            }
        }

        if capture.realign_each_frame {
            rig.align_all_depth_to_color().await?;
            aggregator.record_realignment();
        }

        debug!(round, "Round captured");
    }

    if let Some(ref dumper) = dumper {
        info!(
            files = dumper.written(),
            dir = %dumper.dir().display(),
            "Frames dumped"
        );
    }

    Ok(aggregator.summary())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, stopping capture...");
    token.cancel();
}
