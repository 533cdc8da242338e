//! `calibrate` command implementation.

use anyhow::{Context, Result};
use contracts::{CalibrationEstimate, SensorIndex};
use rig_engine::SensorRig;
use sensor_driver::SensorDriver;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::CalibrateArgs;
use crate::setup::{build_rig, load_config};

/// One estimate for JSON output
#[derive(Debug, Serialize)]
struct CalibrationReport {
    index: SensorIndex,
    aligned: bool,
    #[serde(flatten)]
    estimate: CalibrationEstimate,
}

/// Execute the `calibrate` command
pub async fn run_calibrate(args: &CalibrateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut rig = build_rig(config);

    let result = estimate_all(&mut rig, args.index, args.align).await;

    if let Err(e) = rig.shutdown() {
        warn!(error = %e, "Failed to release sensor rig");
    }
    let reports = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&reports)
            .context("Failed to serialize calibration reports")?;
        println!("{}", json);
    } else {
        for report in &reports {
            let suffix = if report.aligned { " (aligned)" } else { "" };
            println!("depth[{}]{} {}", report.index, suffix, report.estimate);
        }
    }

    Ok(())
}

/// Estimate one depth sensor, or every depth sensor when `index` is `None`
async fn estimate_all<D: SensorDriver>(
    rig: &mut SensorRig<D>,
    index: Option<usize>,
    align: bool,
) -> Result<Vec<CalibrationReport>> {
    rig.initialize()
        .await
        .context("Failed to initialize sensor rig")?;

    if align {
        let pairs = rig
            .align_all_depth_to_color()
            .await
            .context("Failed to align depth to color")?;
        info!(pairs, "Depth aligned before estimation");
    }

    let indices: Vec<SensorIndex> = match index {
        Some(i) => vec![SensorIndex::new(i)],
        None => {
            let count = rig.registry().map_or(0, |r| r.depth_count());
            (0..count).map(SensorIndex::new).collect()
        }
    };

    let mut reports = Vec::with_capacity(indices.len());
    for index in indices {
        let estimate = rig
            .estimate_calibration(index)
            .await
            .with_context(|| format!("Failed to estimate calibration of depth[{index}]"))?;
        reports.push(CalibrationReport {
            index,
            aligned: align,
            estimate,
        });
    }
    Ok(reports)
}
