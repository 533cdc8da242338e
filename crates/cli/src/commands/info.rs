//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{NodeKind, OutputMode, PairingPolicy, SensorIndex, SensorPair};
use rig_engine::{GeneratorRegistry, SensorRig};
use sensor_driver::SensorDriver;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::InfoArgs;
use crate::setup::{build_rig, load_config};

/// Rig info for JSON output
#[derive(Debug, Serialize)]
struct RigInfo {
    output_mode: OutputMode,
    pairing: PairingPolicy,
    balanced: bool,
    depth: Vec<SensorEntry>,
    image: Vec<SensorEntry>,
    pairs: Vec<SensorPair>,
}

#[derive(Debug, Serialize)]
struct SensorEntry {
    index: SensorIndex,
    kind: NodeKind,
    handle: String,
}

/// Execute the `info` command
pub async fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut rig = build_rig(config);

    let result = collect_info(&mut rig).await;

    if let Err(e) = rig.shutdown() {
        warn!(error = %e, "Failed to release sensor rig");
    }
    let rig_info = result?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&rig_info).context("Failed to serialize rig info")?;
        println!("{}", json);
    } else {
        print_rig_info(&rig_info);
    }

    Ok(())
}

async fn collect_info<D: SensorDriver>(rig: &mut SensorRig<D>) -> Result<RigInfo> {
    rig.initialize()
        .await
        .context("Failed to initialize sensor rig")?;

    let registry = rig
        .registry()
        .context("Sensor rig is not ready after initialization")?;
    info!(
        depth = registry.depth_count(),
        image = registry.image_count(),
        "Sensors enumerated"
    );

    Ok(RigInfo {
        output_mode: rig.config().output_mode,
        pairing: rig.config().pairing,
        balanced: registry.is_balanced(),
        depth: entries(registry, NodeKind::Depth),
        image: entries(registry, NodeKind::Image),
        pairs: registry.pairs().to_vec(),
    })
}

fn entries(registry: &GeneratorRegistry, kind: NodeKind) -> Vec<SensorEntry> {
    let count = match kind {
        NodeKind::Depth => registry.depth_count(),
        NodeKind::Image => registry.image_count(),
    };

    (0..count)
        .map(SensorIndex::new)
        .filter_map(|index| {
            let handle = match kind {
                NodeKind::Depth => registry.depth_handle(index),
                NodeKind::Image => registry.image_handle(index),
            };
            handle.ok().map(|h| SensorEntry {
                index,
                kind,
                handle: h.to_string(),
            })
        })
        .collect()
}

fn print_rig_info(rig_info: &RigInfo) {
    let mode = &rig_info.output_mode;
    println!("=== Sensor Rig ===\n");
    println!("Output mode: {}x{} @ {} fps", mode.width, mode.height, mode.fps);
    println!("Pairing: {:?}", rig_info.pairing);

    for (title, sensors) in [("Depth", &rig_info.depth), ("Color", &rig_info.image)] {
        println!("\n{} sensors ({}):", title, sensors.len());
        for (i, sensor) in sensors.iter().enumerate() {
            let prefix = if i == sensors.len() - 1 { "└─" } else { "├─" };
            println!("  {} [{}] {}", prefix, sensor.index, sensor.handle);
        }
    }

    println!("\nPairs ({}):", rig_info.pairs.len());
    for pair in &rig_info.pairs {
        println!("  - depth[{}] -> color[{}]", pair.depth_index, pair.color_index);
    }
    if !rig_info.balanced {
        println!("\n⚠ Depth and color counts differ; unpaired sensors are never aligned");
    }
    println!();
}
