//! # depthrig CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 采集流程（标定、对齐、屏障同步采集、帧导出）
//! - 优雅关闭处理

mod cli;
mod commands;
mod dump;
mod setup;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_calibrate, run_capture, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(observability_config(&cli))?;

    info!(version = env!("CARGO_PKG_VERSION"), "depthrig starting");

    let result = match &cli.command {
        Commands::Capture(args) => run_capture(args).await,
        Commands::Calibrate(args) => run_calibrate(args).await,
        Commands::Info(args) => run_info(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Map CLI verbosity flags onto the subscriber configuration
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let (level, force_level) = if cli.quiet {
        ("warn", true)
    } else {
        match cli.verbose {
            0 => ("info", false),
            1 => ("debug", false),
            _ => ("trace", false),
        }
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: level.to_string(),
        force_level,
    }
}
