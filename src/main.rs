// src/main.rs

mod config;
mod error;
mod pipeline;
mod planner;
mod prediction_loader;
mod reinjector;
mod report_writer;
mod segmenter;
mod smoother;
mod types;
mod validator;

use anyhow::Result;
use clap::Parser;
use pipeline::{run_batch, BatchOptions};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::{Config, PlannerCommand};

/// Denoise per-frame world-state labels and turn them into planner commands.
#[derive(Debug, Parser)]
#[command(name = "world_state_planner", version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Only process these clips (repeatable)
    #[arg(long = "clip")]
    clips: Vec<String>,

    /// Recompute clips that already have outputs
    #[arg(long)]
    force: bool,
}

fn load_config(path: &str) -> Result<(Config, bool)> {
    if Path::new(path).exists() {
        Ok((Config::load(path)?, true))
    } else {
        Ok((Config::default(), false))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("world_state_planner={}", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 World-state refinement starting");
    if from_file {
        info!("✓ Configuration loaded from {}", cli.config);
    } else {
        warn!("{} not found, using built-in defaults", cli.config);
    }
    let reinjection = match config.reinjection_policy()? {
        Some(policy) => format!("runs {}..={}", policy.min_run(), policy.max_run()),
        None => "off".to_string(),
    };
    info!(
        "Smoothing: window={}, alignment={:?} | reinjection: {}",
        config.smoothing.window_size, config.smoothing.alignment, reinjection
    );
    info!("📂 Input: {}", config.io.input_path);
    info!("📂 Output: {}", config.io.output_dir);

    let options = BatchOptions {
        clips: cli.clips,
        force: cli.force,
    };
    let summary = run_batch(&config, &options).await?;

    info!("\n========================================");
    info!("✓ Refinement finished");
    info!("  Clips processed: {}", summary.metrics.clips_processed);
    info!("  Clips cached: {}", summary.metrics.clips_cached);
    info!("  Frames: {}", summary.metrics.total_frames);
    info!("  Segments: {}", summary.metrics.segments);
    info!("  ↩️  Go frames restored: {}", summary.metrics.restored_frames);
    info!("  🚶 Runs held back: {}", summary.metrics.blocked_runs);

    let go: usize = summary.clips.iter().map(|c| c.count(PlannerCommand::Go)).sum();
    let stop: usize = summary.clips.iter().map(|c| c.count(PlannerCommand::Stop)).sum();
    info!("  Commands: {} GO, {} STOP", go, stop);

    if summary.metrics.anomalies > 0 {
        warn!("  ⚠️  Anomalies: {}", summary.metrics.anomalies);
    } else {
        info!("  Anomalies: 0");
    }
    info!("  Processing Speed: {:.1} frames/s", summary.metrics.frames_per_sec);
    info!("========================================");

    if !summary.failures.is_empty() {
        for failure in &summary.failures {
            error!("  ✖ {}: {}", failure.clip, failure.error);
        }
        anyhow::bail!("{} clip(s) failed", summary.failures.len());
    }

    Ok(())
}
