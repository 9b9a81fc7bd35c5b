// src/pipeline/batch.rs
//
// Runs every clip found in the input on its own blocking worker. Clips
// share nothing mutable except the atomic counters, and a failed clip
// never stops the others.

use super::clip_pipeline::{run_clip, ClipRun, RefinerSettings};
use super::metrics::{MetricsSummary, PipelineMetrics};
use crate::prediction_loader::{find_prediction_files, load_clips, ClipRecords};
use crate::report_writer::{self, clip_dir, planner_table_path, write_clip_outputs};
use crate::types::{Config, PlannerCommand};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Only these clips; empty means all.
    pub clips: Vec<String>,
    /// Recompute clips whose outputs already exist.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipSummary {
    pub clip: String,
    pub output_dir: PathBuf,
    pub frames: usize,
    pub segments: usize,
    pub restored_frames: usize,
    pub blocked_runs: usize,
    pub anomalies: usize,
    pub commands: BTreeMap<&'static str, usize>,
}

impl ClipSummary {
    fn from_run(run: &ClipRun, output_dir: PathBuf) -> Self {
        let mut commands = BTreeMap::new();
        for command in run.commands() {
            *commands.entry(command.as_str()).or_insert(0) += 1;
        }
        Self {
            clip: run.clip.clone(),
            output_dir,
            frames: run.raw.len(),
            segments: run.segments.len(),
            restored_frames: run.restored_frames(),
            blocked_runs: run.blocked_runs(),
            anomalies: run.anomalies.len(),
            commands,
        }
    }

    pub fn count(&self, command: PlannerCommand) -> usize {
        self.commands.get(command.as_str()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipFailure {
    pub clip: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub clips: Vec<ClipSummary>,
    pub cached: Vec<String>,
    pub failures: Vec<ClipFailure>,
    pub metrics: MetricsSummary,
}

fn process_clip(
    clip: ClipRecords,
    settings: &RefinerSettings,
    output_dir: &Path,
    metrics: &PipelineMetrics,
) -> Result<ClipSummary> {
    if let Some(err) = clip.malformed {
        return Err(err.into());
    }
    let run = run_clip(&clip.clip, &clip.records, settings)?;
    let dir = write_clip_outputs(output_dir, &run)
        .with_context(|| format!("Failed to write outputs for {}", clip.clip))?;

    metrics.inc(&metrics.clips_processed);
    metrics.add(&metrics.total_frames, run.raw.len());
    metrics.add(&metrics.segments, run.segments.len());
    metrics.add(&metrics.restored_frames, run.restored_frames());
    metrics.add(&metrics.blocked_runs, run.blocked_runs());
    metrics.add(&metrics.anomalies, run.anomalies.len());

    Ok(ClipSummary::from_run(&run, dir))
}

/// Outcome of one worker. A panicked worker fails its clip like any
/// other error.
fn settle(
    clip: String,
    joined: std::result::Result<Result<ClipSummary>, JoinError>,
) -> std::result::Result<ClipSummary, ClipFailure> {
    let error = match joined {
        Ok(Ok(summary)) => return Ok(summary),
        Ok(Err(e)) => format!("{:#}", e),
        Err(e) if e.is_panic() => format!("worker panicked: {}", e),
        Err(e) => format!("worker did not finish: {}", e),
    };
    error!("[✖] {}: {}", clip, error);
    Err(ClipFailure { clip, error })
}

pub async fn run_batch(config: &Config, options: &BatchOptions) -> Result<RunSummary> {
    let settings = Arc::new(RefinerSettings::from_config(config)?);
    let output_dir = PathBuf::from(&config.io.output_dir);

    let files = find_prediction_files(Path::new(&config.io.input_path), &output_dir)?;
    if files.is_empty() {
        warn!("No prediction files found in {}", config.io.input_path);
    }

    let mut clips = load_clips(&files)?;
    if !options.clips.is_empty() {
        for wanted in &options.clips {
            if !clips.iter().any(|c| &c.clip == wanted) {
                warn!("Requested clip {} not found in predictions", wanted);
            }
        }
        clips.retain(|c| options.clips.contains(&c.clip));
    }
    info!("Processing {} clip(s)", clips.len());

    let metrics = PipelineMetrics::new();
    let mut cached = Vec::new();
    let mut failures = Vec::new();
    let mut handles = Vec::new();
    // Clip names that flatten to the same output directory
    let mut owners: HashMap<PathBuf, String> = HashMap::new();

    for clip in clips {
        let dir = clip_dir(&output_dir, &clip.clip);
        if let Some(owner) = owners.get(&dir) {
            let failure = ClipFailure {
                error: format!(
                    "output directory {} already belongs to clip {}",
                    dir.display(),
                    owner
                ),
                clip: clip.clip,
            };
            error!("[✖] {}: {}", failure.clip, failure.error);
            metrics.inc(&metrics.clips_failed);
            failures.push(failure);
            continue;
        }
        owners.insert(dir, clip.clip.clone());

        if !options.force && planner_table_path(&output_dir, &clip.clip).exists() {
            info!("[↺] {}: cached, skipping", clip.clip);
            metrics.inc(&metrics.clips_cached);
            cached.push(clip.clip);
            continue;
        }

        let name = clip.clip.clone();
        let settings = Arc::clone(&settings);
        let output_dir = output_dir.clone();
        let worker_metrics = metrics.clone();
        let handle = tokio::task::spawn_blocking(move || {
            process_clip(clip, &settings, &output_dir, &worker_metrics)
        });
        handles.push((name, handle));
    }

    let mut summaries = Vec::new();
    for (name, handle) in handles {
        match settle(name, handle.await) {
            Ok(summary) => summaries.push(summary),
            Err(failure) => {
                metrics.inc(&metrics.clips_failed);
                failures.push(failure);
            }
        }
    }

    let summary = RunSummary {
        clips: summaries,
        cached,
        failures,
        metrics: metrics.summary(),
    };

    let summary_path = output_dir.join(report_writer::SUMMARY_FILE);
    report_writer::write_json(&summary_path, &summary)?;
    info!("💾 Run summary written to {}", summary_path.display());

    Ok(summary)
}
