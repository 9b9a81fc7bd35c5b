// src/pipeline/clip_pipeline.rs
//
// One clip end to end:
//
//   raw records → validator → raw ─┬→ smoother → smoothed → segmenter → segments
//                                  └──────────────┴→ reinjector → final → planner
//
// Every stage returns a fresh sequence. Any error discards the whole clip.

use crate::error::RefineError;
use crate::planner::{self, PlannerDecision, PlannerSpan};
use crate::reinjector::{self, ReinjectionPolicy, RunReport};
use crate::segmenter;
use crate::smoother;
use crate::types::{Anomaly, Config, FrameState, PlannerCommand, Segment, WindowAlignment};
use crate::validator::{self, RawFrameRecord};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RefinerSettings {
    pub window_size: usize,
    pub alignment: WindowAlignment,
    /// `None` disables reinjection.
    pub reinjection: Option<ReinjectionPolicy>,
}

impl RefinerSettings {
    pub fn from_config(config: &Config) -> Result<Self, RefineError> {
        config.validate()?;
        Ok(Self {
            window_size: config.smoothing.window_size,
            alignment: config.smoothing.alignment,
            reinjection: config.reinjection_policy()?,
        })
    }
}

/// Everything produced for one clip.
#[derive(Debug, Clone)]
pub struct ClipRun {
    pub clip: String,
    pub raw: Vec<FrameState>,
    pub smoothed: Vec<FrameState>,
    pub segments: Vec<Segment>,
    /// Smoothed clip after go reinjection; what the planner saw.
    pub final_frames: Vec<FrameState>,
    pub decisions: Vec<PlannerDecision>,
    pub spans: Vec<PlannerSpan>,
    pub reinjection_runs: Vec<RunReport>,
    /// Validator and planner anomalies, ordered by frame index.
    pub anomalies: Vec<Anomaly>,
}

impl ClipRun {
    pub fn commands(&self) -> Vec<PlannerCommand> {
        self.decisions.iter().map(|d| d.command).collect()
    }

    pub fn restored_frames(&self) -> usize {
        reinjector::count_restored(&self.reinjection_runs)
    }

    pub fn blocked_runs(&self) -> usize {
        reinjector::count_blocked(&self.reinjection_runs)
    }
}

pub fn run_clip(
    clip: &str,
    records: &[RawFrameRecord],
    settings: &RefinerSettings,
) -> Result<ClipRun, RefineError> {
    let validated = validator::validate_clip(clip, records)?;
    let raw = validated.frames;

    let smoothed = smoother::smooth(&raw, settings.window_size, settings.alignment);
    let segments = segmenter::segment(&smoothed);
    debug!("{}: {} segments", clip, segments.len());

    let (final_frames, reinjection_runs) = match &settings.reinjection {
        Some(policy) => {
            let result = reinjector::reinject(&raw, &smoothed, policy)?;
            (result.frames, result.runs)
        }
        None => (smoothed.clone(), Vec::new()),
    };

    let (decisions, planner_anomalies) = planner::plan(&final_frames);
    let spans = planner::command_spans(&decisions);

    let mut anomalies = validated.anomalies;
    anomalies.extend(planner_anomalies);
    anomalies.sort_by_key(|a| a.frame_index);

    let run = ClipRun {
        clip: clip.to_string(),
        raw,
        smoothed,
        segments,
        final_frames,
        decisions,
        spans,
        reinjection_runs,
        anomalies,
    };

    info!(
        "✓ {}: {} frames, {} segments, {} go frames restored, {} runs held back, {} anomalies",
        clip,
        run.raw.len(),
        run.segments.len(),
        run.restored_frames(),
        run.blocked_runs(),
        run.anomalies.len()
    );

    Ok(run)
}
