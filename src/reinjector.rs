// src/reinjector.rs
//
// Majority voting erases any raw `go` burst shorter than the window. Those
// bursts are real opportunities, so short free-go runs from the raw clip are
// written back over the smoothed clip, unless a pedestrian yield is active.
//
// Guard extent: a run is skipped as a whole when the frame right before it
// (pre-reinjection) is a pedestrian stop, or when any smoothed frame inside
// the run yields to a pedestrian. Nothing past the preceding frame is
// consulted.

use crate::error::RefineError;
use crate::types::{FrameState, YieldTo};
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReinjectionPolicy {
    min_run: usize,
    max_run: usize,
}

impl ReinjectionPolicy {
    /// Runs of `min_run..=max_run` frames are eligible. `max_run` must stay
    /// below the smoothing window, longer runs survive smoothing on their own.
    pub fn new(min_run: usize, max_run: usize, window_size: usize) -> Result<Self, RefineError> {
        if min_run == 0 {
            return Err(RefineError::InvalidConfig(
                "reinjection.min_run must be at least 1".to_string(),
            ));
        }
        if max_run >= window_size {
            return Err(RefineError::InvalidConfig(format!(
                "reinjection.max_run ({}) must be shorter than smoothing.window_size ({})",
                max_run, window_size
            )));
        }
        if min_run > max_run {
            return Err(RefineError::InvalidConfig(format!(
                "reinjection.min_run ({}) exceeds reinjection.max_run ({})",
                min_run, max_run
            )));
        }
        Ok(Self { min_run, max_run })
    }

    pub fn min_run(&self) -> usize {
        self.min_run
    }

    pub fn max_run(&self) -> usize {
        self.max_run
    }

    fn admits(&self, len: usize) -> bool {
        (self.min_run..=self.max_run).contains(&len)
    }
}

/// Maximal run of raw `go`/`none` frames, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoRun {
    pub start: usize,
    pub len: usize,
}

impl GoRun {
    pub fn positions(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardReason {
    /// Frame before the run is `stop` while yielding to a pedestrian.
    PrecedingPedestrianStop,
    /// The smoothed clip yields to a pedestrian inside the run.
    PedestrianYieldInRun,
}

impl GuardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrecedingPedestrianStop => "preceding_pedestrian_stop",
            Self::PedestrianYieldInRun => "pedestrian_yield_in_run",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Restored { frames: usize },
    /// Smoothing already kept the run.
    Unchanged,
    Blocked(GuardReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub start_frame: u64,
    pub end_frame: u64,
    pub len: usize,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone)]
pub struct Reinjection {
    pub frames: Vec<FrameState>,
    /// Eligible runs in frame order.
    pub runs: Vec<RunReport>,
}

pub fn count_restored(runs: &[RunReport]) -> usize {
    runs.iter()
        .map(|r| match r.outcome {
            RunOutcome::Restored { frames } => frames,
            _ => 0,
        })
        .sum()
}

pub fn count_blocked(runs: &[RunReport]) -> usize {
    runs.iter()
        .filter(|r| matches!(r.outcome, RunOutcome::Blocked(_)))
        .count()
}

/// All maximal free-go runs in a raw clip, in frame order.
pub fn free_go_runs(raw: &[FrameState]) -> Vec<GoRun> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, frame) in raw.iter().enumerate() {
        match (frame.state.is_free_go(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(GoRun {
                    start: s,
                    len: i - s,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(GoRun {
            start: s,
            len: raw.len() - s,
        });
    }

    runs
}

fn pedestrian_guard(smoothed: &[FrameState], run: &GoRun) -> Option<GuardReason> {
    if let Some(prev) = run.start.checked_sub(1).map(|p| &smoothed[p]) {
        if prev.state.is_pedestrian_stop() {
            return Some(GuardReason::PrecedingPedestrianStop);
        }
    }
    if smoothed[run.positions()]
        .iter()
        .any(|f| f.state.yield_to == YieldTo::Ped)
    {
        return Some(GuardReason::PedestrianYieldInRun);
    }
    None
}

fn check_alignment(raw: &[FrameState], smoothed: &[FrameState]) -> Result<(), RefineError> {
    if raw.len() != smoothed.len() {
        return Err(RefineError::LengthMismatch {
            raw: raw.len(),
            smoothed: smoothed.len(),
        });
    }
    for (position, (r, s)) in raw.iter().zip(smoothed).enumerate() {
        if r.frame_index != s.frame_index {
            return Err(RefineError::FrameMisaligned {
                position,
                raw: r.frame_index,
                smoothed: s.frame_index,
            });
        }
    }
    Ok(())
}

/// Restore short raw go runs that smoothing suppressed.
///
/// Only positions whose smoothed triple differs from the raw one are
/// rewritten, and they receive exactly the raw frame, so no triple absent
/// from the raw clip at that position is ever produced.
pub fn reinject(
    raw: &[FrameState],
    smoothed: &[FrameState],
    policy: &ReinjectionPolicy,
) -> Result<Reinjection, RefineError> {
    check_alignment(raw, smoothed)?;

    let mut frames = smoothed.to_vec();
    let mut runs = Vec::new();

    for run in free_go_runs(raw) {
        if !policy.admits(run.len) {
            continue;
        }

        let start_frame = raw[run.start].frame_index;
        let end_frame = raw[run.start + run.len - 1].frame_index;

        let outcome = match pedestrian_guard(smoothed, &run) {
            Some(reason) => {
                debug!(
                    "Go run {}-{} held back: {}",
                    start_frame,
                    end_frame,
                    reason.as_str()
                );
                RunOutcome::Blocked(reason)
            }
            None => {
                let mut restored = 0;
                for p in run.positions() {
                    if smoothed[p].state != raw[p].state {
                        frames[p] = raw[p].clone();
                        restored += 1;
                    }
                }
                if restored == 0 {
                    RunOutcome::Unchanged
                } else {
                    debug!(
                        "Go run {}-{} restored ({} frames)",
                        start_frame, end_frame, restored
                    );
                    RunOutcome::Restored { frames: restored }
                }
            }
        };

        runs.push(RunReport {
            start_frame,
            end_frame,
            len: run.len,
            outcome,
        });
    }

    Ok(Reinjection { frames, runs })
}
