// src/report_writer.rs
//
// Tabular outputs for downstream consumers (gloss generation, overlay,
// evaluation). One directory per clip, rows ordered by frame index.

use crate::pipeline::ClipRun;
use crate::types::FrameState;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SMOOTHED_FILE: &str = "world_state_smoothed.csv";
pub const FINAL_FILE: &str = "world_state_final.csv";
pub const SEGMENTS_FILE: &str = "world_state_segments.csv";
pub const PLANNER_FILE: &str = "planner_commands.csv";
pub const SPANS_FILE: &str = "planner_spans.csv";
pub const ANOMALIES_FILE: &str = "anomalies.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Serialize)]
struct StateRow {
    frame_index: u64,
    affordance: &'static str,
    yield_to: &'static str,
    lead_state: &'static str,
}

impl From<&FrameState> for StateRow {
    fn from(frame: &FrameState) -> Self {
        Self {
            frame_index: frame.frame_index,
            affordance: frame.state.affordance.as_str(),
            yield_to: frame.state.yield_to.as_str(),
            lead_state: frame.state.lead_state.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SegmentRow {
    segment_id: usize,
    start_frame: u64,
    end_frame: u64,
    affordance: &'static str,
    yield_to: &'static str,
    lead_state: &'static str,
    phase_label: &'static str,
}

#[derive(Debug, Serialize)]
struct CommandRow {
    frame_index: u64,
    command: &'static str,
    rule: &'static str,
    reason: &'static str,
    target: &'static str,
    until: &'static str,
}

#[derive(Debug, Serialize)]
struct SpanRow {
    span_id: usize,
    start_frame: u64,
    end_frame: u64,
    command: &'static str,
    prev_command: &'static str,
    next_command: &'static str,
}

#[derive(Debug, Serialize)]
struct AnomalyRow {
    frame_index: u64,
    reason: String,
}

/// Directory name for a clip; path separators are flattened.
pub fn clip_dir(output_dir: &Path, clip: &str) -> PathBuf {
    let safe: String = clip
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    output_dir.join(safe)
}

pub fn planner_table_path(output_dir: &Path, clip: &str) -> PathBuf {
    clip_dir(output_dir, clip).join(PLANNER_FILE)
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("💾 {}", path.display());
    Ok(())
}

/// Write every table for one clip and return the clip's directory.
///
/// Tables are written into a staging directory that replaces the clip's
/// directory only once every table is on disk, so the planner table never
/// exists next to a partial set of outputs.
pub fn write_clip_outputs(output_dir: &Path, run: &ClipRun) -> Result<PathBuf> {
    let dir = clip_dir(output_dir, &run.clip);
    publish(&dir, |staging| write_tables(staging, run))?;
    Ok(dir)
}

fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.with_file_name(format!(".{}.partial", name))
}

fn publish<F>(dir: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let staging = staging_dir(dir);
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("Failed to clear {}", staging.display()))?;
    }
    fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;

    if let Err(e) = write(&staging) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            warn!("Failed to remove {}: {}", staging.display(), cleanup);
        }
        return Err(e);
    }

    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Failed to replace {}", dir.display()))?;
    }
    fs::rename(&staging, dir)
        .with_context(|| format!("Failed to move outputs into {}", dir.display()))?;
    Ok(())
}

fn write_tables(dir: &Path, run: &ClipRun) -> Result<()> {
    write_rows(&dir.join(SMOOTHED_FILE), run.smoothed.iter().map(StateRow::from))?;
    write_rows(&dir.join(FINAL_FILE), run.final_frames.iter().map(StateRow::from))?;

    write_rows(
        &dir.join(SEGMENTS_FILE),
        run.segments.iter().map(|s| SegmentRow {
            segment_id: s.segment_id,
            start_frame: s.start_frame,
            end_frame: s.end_frame,
            affordance: s.state.affordance.as_str(),
            yield_to: s.state.yield_to.as_str(),
            lead_state: s.state.lead_state.as_str(),
            phase_label: s.phase_label,
        }),
    )?;

    write_rows(
        &dir.join(SPANS_FILE),
        run.spans.iter().map(|s| SpanRow {
            span_id: s.span_id,
            start_frame: s.start_frame,
            end_frame: s.end_frame,
            command: s.command.as_str(),
            prev_command: s.prev_command.map(|c| c.as_str()).unwrap_or(""),
            next_command: s.next_command.map(|c| c.as_str()).unwrap_or(""),
        }),
    )?;

    write_rows(
        &dir.join(ANOMALIES_FILE),
        run.anomalies.iter().map(|a| AnomalyRow {
            frame_index: a.frame_index,
            reason: a.reason(),
        }),
    )?;

    // Last: its presence marks the clip as cached
    write_rows(
        &dir.join(PLANNER_FILE),
        run.decisions.iter().map(|d| CommandRow {
            frame_index: d.frame_index,
            command: d.command.as_str(),
            rule: d.rule.as_str(),
            reason: d.reason,
            target: d.target,
            until: d.until,
        }),
    )?;

    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
