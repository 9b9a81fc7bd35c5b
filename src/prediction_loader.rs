// src/prediction_loader.rs

use crate::error::RefineError;
use crate::validator::RawFrameRecord;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Rows of one clip, in file order.
#[derive(Debug)]
pub struct ClipRecords {
    pub clip: String,
    pub records: Vec<RawFrameRecord>,
    /// First row of this clip that could not be read. Fails the clip, not
    /// the batch.
    pub malformed: Option<RefineError>,
}

impl ClipRecords {
    fn new(clip: String) -> Self {
        Self {
            clip,
            records: Vec::new(),
            malformed: None,
        }
    }
}

/// Prediction CSVs under `input`. A file path is returned as is; a
/// directory is searched recursively, skipping anything under `exclude`
/// (the output directory may live inside the input tree).
pub fn find_prediction_files(input: &Path, exclude: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("Prediction input not found: {}", input.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(exclude))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_csv {
            files.push(path.to_path_buf());
        }
    }

    info!("Found {} prediction file(s)", files.len());
    Ok(files)
}

/// Read every file and group rows by clip, in first-seen order. Rows
/// without a `clip` value belong to a clip named after the file stem.
///
/// A row that does not match the header (ragged or undecodable) poisons
/// only the clip it names.
pub fn load_clips(files: &[PathBuf]) -> Result<Vec<ClipRecords>> {
    let mut clips: Vec<ClipRecords> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for path in files {
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip")
            .to_string();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open predictions {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .clone();
        let clip_column = headers.iter().position(|h| h == "clip");

        let mut rows = 0usize;
        for (line, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to read row {} of {}", line + 1, path.display())
            })?;

            let clip = clip_column
                .and_then(|c| record.get(c))
                .filter(|c| !c.is_empty())
                .unwrap_or(fallback.as_str())
                .to_string();

            let slot = *by_name.entry(clip.clone()).or_insert_with(|| {
                clips.push(ClipRecords::new(clip));
                clips.len() - 1
            });
            let entry = &mut clips[slot];
            rows += 1;

            let decoded = if record.len() == headers.len() {
                record
                    .deserialize::<RawFrameRecord>(Some(&headers))
                    .map_err(|e| e.to_string())
            } else {
                Err(format!(
                    "has {} fields, header has {}",
                    record.len(),
                    headers.len()
                ))
            };

            match decoded {
                Ok(raw) => entry.records.push(raw),
                Err(detail) => {
                    warn!(
                        "⚠️  {}: unreadable row {} of {}: {}",
                        entry.clip,
                        line + 1,
                        path.display(),
                        detail
                    );
                    if entry.malformed.is_none() {
                        let row = entry.records.len();
                        entry.malformed = Some(
                            RefineError::schema(
                                "record",
                                format!("{} ({} row {})", detail, path.display(), line + 1),
                            )
                            .at_row(row),
                        );
                    }
                }
            }
        }

        debug!("{}: {} rows", path.display(), rows);
    }

    Ok(clips)
}
