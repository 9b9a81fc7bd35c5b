// src/validator.rs
//
// Boundary between loosely-typed prediction rows and the closed symbolic
// alphabet. Everything downstream assumes frames produced here.

use crate::error::RefineError;
use crate::types::{Affordance, Anomaly, AnomalyKind, FrameState, LeadState, StateTriple, YieldTo};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One prediction row as written by the inference step. Every field is
/// optional here so that a missing column surfaces as a schema error
/// instead of a CSV decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFrameRecord {
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default)]
    pub frame_index: Option<String>,
    #[serde(default)]
    pub affordance: Option<String>,
    #[serde(default)]
    pub yield_to: Option<String>,
    #[serde(default)]
    pub lead_state: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[cfg(test)]
impl RawFrameRecord {
    pub fn new(frame_index: u64, affordance: &str, yield_to: &str, lead_state: &str) -> Self {
        Self {
            clip: None,
            frame_index: Some(frame_index.to_string()),
            affordance: Some(affordance.to_string()),
            yield_to: Some(yield_to.to_string()),
            lead_state: Some(lead_state.to_string()),
            explanation: None,
        }
    }
}

/// A clip that passed validation, sorted by frame index.
#[derive(Debug, Clone)]
pub struct ValidatedClip {
    pub frames: Vec<FrameState>,
    pub anomalies: Vec<Anomaly>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RefineError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RefineError::schema(field, "is missing")),
    }
}

fn token<T>(
    value: &Option<String>,
    field: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, RefineError> {
    let raw = required(value, field)?;
    parse(raw).ok_or_else(|| RefineError::schema(field, format!("has unknown value {:?}", raw)))
}

/// Validate a single record into a frame.
///
/// Contradictory but well-formed triples (go while yielding) are accepted;
/// see [`inconsistency`].
pub fn validate(record: &RawFrameRecord) -> Result<FrameState, RefineError> {
    let index_raw = required(&record.frame_index, "frame_index")?;
    let frame_index = index_raw.parse::<u64>().map_err(|_| {
        RefineError::schema(
            "frame_index",
            format!("is not a non-negative integer: {:?}", index_raw),
        )
    })?;

    let state = StateTriple {
        affordance: token(&record.affordance, "affordance", Affordance::parse)?,
        yield_to: token(&record.yield_to, "yield_to", YieldTo::parse)?,
        lead_state: token(&record.lead_state, "lead_state", LeadState::parse)?,
    };

    Ok(FrameState {
        explanation: record.explanation.clone().unwrap_or_default(),
        ..FrameState::new(frame_index, state)
    })
}

/// Anomaly for a frame whose triple contradicts itself, if any.
pub fn inconsistency(frame: &FrameState) -> Option<Anomaly> {
    if frame.state.is_consistent() {
        return None;
    }
    Some(Anomaly {
        frame_index: frame.frame_index,
        kind: AnomalyKind::InconsistentState,
        state: frame.state,
    })
}

/// Validate every record of one clip. The first malformed record fails the
/// whole clip; a clip is never returned with invalid entries.
pub fn validate_clip(clip: &str, records: &[RawFrameRecord]) -> Result<ValidatedClip, RefineError> {
    let mut frames = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        frames.push(validate(record).map_err(|e| e.at_row(row))?);
    }

    if frames.is_empty() {
        return Err(RefineError::EmptySequence {
            clip: clip.to_string(),
        });
    }

    frames.sort_by_key(|f| f.frame_index);

    let mut seen = HashSet::with_capacity(frames.len());
    for frame in &frames {
        if !seen.insert(frame.frame_index) {
            return Err(RefineError::DuplicateFrame {
                frame_index: frame.frame_index,
            });
        }
    }

    let anomalies: Vec<Anomaly> = frames.iter().filter_map(inconsistency).collect();
    for anomaly in &anomalies {
        warn!(
            "⚠️  {}: frame {} has inconsistent state {}",
            clip, anomaly.frame_index, anomaly.state
        );
    }

    debug!(
        "{}: {} frames validated ({} anomalies)",
        clip,
        frames.len(),
        anomalies.len()
    );

    Ok(ValidatedClip { frames, anomalies })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let mut record = RawFrameRecord::new(4, "wait", "lead", "stopped");
        record.explanation = Some("queue at light".to_string());

        let frame = validate(&record).unwrap();
        assert_eq!(frame.frame_index, 4);
        assert_eq!(
            frame.state,
            StateTriple::new(Affordance::Wait, YieldTo::Lead, LeadState::Stopped)
        );
        assert_eq!(frame.explanation, "queue at light");
    }

    #[test]
    fn test_tokens_are_normalized() {
        let record = RawFrameRecord::new(0, " GO ", "None", "MOVING");
        let frame = validate(&record).unwrap();
        assert_eq!(
            frame.state,
            StateTriple::new(Affordance::Go, YieldTo::None, LeadState::Moving)
        );
    }

    #[test]
    fn test_unknown_token_rejected() {
        let record = RawFrameRecord::new(0, "go", "cyclist", "none");
        match validate(&record) {
            Err(RefineError::Schema { field, .. }) => assert_eq!(field, "yield_to"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_bad_frame_index() {
        let mut record = RawFrameRecord::new(0, "go", "none", "none");
        record.frame_index = None;
        assert!(matches!(
            validate(&record),
            Err(RefineError::Schema {
                field: "frame_index",
                ..
            })
        ));

        for bad in ["-1", "3.5", "abc", "  "] {
            record.frame_index = Some(bad.to_string());
            assert!(
                matches!(
                    validate(&record),
                    Err(RefineError::Schema {
                        field: "frame_index",
                        ..
                    })
                ),
                "frame_index {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_missing_lead_state_rejected() {
        let mut record = RawFrameRecord::new(0, "go", "none", "none");
        record.lead_state = None;
        assert!(matches!(
            validate(&record),
            Err(RefineError::Schema {
                field: "lead_state",
                ..
            })
        ));
    }

    #[test]
    fn test_inconsistent_triple_passes_and_is_flagged() {
        let records = vec![
            RawFrameRecord::new(4, "wait", "lead", "moving"),
            RawFrameRecord::new(5, "go", "lead", "moving"),
        ];
        let clip = validate_clip("clip1", &records).unwrap();

        assert_eq!(clip.frames.len(), 2);
        assert_eq!(clip.anomalies.len(), 1);
        assert_eq!(clip.anomalies[0].frame_index, 5);
        assert_eq!(clip.anomalies[0].kind, AnomalyKind::InconsistentState);
        // Never silently corrected
        assert_eq!(clip.frames[1].state.affordance, Affordance::Go);
        assert_eq!(clip.frames[1].state.yield_to, YieldTo::Lead);
    }

    #[test]
    fn test_clip_sorted_by_frame_index() {
        let records = vec![
            RawFrameRecord::new(7, "go", "none", "none"),
            RawFrameRecord::new(2, "stop", "ped", "none"),
            RawFrameRecord::new(5, "wait", "ped", "none"),
        ];
        let clip = validate_clip("clip1", &records).unwrap();
        let indices: Vec<u64> = clip.frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![2, 5, 7]);
    }

    #[test]
    fn test_bad_row_fails_clip_with_row_number() {
        let records = vec![
            RawFrameRecord::new(0, "go", "none", "none"),
            RawFrameRecord::new(1, "maybe", "none", "none"),
        ];
        match validate_clip("clip1", &records) {
            Err(RefineError::Schema { row, field, .. }) => {
                assert_eq!(row, Some(1));
                assert_eq!(field, "affordance");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_clip_rejected() {
        assert!(matches!(
            validate_clip("clip9", &[]),
            Err(RefineError::EmptySequence { .. })
        ));
    }

    #[test]
    fn test_duplicate_frame_rejected() {
        let records = vec![
            RawFrameRecord::new(3, "go", "none", "none"),
            RawFrameRecord::new(3, "wait", "none", "none"),
        ];
        assert!(matches!(
            validate_clip("clip1", &records),
            Err(RefineError::DuplicateFrame { frame_index: 3 })
        ));
    }
}
