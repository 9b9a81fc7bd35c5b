// src/segmenter.rs
//
// Splits a denoised clip into maximal runs of one state triple and names
// each run. Segmentation is read-only over its input.

use crate::types::{Affordance, FrameState, LeadState, Segment, StateTriple, YieldTo};

pub const UNKNOWN_PHASE: &str = "UNKNOWN phase";

/// Human-readable phase for a triple, keyed on affordance first. The only
/// triples left without a phase are `go` ones that also yield to something
/// other than a moving lead; those are contradictory and get
/// [`UNKNOWN_PHASE`].
pub fn phase_label(state: &StateTriple) -> &'static str {
    use Affordance as A;
    use LeadState as L;
    use YieldTo as Y;

    match (state.affordance, state.yield_to, state.lead_state) {
        (A::Stop, Y::Ped, _) => "STOP for pedestrian",
        (A::Stop, Y::Lead, _) => "STOP behind vehicle",
        (A::Stop, Y::None, _) => "STOP",

        (A::Wait, Y::Ped, _) => "YIELD to pedestrian",
        (A::Wait, Y::Lead, L::Stopped) => "QUEUE behind stopped vehicle",
        (A::Wait, Y::Lead, L::Moving) => "FOLLOW moving lead",
        (A::Wait, Y::Lead, L::None) => "FOLLOW / queue",
        (A::Wait, Y::None, _) => "WAIT",

        (A::Go, Y::Lead, L::Moving) => "FOLLOW moving lead",
        (A::Go, Y::None, L::Moving) => "GO behind moving lead",
        (A::Go, Y::None, _) => "GO",
        (A::Go, _, _) => UNKNOWN_PHASE,
    }
}

/// Group consecutive frames (by position, gaps in `frame_index` are
/// ignored) sharing a triple into segments.
pub fn segment(sequence: &[FrameState]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    let Some(first) = sequence.first() else {
        return segments;
    };

    let mut current = open_segment(0, first);

    for frame in &sequence[1..] {
        if frame.state == current.state {
            current.end_frame = frame.frame_index;
            current.frame_count += 1;
        } else {
            let next = open_segment(current.segment_id + 1, frame);
            segments.push(std::mem::replace(&mut current, next));
        }
    }

    segments.push(current);
    segments
}

fn open_segment(segment_id: usize, frame: &FrameState) -> Segment {
    Segment {
        segment_id,
        start_frame: frame.frame_index,
        end_frame: frame.frame_index,
        frame_count: 1,
        state: frame.state,
        phase_label: phase_label(&frame.state),
    }
}
