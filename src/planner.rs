// src/planner.rs
//
// Per-frame planner decisions. Rules are checked top-down and the first
// match wins:
//
//   1. stop                     → STOP
//   2. yield to pedestrian      → YIELD
//   3. yield to stopped lead    → WAIT
//   4. yield to moving lead     → FOLLOW
//   5. go                       → GO
//   6. anything else            → WAIT (recorded as an anomaly)
//
// No cross-frame state is consulted; temporal coherence is the smoother's
// and reinjector's job.

use crate::types::{
    Affordance, Anomaly, AnomalyKind, FrameState, LeadState, PlannerCommand, StateTriple, YieldTo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedenceRule {
    Stop,
    PedestrianYield,
    StoppedLead,
    MovingLead,
    Go,
    Fallback,
}

impl PrecedenceRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::PedestrianYield => "pedestrian_yield",
            Self::StoppedLead => "stopped_lead",
            Self::MovingLead => "moving_lead",
            Self::Go => "go",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerDecision {
    pub frame_index: u64,
    pub command: PlannerCommand,
    pub rule: PrecedenceRule,
    pub reason: &'static str,
    /// `ped`, `lead` or empty
    pub target: &'static str,
    /// Condition that ends the decision
    pub until: &'static str,
}

fn rule_for(state: &StateTriple) -> PrecedenceRule {
    if state.affordance == Affordance::Stop {
        PrecedenceRule::Stop
    } else if state.yield_to == YieldTo::Ped {
        PrecedenceRule::PedestrianYield
    } else if state.yield_to == YieldTo::Lead && state.lead_state == LeadState::Stopped {
        PrecedenceRule::StoppedLead
    } else if state.yield_to == YieldTo::Lead && state.lead_state == LeadState::Moving {
        PrecedenceRule::MovingLead
    } else if state.affordance == Affordance::Go {
        PrecedenceRule::Go
    } else {
        PrecedenceRule::Fallback
    }
}

/// Planner command for one frame. Pure: the same frame always maps to the
/// same command.
pub fn synthesize(frame: &FrameState) -> PlannerCommand {
    match rule_for(&frame.state) {
        PrecedenceRule::Stop => PlannerCommand::Stop,
        PrecedenceRule::PedestrianYield => PlannerCommand::Yield,
        PrecedenceRule::StoppedLead => PlannerCommand::Wait,
        PrecedenceRule::MovingLead => PlannerCommand::Follow,
        PrecedenceRule::Go => PlannerCommand::Go,
        PrecedenceRule::Fallback => PlannerCommand::Wait,
    }
}

/// Full decision for one frame, including its rationale.
pub fn decide(frame: &FrameState) -> PlannerDecision {
    let rule = rule_for(&frame.state);

    let (reason, target, until) = match rule {
        PrecedenceRule::Stop => match frame.state.yield_to {
            YieldTo::Ped => ("pedestrian_blocking", "ped", "ped_clears"),
            YieldTo::Lead => ("lead_vehicle_stopped", "lead", "lead_moves"),
            YieldTo::None => ("stop_required", "", "scene_resolves"),
        },
        PrecedenceRule::PedestrianYield => ("pedestrian_in_path", "ped", "ped_clears"),
        PrecedenceRule::StoppedLead => ("traffic_queue", "lead", "lead_moves"),
        PrecedenceRule::MovingLead => ("lead_moving", "lead", "lead_stops"),
        PrecedenceRule::Go => ("corridor_clear", "", "constraint_reappears"),
        PrecedenceRule::Fallback => ("unknown_state", "", "state_resolved"),
    };

    PlannerDecision {
        frame_index: frame.frame_index,
        command: synthesize(frame),
        rule,
        reason,
        target,
        until,
    }
}

/// One decision per frame, plus an anomaly for every fallback.
pub fn plan(frames: &[FrameState]) -> (Vec<PlannerDecision>, Vec<Anomaly>) {
    let mut anomalies = Vec::new();
    let decisions = frames
        .iter()
        .map(|frame| {
            let decision = decide(frame);
            if decision.rule == PrecedenceRule::Fallback {
                anomalies.push(Anomaly {
                    frame_index: frame.frame_index,
                    kind: AnomalyKind::PlannerFallback,
                    state: frame.state,
                });
            }
            decision
        })
        .collect();
    (decisions, anomalies)
}

/// Run of consecutive frames holding one planner command.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSpan {
    pub span_id: usize,
    pub start_frame: u64,
    pub end_frame: u64,
    pub command: PlannerCommand,
    pub prev_command: Option<PlannerCommand>,
    pub next_command: Option<PlannerCommand>,
}

/// Collapse per-frame decisions into command spans linked to their
/// neighbours.
pub fn command_spans(decisions: &[PlannerDecision]) -> Vec<PlannerSpan> {
    let mut spans: Vec<PlannerSpan> = Vec::new();

    for decision in decisions {
        if let Some(span) = spans.last_mut() {
            if span.command == decision.command {
                span.end_frame = decision.frame_index;
                continue;
            }
        }

        let span_id = spans.len();
        let prev_command = spans.last().map(|s| s.command);
        spans.push(PlannerSpan {
            span_id,
            start_frame: decision.frame_index,
            end_frame: decision.frame_index,
            command: decision.command,
            prev_command,
            next_command: None,
        });
    }

    for i in 1..spans.len() {
        spans[i - 1].next_command = Some(spans[i].command);
    }

    spans
}
