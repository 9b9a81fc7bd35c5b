use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub smoothing: SmoothingConfig,
    pub reinjection: ReinjectionConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub window_size: usize,
    pub alignment: WindowAlignment,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            alignment: WindowAlignment::Trailing,
        }
    }
}

/// Where the majority-vote window sits relative to the frame being smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAlignment {
    /// Frames `i - w + 1 ..= i`. Causal: no look-ahead.
    #[default]
    Trailing,
    /// Frames `i - w/2 ..= i + (w-1)/2`, exactly `w` wide. An even window
    /// takes its extra frame from the past.
    Centered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinjectionConfig {
    pub enabled: bool,
    pub min_run: usize,
    /// Defaults to `window_size - 1` when absent.
    pub max_run: Option<usize>,
}

impl Default for ReinjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_run: 1,
            max_run: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_path: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_path: "data/predictions".to_string(),
            output_dir: "data/predictions/refined".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// SYMBOLIC ALPHABET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affordance {
    Go,
    Wait,
    Stop,
}

impl Affordance {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "go" => Some(Self::Go),
            "wait" => Some(Self::Wait),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Wait => "wait",
            Self::Stop => "stop",
        }
    }

    /// stop > wait > go
    fn caution_rank(&self) -> u8 {
        match self {
            Self::Go => 0,
            Self::Wait => 1,
            Self::Stop => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldTo {
    None,
    Lead,
    Ped,
}

impl YieldTo {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "lead" => Some(Self::Lead),
            "ped" => Some(Self::Ped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lead => "lead",
            Self::Ped => "ped",
        }
    }

    /// ped > lead > none
    fn caution_rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lead => 1,
            Self::Ped => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadState {
    None,
    Moving,
    Stopped,
}

impl LeadState {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "moving" => Some(Self::Moving),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Moving => "moving",
            Self::Stopped => "stopped",
        }
    }

    /// stopped > moving > none
    fn caution_rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Moving => 1,
            Self::Stopped => 2,
        }
    }
}

/// The (affordance, yield_to, lead_state) triple describing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateTriple {
    pub affordance: Affordance,
    pub yield_to: YieldTo,
    pub lead_state: LeadState,
}

impl StateTriple {
    pub const fn new(affordance: Affordance, yield_to: YieldTo, lead_state: LeadState) -> Self {
        Self {
            affordance,
            yield_to,
            lead_state,
        }
    }

    /// Total order used to break majority-vote ties. Larger is more
    /// conservative. Affordance dominates, then the yield target, then the
    /// lead state, so two distinct triples never compare equal.
    pub fn caution_key(&self) -> (u8, u8, u8) {
        (
            self.affordance.caution_rank(),
            self.yield_to.caution_rank(),
            self.lead_state.caution_rank(),
        )
    }

    /// `go` with nothing to yield to.
    pub fn is_free_go(&self) -> bool {
        self.affordance == Affordance::Go && self.yield_to == YieldTo::None
    }

    /// A `go` affordance that coexists with a yield target is contradictory.
    pub fn is_consistent(&self) -> bool {
        !(self.affordance == Affordance::Go && self.yield_to != YieldTo::None)
    }

    pub fn is_pedestrian_stop(&self) -> bool {
        self.affordance == Affordance::Stop && self.yield_to == YieldTo::Ped
    }
}

impl fmt::Display for StateTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.affordance.as_str(),
            self.yield_to.as_str(),
            self.lead_state.as_str()
        )
    }
}

/// One validated frame of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub frame_index: u64,
    pub state: StateTriple,
    /// Informational only; never read by any stage's control flow.
    pub explanation: String,
}

impl FrameState {
    pub fn new(frame_index: u64, state: StateTriple) -> Self {
        Self {
            frame_index,
            state,
            explanation: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub segment_id: usize,
    pub start_frame: u64,
    pub end_frame: u64,
    pub frame_count: usize,
    pub state: StateTriple,
    pub phase_label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlannerCommand {
    Follow,
    Go,
    Wait,
    Stop,
    Yield,
}

impl PlannerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "FOLLOW",
            Self::Go => "GO",
            Self::Wait => "WAIT",
            Self::Stop => "STOP",
            Self::Yield => "YIELD",
        }
    }
}

impl fmt::Display for PlannerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Syntactically valid triple that contradicts itself (go + active yield).
    InconsistentState,
    /// No planner precedence rule matched; WAIT was emitted.
    PlannerFallback,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InconsistentState => "inconsistent_state",
            Self::PlannerFallback => "planner_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub frame_index: u64,
    pub kind: AnomalyKind,
    pub state: StateTriple,
}

impl Anomaly {
    pub fn reason(&self) -> String {
        format!("{} {}", self.kind.as_str(), self.state)
    }
}
