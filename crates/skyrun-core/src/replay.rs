//! Headless replays: run a scripted input sequence against a seeded world
//! and record one trace row per tick.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::rng::SeededRandom;
use crate::{FrameInput, SimulationState, step};

/// CSV header matching [`TraceRow::to_csv`].
pub const CSV_HEADER: &str = "tick,y,vy,jumping,shift,ground,platforms,distance";

/// A replay file: seed plus a run-length encoded input script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub seed: u64,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    /// Number of ticks this input is held for.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

impl ScriptStep {
    pub fn input(&self) -> FrameInput {
        FrameInput {
            left: self.left,
            right: self.right,
            jump: self.jump,
        }
    }
}

impl ReplayScript {
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        serde_json::from_str(text).map_err(|e| ReplayError::Parse(e.to_string()))
    }

    /// Total ticks the script covers.
    pub fn tick_count(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.repeat)).sum()
    }

    /// Expand the run-length encoding into one input per tick.
    pub fn inputs(&self) -> impl Iterator<Item = FrameInput> + '_ {
        self.steps
            .iter()
            .flat_map(|s| std::iter::repeat_n(s.input(), s.repeat as usize))
    }
}

/// Player and world summary after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceRow {
    pub tick: u64,
    pub y: f32,
    pub vy: f32,
    pub jumping: bool,
    /// Total scroll, including blocks folded into the world origin.
    pub shift: f64,
    pub ground: usize,
    pub platforms: usize,
    pub distance: i64,
}

impl TraceRow {
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            tick: state.tick,
            y: state.player.y,
            vy: state.player.vy,
            jumping: state.player.jumping,
            shift: state.world.total_shift(state.config.world.block_size),
            ground: state.world.ground.len(),
            platforms: state.world.platforms.len(),
            distance: state.distance_blocks(),
        }
    }

    pub fn to_csv(&self) -> String {
        format!(
            "{},{:.3},{:.3},{},{:.3},{},{},{}",
            self.tick,
            self.y,
            self.vy,
            u8::from(self.jumping),
            self.shift,
            self.ground,
            self.platforms,
            self.distance
        )
    }
}

/// Result of running a script to completion.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub trace: Vec<TraceRow>,
    pub final_state: SimulationState,
}

/// Run `script` in fixed-tick mode. The script's seed overrides any seed in
/// `config`.
pub fn run(config: SimConfig, script: &ReplayScript) -> ReplayOutcome {
    let mut rng = SeededRandom::new(script.seed);
    let mut state = SimulationState::new(config, &mut rng);
    let mut trace = Vec::with_capacity(usize::try_from(script.tick_count()).unwrap_or(0));

    for input in script.inputs() {
        step(&mut state, &input, 1.0, &mut rng);
        trace.push(TraceRow::capture(&state));
    }

    tracing::info!(
        seed = script.seed,
        ticks = state.tick,
        distance = state.distance_blocks(),
        "replay finished"
    );
    ReplayOutcome {
        trace,
        final_state: state,
    }
}

#[derive(Debug)]
pub enum ReplayError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read replay script: {e}"),
            Self::Parse(m) => write!(f, "invalid replay script: {m}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(_) => None,
        }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
