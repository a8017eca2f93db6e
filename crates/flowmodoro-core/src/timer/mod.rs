mod controls;
mod display;
mod engine;

pub use display::{format_clock, status_label, FOCUS_TEXT, BREAK_TEXT, PAUSED_TEXT};
pub use engine::{EngineOptions, TimerEngine, DEFAULT_TICK_INTERVAL_MS};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which half of the cycle the timer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Elapsed time counts up.
    #[default]
    Focus,
    /// Elapsed time counts down to zero.
    Break,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Focus => f.write_str("Focus"),
            Phase::Break => f.write_str("Break"),
        }
    }
}

/// The engine's mutable record.
///
/// `running` and `last_tick_at` move together: a running timer always has a
/// tick reference point, a stopped one never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: Phase,
    pub running: bool,
    /// Focus: time spent focusing. Break: time left in the break.
    pub elapsed_ms: u64,
    /// Set once per Focus -> Break switch.
    pub break_duration_ms: u64,
    /// Session-wide running time across both phases. Never reset.
    pub total_duration_ms: u64,
    /// Clock reading (epoch ms) of the previous tick.
    pub last_tick_at: Option<u64>,
}
