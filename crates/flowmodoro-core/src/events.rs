use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryRecord;
use crate::ratio::Ratio;
use crate::timer::Phase;

/// Every state change in the engine produces an Event.
/// The presentation layer renders from them; the snapshot is polled each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        total_duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// Focus ended by the user; the break length is now fixed.
    SwitchedToBreak {
        focus_ms: u64,
        break_duration_ms: u64,
        ratio: Ratio,
        at: DateTime<Utc>,
    },
    /// The break ran out and the timer went back to focus on its own.
    SwitchedToFocus {
        break_duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// The pre-expiry break alert came due.
    AlertFired {
        audible: bool,
        at: DateTime<Utc>,
    },
    /// A record was appended. Carries the newest records, oldest first, so
    /// the history view can be redrawn without asking the engine.
    HistoryAppended {
        records: Vec<HistoryRecord>,
    },
    StateSnapshot {
        phase: Phase,
        running: bool,
        elapsed_ms: u64,
        break_duration_ms: u64,
        total_duration_ms: u64,
        ratio: Ratio,
        /// Remaining share of the break, 0.0 .. 1.0. Always 0.0 in focus.
        break_progress: f64,
        status: String,
        at: DateTime<Utc>,
    },
}
