use super::Phase;

pub const FOCUS_TEXT: &str = "Focusing...";
pub const BREAK_TEXT: &str = "On Break";
pub const PAUSED_TEXT: &str = "Timer Paused";

/// Format milliseconds as `m:ss.d` (minutes, seconds, tenths).
pub fn format_clock(ms: u64) -> String {
    let mins = ms / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let tenths = (ms % 1_000) / 100;
    format!("{mins}:{secs:02}.{tenths}")
}

/// Progress line text for the current state.
pub fn status_label(phase: Phase, running: bool) -> &'static str {
    match (running, phase) {
        (false, _) => PAUSED_TEXT,
        (true, Phase::Focus) => FOCUS_TEXT,
        (true, Phase::Break) => BREAK_TEXT,
    }
}
