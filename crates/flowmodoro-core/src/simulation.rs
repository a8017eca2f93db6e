//! Deterministic simulation harness for the timer engine.
//!
//! Runs a script of user intents and elapsed time against a
//! [`ManualClock`], ticking at the engine's cadence, so whole sessions can
//! be replayed without waiting on real time. Used by `flowmodoro simulate`
//! and by regression tests.
//!
//! Script syntax, steps separated by `;` or newlines:
//!
//! ```text
//! ratio 2.5; start; wait 25000; break; wait 10s; pause; mute; reset
//! ```

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::alert::{AlertCue, AlertScheduler, MemorySink};
use crate::clock::ManualClock;
use crate::events::Event;
use crate::history::HistoryRecord;
use crate::timer::{EngineOptions, TimerEngine};

/// Fixed starting point so simulated timestamps are reproducible
/// (2024-01-01T00:00:00Z).
pub const SIMULATION_EPOCH_MS: u64 = 1_704_067_200_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("step '{step}' needs an argument")]
    MissingArgument { step: String },

    #[error("invalid duration '{0}' (use milliseconds, or a number followed by ms, s or m)")]
    InvalidDuration(String),

    #[error("invalid preset '{0}'")]
    InvalidPreset(String),
}

/// One scripted user intent or passage of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimStep {
    Start,
    Pause,
    /// The start/pause button.
    Toggle,
    Break,
    Reset,
    Mute,
    /// Custom ratio text, validated when the step runs.
    Ratio(String),
    Preset(u32),
    /// Let this many milliseconds pass, ticking at the engine cadence.
    Wait(u64),
}

impl FromStr for SimStep {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        let need = |arg: Option<&str>| {
            arg.map(str::to_string)
                .ok_or_else(|| ScriptError::MissingArgument { step: name.clone() })
        };

        match name.as_str() {
            "start" => Ok(SimStep::Start),
            "pause" => Ok(SimStep::Pause),
            "toggle" => Ok(SimStep::Toggle),
            "break" => Ok(SimStep::Break),
            "reset" => Ok(SimStep::Reset),
            "mute" => Ok(SimStep::Mute),
            "ratio" => Ok(SimStep::Ratio(need(arg)?)),
            "preset" => {
                let raw = need(arg)?;
                raw.parse()
                    .map(SimStep::Preset)
                    .map_err(|_| ScriptError::InvalidPreset(raw))
            }
            "wait" | "advance" => Ok(SimStep::Wait(parse_duration_ms(&need(arg)?)?)),
            _ => Err(ScriptError::UnknownStep(s.trim().to_string())),
        }
    }
}

/// `1500`, `1500ms`, `10s` or `2m`.
fn parse_duration_ms(raw: &str) -> Result<u64, ScriptError> {
    let invalid = || ScriptError::InvalidDuration(raw.to_string());
    let (digits, factor) = if let Some(n) = raw.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = raw.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = raw.strip_suffix('m') {
        (n, 60_000)
    } else {
        (raw, 1)
    };
    digits
        .parse::<u64>()
        .map_err(|_| invalid())?
        .checked_mul(factor)
        .ok_or_else(invalid)
}

/// Parse a whole script. Blank steps are skipped.
///
/// # Errors
///
/// Returns the first [`ScriptError`] encountered.
pub fn parse_script(script: &str) -> Result<Vec<SimStep>, ScriptError> {
    script
        .split([';', '\n'])
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(str::parse)
        .collect()
}

/// What a simulated session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub events: Vec<Event>,
    /// Ratio inputs the engine refused, with the reason.
    pub rejected: Vec<String>,
    pub alerts_played: usize,
    pub snapshot: Event,
    pub history: Vec<HistoryRecord>,
}

/// An engine wired to a manual clock and a counting alert sink.
pub struct Simulation {
    clock: ManualClock,
    sink: MemorySink,
    engine: TimerEngine,
}

impl Simulation {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_lead_ms(options, crate::alert::DEFAULT_LEAD_MS)
    }

    pub fn with_lead_ms(options: EngineOptions, lead_ms: u64) -> Self {
        let clock = ManualClock::new(SIMULATION_EPOCH_MS);
        let sink = MemorySink::new();
        let alerts = AlertScheduler::new(
            Some(AlertCue::from_bytes("simulated-alert", vec![0])),
            Box::new(sink.clone()),
        )
        .with_lead_ms(lead_ms);
        let engine = TimerEngine::new(options, Arc::new(clock.clone()), alerts);
        Self {
            clock,
            sink,
            engine,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Execute `steps` in order and collect everything that happened.
    pub fn run(&mut self, steps: &[SimStep]) -> SimulationReport {
        let mut events = Vec::new();
        let mut rejected = Vec::new();

        for step in steps {
            match step {
                SimStep::Start => events.extend(self.engine.start()),
                SimStep::Pause => events.extend(self.engine.pause()),
                SimStep::Toggle => events.extend(self.engine.on_start_pause_click()),
                SimStep::Break => events.extend(self.engine.switch_to_break()),
                SimStep::Reset => events.extend(self.engine.reset()),
                SimStep::Mute => {
                    self.engine.toggle_mute();
                }
                SimStep::Ratio(raw) => {
                    if let Err(e) = self.engine.set_ratio(raw) {
                        rejected.push(e.to_string());
                    }
                }
                SimStep::Preset(n) => {
                    if let Err(e) = self.engine.set_ratio_preset(*n) {
                        rejected.push(e.to_string());
                    }
                }
                SimStep::Wait(ms) => events.extend(self.wait(*ms)),
            }
        }

        SimulationReport {
            events,
            rejected,
            alerts_played: self.sink.plays(),
            snapshot: self.engine.snapshot(),
            history: self.engine.history().records().to_vec(),
        }
    }

    /// Let `ms` pass in tick-sized steps.
    pub fn wait(&mut self, ms: u64) -> Vec<Event> {
        let tick = self.engine.tick_interval().as_millis() as u64;
        let mut events = Vec::new();
        let mut left = ms;
        while left > 0 {
            let step = left.min(tick);
            self.clock.advance(step);
            events.extend(self.engine.tick());
            left -= step;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Action;
    use crate::timer::Phase;

    #[test]
    fn parses_script_steps() {
        let script = "ratio 2.5; start\nwait 10s;wait 250ms; wait 2m; preset 3; break;;";
        let steps = parse_script(script).unwrap();
        assert_eq!(
            steps,
            vec![
                SimStep::Ratio("2.5".into()),
                SimStep::Start,
                SimStep::Wait(10_000),
                SimStep::Wait(250),
                SimStep::Wait(120_000),
                SimStep::Preset(3),
                SimStep::Break,
            ]
        );
    }

    #[test]
    fn rejects_bad_steps() {
        assert_eq!(
            parse_script("start; jump"),
            Err(ScriptError::UnknownStep("jump".into()))
        );
        assert!(matches!(
            parse_script("wait"),
            Err(ScriptError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse_script("wait soon"),
            Err(ScriptError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_script("preset -1"),
            Err(ScriptError::InvalidPreset(_))
        ));
    }

    #[test]
    fn one_to_one_session_returns_to_focus() {
        let mut sim = Simulation::new(EngineOptions::default());
        let steps = parse_script("ratio 1; start; wait 10000; break").unwrap();
        sim.run(&steps);
        assert_eq!(sim.engine().break_duration_ms(), 10_000);
        assert_eq!(sim.engine().elapsed_ms(), 10_000);

        let report = sim.run(&[SimStep::Wait(10_000)]);
        assert_eq!(sim.engine().phase(), Phase::Focus);
        assert_eq!(sim.engine().elapsed_ms(), 0);
        assert_eq!(report.alerts_played, 1);
        assert_eq!(report.history.last().unwrap().action, Action::SwitchToFocus);
    }

    #[test]
    fn rejected_ratio_is_reported() {
        let mut sim = Simulation::new(EngineOptions::default());
        let report = sim.run(&parse_script("ratio nope; ratio 0").unwrap());
        assert_eq!(report.rejected.len(), 2);
        assert!(report.history.is_empty());
    }

    #[test]
    fn muted_alert_is_not_played() {
        let mut sim = Simulation::new(EngineOptions::default());
        let script = "preset 1; start; wait 30s; break; mute; wait 30s";
        let report = sim.run(&parse_script(script).unwrap());
        assert_eq!(report.alerts_played, 0);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, Event::AlertFired { audible: false, .. })));
    }
}
