//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` at a
//! fixed cadence while the timer runs.
//!
//! ## State Transitions
//!
//! ```text
//!            start                 switch_to_break
//! Idle ──────────────► Focus ───────────────────────► Break
//!   ▲                   │  ▲                            │
//!   │ reset       pause │  └──── break reaches zero ────┘
//!   │                   ▼
//!   └──────────────── Paused (start resumes the same phase)
//! ```
//!
//! Elapsed time is accumulated from clock deltas rather than fixed
//! increments, so late or coalesced ticks do not lose time. A break that
//! would go below zero switches back to focus instead.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(EngineOptions::default(), clock, alerts);
//! engine.start();
//! // Every `engine.tick_interval()`:
//! for event in engine.tick() { /* render */ }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::display::status_label;
use super::{Phase, TimerState};
use crate::alert::{AlertScheduler, ScheduledAlert};
use crate::clock::{timestamp, Clock};
use crate::error::RatioError;
use crate::events::Event;
use crate::history::{Action, HistoryLog, RENDER_LIMIT};
use crate::ratio::{Ratio, RatioBounds, RatioPrecision, RatioStore};

/// Cadence of the driver loop.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 25;

/// Construction-time switches for one engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub initial_ratio: Ratio,
    pub ratio_bounds: RatioBounds,
    pub ratio_precision: RatioPrecision,
    /// When false the alert scheduler is never armed.
    pub alert_enabled: bool,
    pub tick_interval_ms: u64,
    /// Records carried by each [`Event::HistoryAppended`].
    pub history_limit: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_ratio: Ratio::DEFAULT,
            ratio_bounds: RatioBounds::capped(),
            ratio_precision: RatioPrecision::OneDecimal,
            alert_enabled: true,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_limit: RENDER_LIMIT,
        }
    }
}

/// Core timer engine.
///
/// Owns the timer state and the ratio it reads, and notifies the alert
/// scheduler and history log on every transition. Every command returns the
/// events it caused: the transition itself followed by
/// [`Event::HistoryAppended`]. Illegal commands are silent no-ops that return
/// nothing; nothing here returns an error except ratio entry.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    state: TimerState,
    ratio: RatioStore,
    alerts: AlertScheduler,
    history: HistoryLog,
    alert_enabled: bool,
    tick_interval_ms: u64,
    history_limit: usize,
}

impl TimerEngine {
    /// Create an idle engine in the focus phase with all durations at zero.
    pub fn new(options: EngineOptions, clock: Arc<dyn Clock>, alerts: AlertScheduler) -> Self {
        Self {
            clock,
            state: TimerState::default(),
            ratio: RatioStore::new(
                options.initial_ratio,
                options.ratio_bounds,
                options.ratio_precision,
            ),
            alerts,
            history: HistoryLog::new(),
            alert_enabled: options.alert_enabled,
            tick_interval_ms: options.tick_interval_ms.max(1),
            history_limit: options.history_limit,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.state.elapsed_ms
    }

    pub fn break_duration_ms(&self) -> u64 {
        self.state.break_duration_ms
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.state.total_duration_ms
    }

    pub fn ratio(&self) -> Ratio {
        self.ratio.ratio()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn alerts(&self) -> &AlertScheduler {
        &self.alerts
    }

    pub fn pending_alert(&self) -> Option<ScheduledAlert> {
        self.alerts.pending()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Remaining share of the break, 1.0 at its start and 0.0 at its end.
    /// Always 0.0 during focus.
    pub fn break_progress(&self) -> f64 {
        if self.state.phase != Phase::Break || self.state.break_duration_ms == 0 {
            return 0.0;
        }
        (self.state.elapsed_ms as f64 / self.state.break_duration_ms as f64).min(1.0)
    }

    pub fn status(&self) -> &'static str {
        status_label(self.state.phase, self.state.running)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            running: self.state.running,
            elapsed_ms: self.state.elapsed_ms,
            break_duration_ms: self.state.break_duration_ms,
            total_duration_ms: self.state.total_duration_ms,
            ratio: self.ratio(),
            break_progress: self.break_progress(),
            status: self.status().to_string(),
            at: self.clock.now_utc(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume in the current phase. No-op while running.
    pub fn start(&mut self) -> Vec<Event> {
        if self.state.running {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        self.state.running = true;
        self.state.last_tick_at = Some(now);
        let appended = self.record(Action::Start, now);
        self.reschedule_alert(now);

        debug!(phase = %self.state.phase, elapsed_ms = self.state.elapsed_ms, "timer started");
        let started = Event::TimerStarted {
            phase: self.state.phase,
            elapsed_ms: self.state.elapsed_ms,
            at: timestamp(now),
        };
        vec![started, appended]
    }

    /// Stop ticking and drop any pending alert. No-op while stopped.
    pub fn pause(&mut self) -> Vec<Event> {
        if !self.state.running {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        self.state.running = false;
        self.state.last_tick_at = None;
        self.alerts.cancel();
        let appended = self.record(Action::Pause, now);

        debug!(phase = %self.state.phase, elapsed_ms = self.state.elapsed_ms, "timer paused");
        let paused = Event::TimerPaused {
            phase: self.state.phase,
            elapsed_ms: self.state.elapsed_ms,
            at: timestamp(now),
        };
        vec![paused, appended]
    }

    /// Stop and return to an idle focus phase. The session total is kept.
    pub fn reset(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        self.state.running = false;
        self.state.last_tick_at = None;
        self.alerts.cancel();
        self.state.phase = Phase::Focus;
        self.state.elapsed_ms = 0;
        self.state.break_duration_ms = 0;
        let appended = self.record(Action::Reset, now);

        debug!(total_duration_ms = self.state.total_duration_ms, "timer reset");
        let reset = Event::TimerReset {
            total_duration_ms: self.state.total_duration_ms,
            at: timestamp(now),
        };
        vec![reset, appended]
    }

    /// End focus and start a break earned at the current ratio.
    ///
    /// Only legal while running in focus; otherwise a no-op.
    pub fn switch_to_break(&mut self) -> Vec<Event> {
        if !self.state.running || self.state.phase != Phase::Focus {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let ratio = self.ratio();
        let focus_ms = self.state.elapsed_ms;
        let break_ms = ratio.break_duration_ms(focus_ms);

        self.state.phase = Phase::Break;
        self.state.break_duration_ms = break_ms;
        self.state.elapsed_ms = break_ms;
        self.reschedule_alert(now);
        let appended = self.record(Action::SwitchToBreak, now);

        debug!(focus_ms, break_ms, %ratio, "switched to break");
        let switched = Event::SwitchedToBreak {
            focus_ms,
            break_duration_ms: break_ms,
            ratio,
            at: timestamp(now),
        };
        vec![switched, appended]
    }

    /// Advance by the wall-clock time since the previous tick.
    ///
    /// Called by the driver loop only. Returns the events this tick caused:
    /// a due break alert and/or the automatic switch back to focus with its
    /// history record.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(last) = self.state.last_tick_at else {
            return events;
        };
        let now = self.clock.now_ms();
        let delta = now.saturating_sub(last);
        self.state.last_tick_at = Some(now);
        self.state.total_duration_ms = self.state.total_duration_ms.saturating_add(delta);

        if let Some(fired) = self.alerts.poll(now) {
            events.push(Event::AlertFired {
                audible: fired.audible,
                at: timestamp(fired.at_ms),
            });
        }

        match self.state.phase {
            Phase::Focus => {
                self.state.elapsed_ms = self.state.elapsed_ms.saturating_add(delta);
            }
            Phase::Break if delta >= self.state.elapsed_ms => {
                events.extend(self.switch_to_focus(now));
            }
            Phase::Break => {
                self.state.elapsed_ms -= delta;
            }
        }
        events
    }

    /// Replace the ratio from user text such as `"2.5"`.
    ///
    /// Takes effect at the next switch to break; a running break keeps its
    /// length.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`] and keeps the previous ratio if the text is
    /// not a positive number within bounds.
    pub fn set_ratio(&mut self, raw: &str) -> Result<Ratio, RatioError> {
        self.ratio.set_ratio(raw).inspect_err(|e| {
            warn!(error = %e, "ratio rejected");
        })
    }

    /// Replace the ratio with a whole `n:1` preset.
    ///
    /// # Errors
    ///
    /// See [`TimerEngine::set_ratio`].
    pub fn set_ratio_preset(&mut self, n: u32) -> Result<Ratio, RatioError> {
        self.ratio
            .set_ratio_value(f64::from(n))
            .inspect_err(|e| warn!(error = %e, "ratio preset rejected"))
    }

    /// Flip alert mute. Returns the new mute state.
    pub fn toggle_mute(&mut self) -> bool {
        self.alerts.toggle_mute()
    }

    pub fn mute(&mut self) {
        self.alerts.mute();
    }

    pub fn unmute(&mut self) {
        self.alerts.unmute();
    }

    /// Replace the history with an import.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not parse; history is unchanged.
    pub fn import_history(&mut self, bytes: &[u8]) -> crate::error::Result<usize> {
        Ok(self.history.import(bytes)?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn switch_to_focus(&mut self, now: u64) -> [Event; 2] {
        self.state.phase = Phase::Focus;
        self.state.elapsed_ms = 0;
        self.alerts.cancel();
        let appended = self.record(Action::SwitchToFocus, now);

        debug!(break_ms = self.state.break_duration_ms, "break finished, back to focus");
        let switched = Event::SwitchedToFocus {
            break_duration_ms: self.state.break_duration_ms,
            at: timestamp(now),
        };
        [switched, appended]
    }

    fn reschedule_alert(&mut self, now: u64) {
        if !self.alert_enabled {
            return;
        }
        self.alerts.schedule(self.state.phase, self.state.elapsed_ms, now);
    }

    fn record(&mut self, action: Action, now: u64) -> Event {
        let ratio = self.ratio();
        self.history.append(action, &self.state, ratio, timestamp(now));
        Event::HistoryAppended {
            records: self.history.recent(self.history_limit).to_vec(),
        }
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("ratio", &self.ratio)
            .field("alerts", &self.alerts)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertCue, MemorySink};
    use crate::clock::ManualClock;
    use crate::history::HistoryRecord;

    const T0: u64 = 1_700_000_000_000;

    fn engine() -> (TimerEngine, ManualClock, MemorySink) {
        let clock = ManualClock::new(T0);
        let sink = MemorySink::new();
        let alerts = AlertScheduler::new(
            Some(AlertCue::from_bytes("alert.wav", vec![1])),
            Box::new(sink.clone()),
        );
        let engine = TimerEngine::new(EngineOptions::default(), Arc::new(clock.clone()), alerts);
        (engine, clock, sink)
    }

    fn run_for(engine: &mut TimerEngine, clock: &ManualClock, ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let mut left = ms;
        while left > 0 {
            let step = left.min(DEFAULT_TICK_INTERVAL_MS);
            clock.advance(step);
            events.extend(engine.tick());
            left -= step;
        }
        events
    }

    #[test]
    fn starts_idle_in_focus() {
        let (engine, _, _) = engine();
        assert_eq!(engine.phase(), Phase::Focus);
        assert!(!engine.is_running());
        assert_eq!(engine.elapsed_ms(), 0);
        assert_eq!(engine.total_duration_ms(), 0);
        assert!(engine.history().is_empty());
        assert_eq!(engine.status(), "Timer Paused");
    }

    #[test]
    fn start_pause_are_idempotent() {
        let (mut engine, _, _) = engine();
        assert_eq!(engine.start().len(), 2);
        assert!(engine.start().is_empty());
        assert!(engine.state().last_tick_at.is_some());

        assert_eq!(engine.pause().len(), 2);
        assert!(engine.pause().is_empty());
        assert!(engine.state().last_tick_at.is_none());

        let actions: Vec<_> = engine.history().records().iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![Action::Start, Action::Pause]);
    }

    #[test]
    fn first_tick_after_start_has_zero_delta() {
        let (mut engine, clock, _) = engine();
        clock.advance(5_000);
        engine.start();
        engine.tick();
        assert_eq!(engine.elapsed_ms(), 0);
    }

    #[test]
    fn focus_accumulates_late_ticks_exactly() {
        let (mut engine, clock, _) = engine();
        engine.start();
        for delta in [25, 25, 400, 3, 1_000] {
            clock.advance(delta);
            engine.tick();
        }
        assert_eq!(engine.elapsed_ms(), 1_453);
        assert_eq!(engine.total_duration_ms(), 1_453);
    }

    #[test]
    fn paused_time_is_not_counted() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 1_000);
        engine.pause();
        clock.advance(60_000);
        engine.tick();
        engine.start();
        run_for(&mut engine, &clock, 500);
        assert_eq!(engine.elapsed_ms(), 1_500);
    }

    #[test]
    fn switch_to_break_uses_ratio() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 25_000);

        let events = engine.switch_to_break();
        assert!(matches!(
            events[0],
            Event::SwitchedToBreak { focus_ms: 25_000, break_duration_ms: 5_000, .. }
        ));
        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.elapsed_ms(), 5_000);
        assert_eq!(engine.status(), "On Break");
    }

    #[test]
    fn switch_to_break_twice_is_a_no_op() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 20_000);
        engine.switch_to_break();
        run_for(&mut engine, &clock, 1_000);

        assert!(engine.switch_to_break().is_empty());
        assert_eq!(engine.break_duration_ms(), 4_000);
        assert_eq!(engine.elapsed_ms(), 3_000);
        assert_eq!(engine.history().len(), 2);
    }

    #[test]
    fn switch_to_break_while_paused_is_ignored() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 10_000);
        engine.pause();

        assert!(engine.switch_to_break().is_empty());
        assert_eq!(engine.phase(), Phase::Focus);
        assert_eq!(engine.history().last().unwrap().action, Action::Pause);
    }

    #[test]
    fn break_clamps_at_zero_and_switches_once() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 10_000);
        engine.switch_to_break();

        clock.advance(1_500);
        let events = engine.tick();
        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.elapsed_ms(), 500);
        assert!(events.iter().all(|e| !matches!(e, Event::SwitchedToFocus { .. })));

        clock.advance(4_000);
        let events = engine.tick();
        assert_eq!(engine.phase(), Phase::Focus);
        assert_eq!(engine.elapsed_ms(), 0);
        let switches = events
            .iter()
            .filter(|e| matches!(e, Event::SwitchedToFocus { .. }))
            .count();
        assert_eq!(switches, 1);

        clock.advance(100);
        engine.tick();
        assert_eq!(engine.elapsed_ms(), 100);
        assert_eq!(engine.total_duration_ms(), 15_600);
    }

    #[test]
    fn alert_fires_before_break_end() {
        let (mut engine, clock, sink) = engine();
        engine.set_ratio("1").unwrap();
        engine.start();
        run_for(&mut engine, &clock, 15_000);
        engine.switch_to_break();
        assert_eq!(engine.pending_alert().unwrap().fire_in_ms, 5_000);

        let events = run_for(&mut engine, &clock, 4_975);
        assert!(events.is_empty());
        assert_eq!(sink.plays(), 0);

        let events = run_for(&mut engine, &clock, 25);
        assert!(matches!(events.as_slice(), [Event::AlertFired { audible: true, .. }]));
        assert_eq!(sink.plays(), 1);
    }

    #[test]
    fn pause_cancels_and_start_reschedules_alert() {
        let (mut engine, clock, sink) = engine();
        engine.set_ratio("1").unwrap();
        engine.start();
        run_for(&mut engine, &clock, 30_000);
        engine.switch_to_break();
        run_for(&mut engine, &clock, 5_000);

        engine.pause();
        assert!(engine.pending_alert().is_none());
        clock.advance(120_000);
        engine.tick();
        assert_eq!(sink.plays(), 0);

        engine.start();
        let alert = engine.pending_alert().unwrap();
        assert_eq!(alert.fire_in_ms, 15_000);
    }

    #[test]
    fn reset_keeps_total_and_cancels_alert() {
        let (mut engine, clock, sink) = engine();
        engine.start();
        run_for(&mut engine, &clock, 100_000);
        engine.switch_to_break();
        run_for(&mut engine, &clock, 1_000);
        assert!(engine.pending_alert().is_some());

        engine.reset();
        assert!(!engine.is_running());
        assert_eq!(engine.phase(), Phase::Focus);
        assert_eq!(engine.elapsed_ms(), 0);
        assert_eq!(engine.break_duration_ms(), 0);
        assert_eq!(engine.total_duration_ms(), 101_000);
        assert!(engine.pending_alert().is_none());

        clock.advance(60_000);
        engine.tick();
        assert_eq!(sink.plays(), 0);
        assert_eq!(engine.history().last().unwrap().action, Action::Reset);
    }

    #[test]
    fn disabled_alerts_never_arm() {
        let clock = ManualClock::new(T0);
        let alerts = AlertScheduler::new(
            Some(AlertCue::from_bytes("alert.wav", vec![1])),
            Box::new(MemorySink::new()),
        );
        let options = EngineOptions {
            alert_enabled: false,
            ..EngineOptions::default()
        };
        let mut engine = TimerEngine::new(options, Arc::new(clock.clone()), alerts);
        engine.start();
        run_for(&mut engine, &clock, 60_000);
        engine.switch_to_break();
        assert!(engine.pending_alert().is_none());
    }

    #[test]
    fn rejected_ratio_leaves_no_history() {
        let (mut engine, _, _) = engine();
        assert!(engine.set_ratio("zero").is_err());
        assert!(engine.set_ratio("-1").is_err());
        assert_eq!(engine.ratio(), Ratio::DEFAULT);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn break_progress_counts_down() {
        let (mut engine, clock, _) = engine();
        assert_eq!(engine.break_progress(), 0.0);
        engine.set_ratio("1").unwrap();
        engine.start();
        run_for(&mut engine, &clock, 10_000);
        engine.switch_to_break();
        assert_eq!(engine.break_progress(), 1.0);
        run_for(&mut engine, &clock, 2_500);
        assert_eq!(engine.break_progress(), 0.75);
    }

    fn appended(events: &[Event]) -> Vec<&Vec<HistoryRecord>> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::HistoryAppended { records } => Some(records),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_recorded_transition_publishes_history_once() {
        let (mut engine, clock, _) = engine();
        engine.set_ratio("1").unwrap();

        let start = engine.start();
        assert_eq!(appended(&start).len(), 1);
        assert!(matches!(start.last(), Some(Event::HistoryAppended { .. })));
        assert!(appended(&engine.start()).is_empty());

        run_for(&mut engine, &clock, 1_000);
        assert_eq!(appended(&engine.switch_to_break()).len(), 1);
        assert!(engine.switch_to_break().is_empty());

        let ticks = run_for(&mut engine, &clock, 1_000);
        let published = appended(&ticks);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].last().unwrap().action, Action::SwitchToFocus);

        assert_eq!(appended(&engine.pause()).len(), 1);
        assert!(engine.pause().is_empty());

        let reset = engine.reset();
        let published = appended(&reset);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].as_slice(), engine.history().records());
    }

    #[test]
    fn published_history_is_limited_to_the_newest_records() {
        let clock = ManualClock::new(T0);
        let options = EngineOptions {
            history_limit: 3,
            ..EngineOptions::default()
        };
        let mut engine = TimerEngine::new(options, Arc::new(clock), AlertScheduler::silent());
        for _ in 0..4 {
            engine.start();
            engine.pause();
        }
        let events = engine.reset();
        let published = appended(&events);
        let actions: Vec<_> = published[0].iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![Action::Start, Action::Pause, Action::Reset]);
    }

    #[test]
    fn history_records_pre_tick_state_on_start() {
        let (mut engine, clock, _) = engine();
        engine.start();
        run_for(&mut engine, &clock, 2_000);
        engine.pause();
        engine.start();

        let records = engine.history().records();
        assert_eq!(records[2].action, Action::Start);
        assert_eq!(records[2].elapsed_ms, 2_000);
        assert_eq!(records[2].timestamp.timestamp_millis(), (T0 + 2_000) as i64);
    }
}
