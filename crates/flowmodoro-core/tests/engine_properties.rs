//! Property tests for the timer engine under arbitrary command sequences.

use std::sync::Arc;

use flowmodoro_core::alert::MemorySink;
use flowmodoro_core::{
    AlertCue, AlertScheduler, EngineOptions, Event, ManualClock, Phase, Ratio, RatioBounds,
    RatioPrecision, RatioStore, TimerEngine,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Break,
    Reset,
    Ratio(u32),
    Wait(u64),
}

fn silent_engine(clock: &ManualClock) -> TimerEngine {
    TimerEngine::new(
        EngineOptions::default(),
        Arc::new(clock.clone()),
        AlertScheduler::silent(),
    )
}

#[derive(Debug, Clone)]
enum BreakOp {
    Start,
    Pause,
    Wait(u64),
}

fn break_op() -> impl Strategy<Value = BreakOp> {
    prop_oneof![
        Just(BreakOp::Start),
        Just(BreakOp::Pause),
        (0u64..1_000).prop_map(BreakOp::Wait),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::Break),
        Just(Op::Reset),
        (1u32..=200).prop_map(Op::Ratio),
        (0u64..5_000).prop_map(Op::Wait),
    ]
}

proptest! {
    #[test]
    fn test_state_stays_consistent(ops in prop::collection::vec(op(), 1..80)) {
        let clock = ManualClock::new(0);
        let mut engine = silent_engine(&clock);
        let mut running_total = 0u64;

        for op in ops {
            let records_before = engine.history().len();
            let total_before = engine.total_duration_ms();
            match op {
                Op::Start => { engine.start(); }
                Op::Pause => { engine.pause(); }
                Op::Break => { engine.switch_to_break(); }
                Op::Reset => { engine.reset(); }
                Op::Ratio(scaled) => {
                    let text = format!("{}.{}", scaled / 10, scaled % 10);
                    prop_assert!(engine.set_ratio(&text).is_ok());
                    prop_assert_eq!(engine.history().len(), records_before);
                }
                Op::Wait(ms) => {
                    clock.advance(ms);
                    let was_running = engine.is_running();
                    engine.tick();
                    if was_running {
                        running_total += ms;
                    }
                }
            }

            let state = *engine.state();
            prop_assert_eq!(state.running, state.last_tick_at.is_some());
            prop_assert!(engine.total_duration_ms() >= total_before);
            if state.phase == Phase::Break {
                prop_assert!(state.elapsed_ms <= state.break_duration_ms);
            }
            let progress = engine.break_progress();
            prop_assert!((0.0..=1.0).contains(&progress));
        }

        prop_assert_eq!(engine.total_duration_ms(), running_total);
    }

    #[test]
    fn test_focus_elapsed_is_sum_of_ticks(deltas in prop::collection::vec(0u64..5_000, 0..60)) {
        let clock = ManualClock::new(0);
        let mut engine = silent_engine(&clock);
        engine.start();

        let mut sum = 0u64;
        for delta in deltas {
            clock.advance(delta);
            prop_assert!(engine.tick().is_empty());
            sum += delta;
            prop_assert_eq!(engine.elapsed_ms(), sum);
            prop_assert_eq!(engine.total_duration_ms(), sum);
        }
        prop_assert_eq!(engine.phase(), Phase::Focus);
    }

    #[test]
    fn test_break_counts_down_and_returns_to_focus_once(
        focus_ms in 1u64..60_000,
        deltas in prop::collection::vec(0u64..5_000, 0..60),
    ) {
        let clock = ManualClock::new(0);
        let mut engine = silent_engine(&clock);
        engine.set_ratio("1").unwrap();
        engine.start();
        clock.advance(focus_ms);
        engine.tick();
        engine.switch_to_break();
        prop_assert_eq!(engine.break_duration_ms(), focus_ms);

        let mut sum = 0u64;
        let mut returns = 0usize;
        for delta in deltas {
            let crossed_before = sum >= focus_ms;
            clock.advance(delta);
            returns += engine
                .tick()
                .iter()
                .filter(|e| matches!(e, Event::SwitchedToFocus { .. }))
                .count();
            sum += delta;

            if sum < focus_ms {
                prop_assert_eq!(engine.phase(), Phase::Break);
                prop_assert_eq!(engine.elapsed_ms(), focus_ms - sum);
            } else {
                prop_assert_eq!(engine.phase(), Phase::Focus);
                if !crossed_before {
                    prop_assert_eq!(engine.elapsed_ms(), 0);
                }
            }
        }
        prop_assert_eq!(returns, usize::from(sum >= focus_ms));
    }

    #[test]
    fn test_redundant_commands_keep_break_alert(ops in prop::collection::vec(break_op(), 1..60)) {
        let clock = ManualClock::new(0);
        let sink = MemorySink::new();
        let alerts = AlertScheduler::new(
            Some(AlertCue::from_bytes("alert.wav", vec![1, 2, 3])),
            Box::new(sink.clone()),
        );
        let mut engine =
            TimerEngine::new(EngineOptions::default(), Arc::new(clock.clone()), alerts);
        engine.set_ratio("1").unwrap();
        engine.start();
        clock.advance(3_600_000);
        engine.tick();
        engine.switch_to_break();
        prop_assert!(engine.pending_alert().is_some());

        // Waits stay far below the hour-long break, so the alert never comes due.
        let mut effective_starts = 0usize;
        for op in ops {
            let before = engine.pending_alert();
            match op {
                BreakOp::Start => {
                    let was_running = engine.is_running();
                    let events = engine.start();
                    if was_running {
                        prop_assert!(events.is_empty());
                        prop_assert_eq!(engine.pending_alert(), before);
                    } else {
                        effective_starts += 1;
                        prop_assert!(engine.pending_alert().is_some());
                    }
                }
                BreakOp::Pause => {
                    let was_running = engine.is_running();
                    let events = engine.pause();
                    prop_assert_eq!(events.is_empty(), !was_running);
                    prop_assert_eq!(engine.pending_alert(), None);
                }
                BreakOp::Wait(ms) => {
                    clock.advance(ms);
                    prop_assert!(engine.tick().is_empty());
                    prop_assert_eq!(engine.pending_alert(), before);
                }
            }
            prop_assert_eq!(engine.phase(), Phase::Break);
        }
        prop_assert_eq!(sink.plays(), 0);
        prop_assert_eq!(sink.stops(), 1 + effective_starts);
    }

    #[test]
    fn test_break_length_is_floor_of_focus_over_ratio(
        focus_ms in 0u64..10_000_000,
        scaled in 1u32..=200,
    ) {
        let ratio = Ratio::from_scaled(scaled).unwrap();
        let expected = focus_ms * 10 / u64::from(scaled);
        prop_assert_eq!(ratio.break_duration_ms(focus_ms), expected);
    }

    #[test]
    fn test_rejected_input_keeps_ratio(raw in "[^0-9]*") {
        let mut store = RatioStore::new(
            Ratio::DEFAULT,
            RatioBounds::capped(),
            RatioPrecision::OneDecimal,
        );
        prop_assume!(raw.trim().parse::<f64>().is_err());
        prop_assert!(store.set_ratio(&raw).is_err());
        prop_assert_eq!(store.ratio(), Ratio::DEFAULT);
    }
}
