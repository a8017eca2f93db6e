//! Interactive timer: ticks the engine on a tokio interval and reads one
//! command per stdin line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use flowmodoro_core::timer::format_clock;
use flowmodoro_core::{Config, Event, Phase, SystemClock, TimerEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::audio;

const HELP: &str = "\
commands:
  s              start / pause
  b              switch to break
  r              reset
  m              mute / unmute the break alert
  ratio <v>      set a custom ratio, e.g. ratio 2.5
  preset <n>     use an n:1 preset
  export [dir]   write the history file
  import <file>  replace the history from a file
  history        show recent history
  q              quit";

#[derive(Args)]
pub struct RunArgs {
    /// Starting ratio, e.g. 2.5 for 2.5:1 (overrides timer.default_ratio)
    #[arg(long)]
    ratio: Option<String>,
    /// Alert sound file (overrides alert.sound)
    #[arg(long)]
    sound: Option<PathBuf>,
    /// Start with the break alert muted
    #[arg(long)]
    mute: bool,
    /// Load this history file before starting
    #[arg(long)]
    history: Option<PathBuf>,
    /// Start the focus timer right away
    #[arg(long)]
    start: bool,
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut engine = build_engine(&config, &args);

    if let Some(raw) = &args.ratio {
        engine.set_ratio(raw)?;
    }
    if let Some(path) = &args.history {
        let count = engine.import_history(&std::fs::read(path)?)?;
        println!("imported {count} history records");
    }
    if args.start {
        engine.start();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(drive(engine, &config))
}

fn build_engine(config: &Config, args: &RunArgs) -> TimerEngine {
    let sound = args
        .sound
        .clone()
        .or_else(|| config.alert.sound.as_ref().map(PathBuf::from));
    let alerts = audio::scheduler(sound.as_deref())
        .with_lead_ms(config.alert_lead_ms())
        .with_muted(config.alert.muted || args.mute);

    TimerEngine::new(config.engine_options(), Arc::new(SystemClock::new()), alerts)
}

async fn drive(mut engine: TimerEngine, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(engine.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut status = StatusLine::default();

    println!("{HELP}");
    info!(ratio = %engine.ratio(), "timer ready");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in engine.tick() {
                    status.clear();
                    print_event(&event);
                }
                status.render(&engine)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                status.clear();
                if let Flow::Quit = handle_command(&mut engine, config, line.trim()) {
                    break;
                }
            }
        }
    }

    status.clear();
    println!(
        "session total {} ({} history records)",
        format_clock(engine.total_duration_ms()),
        engine.history().len()
    );
    Ok(())
}

fn handle_command(engine: &mut TimerEngine, config: &Config, line: &str) -> Flow {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, Some(arg.trim())),
        None => (line, None),
    };

    match cmd {
        "" => {}
        "s" | "start" | "pause" => engine.on_start_pause_click().iter().for_each(print_event),
        "b" | "break" => {
            let events = engine.on_break_click();
            if events.is_empty() {
                println!("a break can only start while focusing");
            }
            events.iter().for_each(print_event);
        }
        "r" | "reset" => engine.on_reset_click().iter().for_each(print_event),
        "m" | "mute" => {
            let muted = engine.on_mute_toggle_click();
            println!("break alert {}", if muted { "muted" } else { "on" });
        }
        "ratio" => match arg {
            Some(raw) => match engine.on_custom_ratio_submit(raw) {
                Ok(ratio) => println!("ratio set to {ratio}"),
                Err(e) => println!("{e}"),
            },
            None => println!("ratio is {}", engine.ratio()),
        },
        "preset" => match arg.and_then(|a| a.parse::<u32>().ok()) {
            Some(n) if config.ratio.presets.contains(&n) => match engine.on_ratio_button_click(n) {
                Ok(ratio) => println!("ratio set to {ratio}"),
                Err(e) => println!("{e}"),
            },
            _ => println!("presets: {:?}", config.ratio.presets),
        },
        "export" => {
            let dir = arg
                .map(PathBuf::from)
                .or_else(|| config.history.export_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            match engine.history().export_to_dir(&dir, Utc::now().date_naive()) {
                Ok(path) => println!("history exported to {}", path.display()),
                Err(e) => println!("export failed: {e}"),
            }
        }
        "import" => match arg {
            Some(path) => match import(engine, Path::new(path)) {
                Ok(count) => println!("imported {count} history records"),
                Err(e) => println!("import failed: {e}"),
            },
            None => println!("usage: import <file>"),
        },
        "h" | "history" => {
            let records = engine.history().recent(config.history.render_limit);
            if records.is_empty() {
                println!("no history yet");
            }
            for record in records {
                println!("{}", record.render_line());
            }
        }
        "?" | "help" => println!("{HELP}"),
        "q" | "quit" | "exit" => return Flow::Quit,
        other => println!("unknown command '{other}', type help"),
    }
    Flow::Continue
}

fn import(engine: &mut TimerEngine, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    Ok(engine.import_history(&bytes)?)
}

fn print_event(event: &Event) {
    match event {
        Event::TimerStarted { phase, elapsed_ms, .. } => {
            println!("{phase} started at {}", format_clock(*elapsed_ms));
        }
        Event::TimerPaused { phase, elapsed_ms, .. } => {
            println!("{phase} paused at {}", format_clock(*elapsed_ms));
        }
        Event::TimerReset { total_duration_ms, .. } => {
            println!("reset, session total {}", format_clock(*total_duration_ms));
        }
        Event::SwitchedToBreak {
            focus_ms,
            break_duration_ms,
            ratio,
            ..
        } => println!(
            "focused {}, break of {} at {ratio}",
            format_clock(*focus_ms),
            format_clock(*break_duration_ms)
        ),
        Event::SwitchedToFocus { .. } => println!("break over, back to focus"),
        Event::AlertFired { audible: true, .. } => println!("break ends soon"),
        Event::AlertFired { audible: false, .. } => println!("break ends soon (muted)"),
        // The terminal scrolls, so appending the newest line redraws the list.
        Event::HistoryAppended { records } => {
            if let Some(record) = records.last() {
                println!("  {}", record.render_line());
            }
        }
        Event::StateSnapshot { .. } => {}
    }
}

/// One self-overwriting terminal line showing the clock.
#[derive(Default)]
struct StatusLine {
    shown: String,
}

impl StatusLine {
    fn render(&mut self, engine: &TimerEngine) -> std::io::Result<()> {
        let mut line = format!(
            "{:<13} {}  total {}  ratio {}",
            engine.status(),
            format_clock(engine.elapsed_ms()),
            format_clock(engine.total_duration_ms()),
            engine.ratio()
        );
        if engine.phase() == Phase::Break {
            line.push_str(&format!("  break left {:>3.0}%", engine.break_progress() * 100.0));
        }
        if engine.alerts().is_muted() {
            line.push_str("  [muted]");
        }
        if line == self.shown {
            return Ok(());
        }

        let mut stdout = std::io::stdout();
        write!(stdout, "\r{line:<width$}", width = self.shown.len())?;
        stdout.flush()?;
        self.shown = line;
        Ok(())
    }

    fn clear(&mut self) {
        if self.shown.is_empty() {
            return;
        }
        print!("\r{:width$}\r", "", width = self.shown.len());
        self.shown.clear();
    }
}
