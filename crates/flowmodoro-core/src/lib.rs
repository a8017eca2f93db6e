//! # Flowmodoro Core Library
//!
//! Core logic for a flow-based interval timer. Focus time counts up for as
//! long as the user keeps working; switching to a break grants a break whose
//! length is the focus time divided by a user-chosen ratio. The break counts
//! down and hands back to focus on its own when it runs out.
//!
//! The `flowmodoro` CLI is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Ratio Store**: Validated focus:break ratio
//! - **Alerts**: Deadline-based pre-expiry cue for the running break
//! - **History**: Append-only log of user actions with JSON export/import
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`RatioStore`]: Ratio validation and rounding
//! - [`AlertScheduler`]: Break-end alert
//! - [`HistoryLog`]: Action log and its file format
//! - [`Config`]: Application configuration management

pub mod alert;
pub mod clock;
pub mod error;
pub mod events;
pub mod history;
pub mod ratio;
pub mod simulation;
pub mod storage;
pub mod timer;

pub use alert::{AlertCue, AlertScheduler, AlertSink, ScheduledAlert};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AudioError, ConfigError, CoreError, HistoryError, RatioError};
pub use events::Event;
pub use history::{Action, HistoryLog, HistoryRecord};
pub use ratio::{Ratio, RatioBounds, RatioPrecision, RatioStore};
pub use simulation::{parse_script, SimStep, Simulation, SimulationReport};
pub use storage::Config;
pub use timer::{EngineOptions, Phase, TimerEngine, TimerState};
