//! Break-end audio alerts.
//!
//! The [`AlertScheduler`] keeps at most one pending cue, armed roughly ten
//! seconds before the current break ends. It is deadline based: the engine
//! polls it on every tick, so a cancelled alert simply stops existing and
//! can never fire late.

mod scheduler;
mod sink;

pub use scheduler::{AlertFired, AlertScheduler, ScheduledAlert, DEFAULT_LEAD_MS};
pub use sink::{AlertCue, AlertSink, MemorySink, NullSink};
