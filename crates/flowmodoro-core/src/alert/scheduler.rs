use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sink::{AlertCue, AlertSink, NullSink};
use crate::timer::Phase;

/// How long before the end of a break the cue plays.
pub const DEFAULT_LEAD_MS: u64 = 10_000;

/// The single outstanding alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAlert {
    /// Clock reading (epoch ms) at or after which the cue plays.
    pub fire_at_ms: u64,
    /// Delay that was requested when the alert was armed.
    pub fire_in_ms: u64,
}

/// Result of a pending alert coming due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFired {
    pub at_ms: u64,
    /// `false` when the scheduler was muted at emission time.
    pub audible: bool,
}

/// Arms, cancels and fires the break-end cue.
pub struct AlertScheduler {
    cue: Option<AlertCue>,
    sink: Box<dyn AlertSink>,
    pending: Option<ScheduledAlert>,
    muted: bool,
    lead_ms: u64,
}

impl AlertScheduler {
    /// Scheduler with an already loaded cue, or none at all.
    ///
    /// Without a cue every `schedule` call is a no-op.
    pub fn new(cue: Option<AlertCue>, sink: Box<dyn AlertSink>) -> Self {
        Self {
            cue,
            sink,
            pending: None,
            muted: false,
            lead_ms: DEFAULT_LEAD_MS,
        }
    }

    /// Load the cue from `path` and let `sink` decode it once. A read or
    /// decode failure is logged and leaves the scheduler silent instead of
    /// failing.
    pub fn load(path: impl AsRef<Path>, mut sink: Box<dyn AlertSink>) -> Self {
        let cue = AlertCue::load(path).and_then(|cue| {
            sink.prepare(&cue)?;
            Ok(cue)
        });
        let cue = match cue {
            Ok(cue) => {
                let bytes = cue.bytes().len();
                debug!(path = %cue.path().display(), bytes, "loaded alert sound");
                Some(cue)
            }
            Err(e) => {
                warn!(error = %e, "alert sound unavailable, break alerts will be silent");
                None
            }
        };
        Self::new(cue, sink)
    }

    /// Scheduler that never plays anything.
    pub fn silent() -> Self {
        Self::new(None, Box::new(NullSink))
    }

    pub fn with_lead_ms(mut self, lead_ms: u64) -> Self {
        self.lead_ms = lead_ms;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn pending(&self) -> Option<ScheduledAlert> {
        self.pending
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether a cue was loaded.
    pub fn has_cue(&self) -> bool {
        self.cue.is_some()
    }

    pub fn lead_ms(&self) -> u64 {
        self.lead_ms
    }

    /// Delay for a break with `remaining_ms` left: the lead time before the
    /// end, but never less than 1 ms.
    pub fn fire_in_ms(&self, remaining_ms: u64) -> u64 {
        remaining_ms.saturating_sub(self.lead_ms).max(1)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm the cue for the break that has `remaining_ms` left, replacing any
    /// pending one. Outside a break this only cancels.
    pub fn schedule(
        &mut self,
        phase: Phase,
        remaining_ms: u64,
        now_ms: u64,
    ) -> Option<ScheduledAlert> {
        if phase != Phase::Break {
            self.cancel();
            return None;
        }
        if self.cue.is_none() {
            return None;
        }

        self.cancel();
        self.sink.stop();

        let fire_in_ms = self.fire_in_ms(remaining_ms);
        let alert = ScheduledAlert {
            fire_at_ms: now_ms.saturating_add(fire_in_ms),
            fire_in_ms,
        };
        debug!(fire_in_ms, remaining_ms, "break alert scheduled");
        self.pending = Some(alert);
        Some(alert)
    }

    /// Drop the pending alert, if any.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!("break alert cancelled");
        }
    }

    /// Fire the pending alert if it is due at `now_ms`.
    ///
    /// Mute is checked here, not when scheduling, so muting after the alert
    /// was armed still silences it.
    pub fn poll(&mut self, now_ms: u64) -> Option<AlertFired> {
        let alert = self.pending?;
        if now_ms < alert.fire_at_ms {
            return None;
        }
        self.pending = None;

        let audible = !self.muted;
        if let (true, Some(cue)) = (audible, self.cue.as_ref()) {
            self.sink.play(cue);
        }
        debug!(audible, "break alert fired");
        Some(AlertFired {
            at_ms: now_ms,
            audible,
        })
    }

    /// Flip the mute flag. Returns the new state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }
}

impl fmt::Debug for AlertScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertScheduler")
            .field("cue", &self.cue.as_ref().map(AlertCue::path))
            .field("pending", &self.pending)
            .field("muted", &self.muted)
            .field("lead_ms", &self.lead_ms)
            .finish_non_exhaustive()
    }
}
