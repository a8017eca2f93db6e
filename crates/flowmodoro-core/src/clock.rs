//! Wall-clock sources for the timer engine.
//!
//! The engine never reads the system time directly; it asks a [`Clock`].
//! [`SystemClock`] is used by the real driver loop, [`ManualClock`] by tests
//! and the deterministic simulation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Source of wall-clock readings in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    /// Current time as a UTC timestamp, derived from [`Clock::now_ms`].
    fn now_utc(&self) -> DateTime<Utc> {
        timestamp(self.now_ms())
    }
}

/// Wall-clock epoch taken once at construction, advanced by a monotonic
/// [`Instant`]. Steps in the system time after that (NTP, suspend) do not
/// move it.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch_ms: u64,
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms.saturating_add(self.origin.elapsed().as_millis() as u64)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert epoch milliseconds to a UTC timestamp.
pub fn timestamp(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_default()
}
