//! Append-only activity log.
//!
//! Every state-changing engine command appends one [`HistoryRecord`]. The
//! log lives in memory for the session; users move it in and out as a
//! pretty-printed JSON array (`pomodoro_history_<YYYYMMDD>.json`).

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{HistoryError, Result};
use crate::ratio::Ratio;
use crate::timer::{Phase, TimerState};

/// Number of records the presentation layer shows.
pub const RENDER_LIMIT: usize = 20;

/// Engine transition that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Start,
    Pause,
    Reset,
    #[serde(rename = "Switch to Break")]
    SwitchToBreak,
    #[serde(rename = "Switch to Focus")]
    SwitchToFocus,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "Start",
            Action::Pause => "Pause",
            Action::Reset => "Reset",
            Action::SwitchToBreak => "Switch to Break",
            Action::SwitchToFocus => "Switch to Focus",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable log entry, captured at action time.
///
/// Field names on the wire match the exported history files:
/// `{action, state, elapsed, ratio, totalDuration, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub action: Action,
    #[serde(rename = "state")]
    pub phase: Phase,
    #[serde(rename = "elapsed", deserialize_with = "de_millis")]
    pub elapsed_ms: u64,
    /// Scaled by 10, as stored by the ratio store.
    pub ratio: Ratio,
    #[serde(rename = "totalDuration", deserialize_with = "de_millis")]
    pub total_duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(action: Action, state: &TimerState, ratio: Ratio, timestamp: DateTime<Utc>) -> Self {
        Self {
            action,
            phase: state.phase,
            elapsed_ms: state.elapsed_ms,
            ratio,
            total_duration_ms: state.total_duration_ms,
            timestamp,
        }
    }

    /// `[local time] action | phase | elapsed | total | ratio`
    pub fn render_line(&self) -> String {
        format!(
            "[{}] {} | {} | {}ms | {}ms | {}",
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            self.action,
            self.phase,
            self.elapsed_ms,
            self.total_duration_ms,
            self.ratio
        )
    }
}

/// Older exports may carry fractional milliseconds; round them.
fn de_millis<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 {
        return Err(serde::de::Error::custom(
            "milliseconds must be a non-negative number",
        ));
    }
    Ok(value.round() as u64)
}

/// The session's activity log. Only the engine appends to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        action: Action,
        state: &TimerState,
        ratio: Ratio,
        at: DateTime<Utc>,
    ) -> &HistoryRecord {
        self.records.push(HistoryRecord::new(action, state, ratio, at));
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// The most recent `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> &[HistoryRecord] {
        let start = self.records.len().saturating_sub(limit);
        &self.records[start..]
    }

    /// Serialize the whole log as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Export`] if serialization fails.
    pub fn export(&self) -> Result<Vec<u8>, HistoryError> {
        serde_json::to_vec_pretty(&self.records).map_err(HistoryError::Export)
    }

    /// Replace the log with the records in `bytes`.
    ///
    /// The data must be a JSON array of history records. On any parse
    /// failure the current log is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ImportParse`] if `bytes` is not a valid
    /// history document.
    pub fn import(&mut self, bytes: &[u8]) -> Result<usize, HistoryError> {
        let records: Vec<HistoryRecord> =
            serde_json::from_slice(bytes).map_err(HistoryError::ImportParse)?;
        self.records = records;
        Ok(self.records.len())
    }

    /// `pomodoro_history_<YYYYMMDD>.json`. Callers pass the UTC date, which
    /// is what earlier exports were stamped with.
    pub fn export_file_name(date: NaiveDate) -> String {
        format!("pomodoro_history_{}.json", date.format("%Y%m%d"))
    }

    /// Write the export to `dir`, named for `date`. Returns the file path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn export_to_dir(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let path = dir.join(Self::export_file_name(date));
        std::fs::write(&path, self.export()?)?;
        info!(path = %path.display(), records = self.len(), "history exported");
        Ok(path)
    }

    /// Replace the log with the contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse; the
    /// current log is kept in both cases.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let bytes = std::fs::read(path)?;
        let count = self.import(&bytes)?;
        info!(path = %path.display(), records = count, "history imported");
        Ok(count)
    }
}
