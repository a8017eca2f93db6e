use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::AudioError;

/// An alert sound, read from disk once and replayed for every cue.
#[derive(Debug, Clone)]
pub struct AlertCue {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl AlertCue {
    /// Read the sound file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Load`] if the file cannot be read and
    /// [`AudioError::Empty`] if it has no content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| AudioError::Load {
            path: path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(AudioError::Empty { path });
        }
        Ok(Self {
            path,
            bytes: bytes.into(),
        })
    }

    /// Build a cue from sound data already in memory.
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Audio output used by the scheduler when a cue fires.
pub trait AlertSink {
    /// Decode `cue` ahead of time so `play` only replays it.
    ///
    /// Called once when the scheduler loads its cue. An error leaves the
    /// scheduler without a cue.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Decode`] if the sink cannot play this data.
    fn prepare(&mut self, _cue: &AlertCue) -> Result<(), AudioError> {
        Ok(())
    }

    /// Start playing `cue`. Must not block.
    fn play(&mut self, cue: &AlertCue);

    /// Stop whatever the sink is currently playing.
    fn stop(&mut self) {}
}

/// Discards every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AlertSink for NullSink {
    fn play(&mut self, _cue: &AlertCue) {}
}

/// Counts plays and stops instead of producing sound.
///
/// Clones share counters, so a handle kept outside the scheduler observes
/// what the scheduler did.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    plays: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AlertSink for MemorySink {
    fn play(&mut self, _cue: &AlertCue) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
