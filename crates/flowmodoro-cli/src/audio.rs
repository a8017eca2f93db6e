//! Alert sinks for the terminal.

use std::io::Write;
use std::path::Path;

use flowmodoro_core::{AlertCue, AlertScheduler, AlertSink};
use tracing::warn;

/// Rings the terminal bell.
pub struct BellSink;

impl AlertSink for BellSink {
    fn play(&mut self, _cue: &AlertCue) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

/// Cue used when no sound file is configured.
pub fn bell_cue() -> AlertCue {
    AlertCue::from_bytes("terminal-bell", vec![0x07])
}

fn bell() -> AlertScheduler {
    AlertScheduler::new(Some(bell_cue()), Box::new(BellSink))
}

/// The scheduler `run` uses: the sound file through the audio device when
/// one is configured and playable, the terminal bell otherwise.
///
/// A configured file that cannot be read or decoded leaves alerts silent.
pub fn scheduler(sound: Option<&Path>) -> AlertScheduler {
    let Some(path) = sound else {
        return bell();
    };

    #[cfg(feature = "rodio")]
    {
        match DeviceSink::open() {
            Ok(sink) => return AlertScheduler::load(path, Box::new(sink)),
            Err(e) => warn!(
                error = %e,
                path = %path.display(),
                "no audio device, using the terminal bell"
            ),
        }
    }

    #[cfg(not(feature = "rodio"))]
    warn!(
        path = %path.display(),
        "built without audio playback, alert.sound is unused; using the terminal bell"
    );
    bell()
}

#[cfg(feature = "rodio")]
pub use self::device::DeviceSink;

#[cfg(feature = "rodio")]
mod device {
    use std::io::Cursor;

    use flowmodoro_core::{AlertCue, AlertSink, AudioError};
    use rodio::source::Buffered;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::warn;

    type Decoded = Buffered<Decoder<Cursor<Vec<u8>>>>;

    /// Decode `cue` into a source that can be replayed by cloning.
    pub(super) fn decode(cue: &AlertCue) -> Result<Decoded, AudioError> {
        Decoder::new(Cursor::new(cue.bytes().to_vec()))
            .map(Source::buffered)
            .map_err(|e| AudioError::Decode {
                path: cue.path().to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Plays cues through the default output device.
    pub struct DeviceSink {
        // Dropping the stream silences the handle.
        _stream: OutputStream,
        handle: OutputStreamHandle,
        decoded: Option<Decoded>,
        current: Option<Sink>,
    }

    impl DeviceSink {
        pub fn open() -> Result<Self, rodio::StreamError> {
            let (stream, handle) = OutputStream::try_default()?;
            Ok(Self {
                _stream: stream,
                handle,
                decoded: None,
                current: None,
            })
        }
    }

    impl AlertSink for DeviceSink {
        fn prepare(&mut self, cue: &AlertCue) -> Result<(), AudioError> {
            self.decoded = Some(decode(cue)?);
            Ok(())
        }

        fn play(&mut self, _cue: &AlertCue) {
            self.stop();
            let Some(source) = self.decoded.clone() else {
                return;
            };
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.append(source);
                    self.current = Some(sink);
                }
                Err(e) => warn!(error = %e, "cannot open audio sink"),
            }
        }

        fn stop(&mut self) {
            if let Some(sink) = self.current.take() {
                sink.stop();
            }
        }
    }

}
