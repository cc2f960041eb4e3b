//! Live pitch capture.
//!
//! A [`PitchSource`] turns an audio input into a stream of
//! [`AnalysisFrame`]s, each carrying the dominant frequency of one analysis
//! window. Frames travel over an `mpsc` channel from the audio thread to
//! the [`LiveCaptureSession`], which turns them into notes.

mod analyzer;
mod microphone;
mod session;
mod wav;

pub use analyzer::{AnalyzerSettings, PitchAnalyzer};
pub use microphone::MicrophoneSource;
pub use session::{CaptureState, LiveCaptureSession};
pub use wav::WavFileSource;

#[cfg(test)]
pub(crate) use session::tests::{FakeSource, FakeSourceState};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Errors raised when opening an audio input.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to read WAV input: {0}")]
    Wav(#[from] hound::Error),
}

/// Identifies one capture session, so frames from an earlier session can be
/// told apart from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Returns a token never handed out before in this process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One analysis result. `pitch_hz` is 0.0 when the window held no pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisFrame {
    pub token: SessionToken,
    pub pitch_hz: f64,
}

/// Sending half handed to a [`PitchSource`], stamped with the session token.
#[derive(Debug, Clone)]
pub struct FrameSink {
    token: SessionToken,
    tx: Sender<AnalysisFrame>,
}

impl FrameSink {
    pub fn new(token: SessionToken, tx: Sender<AnalysisFrame>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Delivers one pitch estimate.
    ///
    /// Returns `false` once the receiving session has gone away.
    pub fn send(&self, pitch_hz: f64) -> bool {
        self.tx
            .send(AnalysisFrame {
                token: self.token,
                pitch_hz,
            })
            .is_ok()
    }
}

/// An audio input that reports the dominant pitch once per analysis window.
pub trait PitchSource {
    /// Starts analysis with windows of `window` samples, delivering frames
    /// to `sink` until [`close`](Self::close) is called.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the input cannot be opened.
    fn open(&mut self, window: usize, sink: FrameSink) -> Result<(), CaptureError>;

    /// Stops analysis and releases the input. Safe to call when not open.
    fn close(&mut self);

    /// Short human-readable name for status messages.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_tokens_are_unique() {
        let a = SessionToken::next();
        let b = SessionToken::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sink_stamps_token() {
        let (tx, rx) = mpsc::channel();
        let token = SessionToken::next();
        let sink = FrameSink::new(token, tx);

        assert!(sink.send(440.0));
        let frame = rx.recv().unwrap();
        assert_eq!(frame.token, token);
        assert_eq!(frame.pitch_hz, 440.0);

        drop(rx);
        assert!(!sink.send(440.0));
    }
}
