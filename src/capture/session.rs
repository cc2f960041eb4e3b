//! Live capture session: turns analysis frames into notes.

use super::{AnalysisFrame, CaptureError, FrameSink, PitchSource, SessionToken};
use crate::notation::{NotationEvent, NoteBuffer};
use std::sync::mpsc::{self, Receiver, Sender};

/// Whether the session is currently listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// Owns a [`PitchSource`] and one frame channel shared by every capture it
/// starts. Each capture stamps its frames with its own token.
pub struct LiveCaptureSession {
    source: Box<dyn PitchSource>,
    window: usize,
    state: CaptureState,
    /// Token of the current capture, or of the last one after a stop.
    token: Option<SessionToken>,
    tx: Sender<AnalysisFrame>,
    frames: Receiver<AnalysisFrame>,
}

impl LiveCaptureSession {
    /// Creates an idle session analysing `window`-sample frames from `source`.
    pub fn new(source: Box<dyn PitchSource>, window: usize) -> Self {
        let (tx, frames) = mpsc::channel();
        Self {
            source,
            window,
            state: CaptureState::Idle,
            token: None,
            tx,
            frames,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn source_name(&self) -> String {
        self.source.describe()
    }

    /// Opens the source under a fresh session token.
    ///
    /// # Errors
    ///
    /// Returns the source's [`CaptureError`]; the session then stays idle.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let token = SessionToken::next();
        let sink = FrameSink::new(token, self.tx.clone());

        if let Err(e) = self.source.open(self.window, sink) {
            tracing::warn!("Capture failed to start: {}", e);
            return Err(e);
        }

        self.token = Some(token);
        self.state = CaptureState::Capturing;
        tracing::info!(source = %self.source.describe(), window = self.window, "Capture started");
        Ok(())
    }

    /// Closes the source. A no-op when idle.
    ///
    /// Frames already analysed but not yet polled stay queued and are
    /// still delivered by the next [`poll`](Self::poll), until another
    /// capture starts.
    pub fn stop(&mut self) {
        if self.state == CaptureState::Idle {
            return;
        }
        self.source.close();
        self.state = CaptureState::Idle;
        tracing::info!("Capture stopped");
    }

    /// Drains pending frames into `notes`.
    ///
    /// Frames from a previous session and frames without a usable pitch are
    /// discarded.
    ///
    /// # Returns
    ///
    /// The number of notes appended.
    pub fn poll(&mut self, notes: &mut NoteBuffer) -> usize {
        let mut appended = 0;
        while let Ok(frame) = self.frames.try_recv() {
            if self.token != Some(frame.token) {
                tracing::debug!("Dropping frame from a stale session");
                continue;
            }
            if frame.pitch_hz <= 0.0 {
                continue;
            }
            if let Some(event) = NotationEvent::from_frequency(frame.pitch_hz) {
                tracing::debug!(pitch_hz = frame.pitch_hz, key = %event.key(), "Captured note");
                notes.append(event);
                appended += 1;
            }
        }

        appended
    }
}
