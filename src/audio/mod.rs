//! Audio playback.
//!
//! MIDI notes are scheduled on a [`Transport`] and rendered in real time:
//! - [`TransportClock`] keeps the schedule and produces note on/off events
//! - [`SynthTransport`] renders them with a SoundFont synthesizer via rodio
//! - [`MidiPlaybackSession`] plays an imported file with play/pause/stop

pub mod engine;
pub mod playback;
pub mod transport;

pub use engine::{SynthTransport, SAMPLE_RATE};
pub use playback::MidiPlaybackSession;
pub use transport::{ClockEvent, ClockState, NoteTrigger, Transport, TransportClock, VoiceHandle};

use thiserror::Error;

/// Represents the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing, position reset to start.
    Stopped,
    /// Currently playing.
    Playing,
    /// Paused at current position.
    Paused,
}

/// Errors from the audio engine.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to load SoundFont: {0}")]
    SoundFont(String),
    #[error("synthesizer error: {0}")]
    Synthesizer(String),
}
