//! Standard MIDI File support.
//!
//! This module converts between Standard MIDI Files and the notation model:
//! imported files become a [`MidiFile`] of timed [`MidiEvent`]s (used for
//! playback) and flatten into [`NotationEvent`]s for the staff, while the
//! staff's notes can be written back out as a single-track file.
//!
//! [`NotationEvent`]: crate::notation::NotationEvent

mod event;
mod midi_export;
mod midi_import;
mod tempo;

pub use event::{MidiEvent, MidiFile, MidiTrack};
pub use midi_export::{notation_to_midi, EXPORT_VELOCITY};
pub use midi_import::{import_midi_bytes, import_midi_file, MidiImportError};
pub use tempo::TempoMap;

#[cfg(test)]
pub(crate) use midi_export::tests::{smf_bytes, RawEvent};

/// Ticks per beat (quarter note) used when writing files.
pub const TICKS_PER_BEAT: u32 = 480;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO: u32 = 120;

/// Microseconds per beat at the default tempo.
pub const DEFAULT_USEC_PER_BEAT: u32 = 60_000_000 / DEFAULT_TEMPO;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tempo_microseconds() {
        assert_eq!(DEFAULT_USEC_PER_BEAT, 500_000);
    }
}
