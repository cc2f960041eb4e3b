//! Timed MIDI notes as read from a file.
//!
//! A loaded file keeps every note with its real onset, duration and
//! velocity for playback, grouped by the track chunk it came from.

use crate::notation::{NotationEvent, Pitch};

/// A single note from a parsed MIDI file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// Pitch of the note.
    pub pitch: Pitch,

    /// Onset in seconds from the start of the file.
    pub time: f64,

    /// Sounding duration in seconds.
    pub duration: f64,

    /// Note-on velocity (1-127).
    pub velocity: u8,
}

impl MidiEvent {
    pub fn new(pitch: Pitch, time: f64, duration: f64, velocity: u8) -> Self {
        Self {
            pitch,
            time,
            duration,
            velocity: velocity.min(127),
        }
    }

    /// Returns the end time of this note (onset + duration).
    pub fn end_time(&self) -> f64 {
        self.time + self.duration
    }

    /// MIDI note number of the pitch. Imported notes always have one.
    pub fn key(&self) -> Option<u8> {
        self.pitch.to_midi()
    }

    /// Velocity scaled to 0.0-1.0.
    pub fn normalized_velocity(&self) -> f32 {
        self.velocity as f32 / 127.0
    }

    /// The staff symbol for this note. Real durations are not notated; every
    /// note is shown as a quarter.
    pub fn to_notation(&self) -> NotationEvent {
        NotationEvent::quarter(self.pitch)
    }
}

/// Notes of one track chunk, ordered by onset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiTrack {
    /// Track name meta event, if present.
    pub name: Option<String>,
    /// Notes in this track.
    pub events: Vec<MidiEvent>,
}

impl MidiTrack {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A fully parsed MIDI file.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile {
    /// Display name, usually the file stem.
    pub name: String,
    /// Track chunks in file order.
    pub tracks: Vec<MidiTrack>,
    /// Initial tempo in beats per minute.
    pub tempo_bpm: u32,
    /// Resolution declared in the header.
    pub ticks_per_beat: u32,
}

impl MidiFile {
    /// Iterates every note, track by track, in file order within each track.
    /// Tracks are not merged by time.
    pub fn events(&self) -> impl Iterator<Item = &MidiEvent> {
        self.tracks.iter().flat_map(|track| track.events.iter())
    }

    /// Total number of notes across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }

    /// End time of the last sounding note in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.events().map(MidiEvent::end_time).fold(0.0, f64::max)
    }

    /// Flattens the file into staff symbols, track 1 first.
    pub fn notation_events(&self) -> Vec<NotationEvent> {
        self.events().map(MidiEvent::to_notation).collect()
    }
}
