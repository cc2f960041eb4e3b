//! pentagrama - pitches and MIDI files on a treble staff.
//!
//! This library provides the core functionality for the terminal app:
//! pitch capture, notation, staff rendering, MIDI import/export, playback
//! and PDF export.

pub mod app;
pub mod audio;
pub mod capture;
pub mod config;
pub mod export;
pub mod midi;
pub mod notation;
pub mod render;
pub mod ui;

// Re-export commonly used types
pub use app::{App, Controls};
pub use config::{CliOptions, Settings};
pub use midi::{MidiFile, TICKS_PER_BEAT};
pub use notation::{frequency_to_pitch, NotationEvent, NoteBuffer, Pitch};
