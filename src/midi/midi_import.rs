//! Standard MIDI File (SMF) import.
//!
//! Parses .mid files with midly into a [`MidiFile`]: one [`MidiTrack`] per
//! track chunk, notes timed in seconds through the file's tempo map.
//!
//! # Limitations
//!
//! - Only note on/off pairs become notes
//! - Tempo changes from every track feed one global tempo map
//! - SMPTE timecode timing and Format 2 (sequential) files are rejected
//! - Controllers, program changes, pitch bend and SysEx are ignored

use super::{MidiEvent, MidiFile, MidiTrack, TempoMap};
use crate::notation::Pitch;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during MIDI import.
#[derive(Debug, Error)]
pub enum MidiImportError {
    /// File could not be read.
    #[error("could not read MIDI file: {0}")]
    Io(#[from] std::io::Error),
    /// The bytes are not a Standard MIDI File this importer can time.
    #[error("malformed MIDI data: {0}")]
    MalformedMidi(String),
}

/// A note while its track is being scanned; `end_tick` is set on note off.
struct PendingNote {
    key: u8,
    velocity: u8,
    start_tick: u32,
    end_tick: Option<u32>,
}

/// Notes and metadata from a single track chunk, still in ticks.
struct ScannedTrack {
    name: Option<String>,
    notes: Vec<PendingNote>,
}

/// Imports a MIDI file from disk, naming it after the file stem.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn import_midi_file<P: AsRef<Path>>(path: P) -> Result<MidiFile, MidiImportError> {
    let path = path.as_ref();
    let data = fs::read(path)?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported MIDI");

    import_midi_bytes(&data, name)
}

/// Parses an in-memory Standard MIDI File.
///
/// # Arguments
///
/// * `data` - Raw file contents
/// * `name` - Display name for the resulting file
///
/// # Errors
///
/// Returns [`MidiImportError::MalformedMidi`] when the bytes cannot be parsed,
/// for SMPTE-timed files and for Format 2 files, whose tracks are independent
/// sequences rather than parts played together.
pub fn import_midi_bytes(data: &[u8], name: &str) -> Result<MidiFile, MidiImportError> {
    let smf = Smf::parse(data).map_err(|e| MidiImportError::MalformedMidi(e.to_string()))?;

    if smf.header.format == Format::Sequential {
        return Err(MidiImportError::MalformedMidi(
            "Format 2 (sequential) files are not supported".to_string(),
        ));
    }

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int() as u32,
        Timing::Timecode(_, _) => {
            return Err(MidiImportError::MalformedMidi(
                "SMPTE timecode timing not supported".to_string(),
            ))
        }
    };
    if ticks_per_beat == 0 {
        return Err(MidiImportError::MalformedMidi(
            "header declares zero ticks per beat".to_string(),
        ));
    }

    let mut tempo_changes = Vec::new();
    let scanned: Vec<ScannedTrack> = smf
        .tracks
        .iter()
        .map(|track| scan_track(track, ticks_per_beat, &mut tempo_changes))
        .collect();

    let tempo_map = TempoMap::new(ticks_per_beat, tempo_changes);

    let tracks = scanned
        .into_iter()
        .map(|track| MidiTrack {
            name: track.name,
            events: track
                .notes
                .iter()
                .map(|note| {
                    let end_tick = note.end_tick.unwrap_or(note.start_tick);
                    let time = tempo_map.seconds_at(note.start_tick);
                    let duration = tempo_map.seconds_at(end_tick) - time;
                    MidiEvent::new(Pitch::from_midi(note.key), time, duration, note.velocity)
                })
                .collect(),
        })
        .collect();

    let file = MidiFile {
        name: name.to_string(),
        tracks,
        tempo_bpm: tempo_map.initial_bpm(),
        ticks_per_beat,
    };

    tracing::debug!(
        name = %file.name,
        tracks = file.tracks.len(),
        notes = file.event_count(),
        "parsed MIDI file"
    );

    Ok(file)
}

/// Collects the notes of one track chunk in onset order and records any
/// tempo changes into `tempo_changes`.
fn scan_track(
    track: &[TrackEvent],
    ticks_per_beat: u32,
    tempo_changes: &mut Vec<(u32, u32)>,
) -> ScannedTrack {
    let mut notes: Vec<PendingNote> = Vec::new();
    // Key is (channel, pitch), value is the index of the sounding note
    let mut active: HashMap<(u8, u8), usize> = HashMap::new();
    let mut name: Option<String> = None;

    // Current absolute tick position
    let mut current_tick: u32 = 0;

    for event in track {
        current_tick = current_tick.saturating_add(event.delta.as_int());

        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name_bytes)) => {
                if name.is_none() {
                    if let Ok(text) = std::str::from_utf8(name_bytes) {
                        name = Some(text.to_string());
                    }
                }
            }
            TrackEventKind::Meta(MetaMessage::Tempo(usec_per_beat)) => {
                tempo_changes.push((current_tick, usec_per_beat.as_int()));
            }
            TrackEventKind::Midi { channel, message } => {
                let ch = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        let key = key.as_int();
                        // Retriggering a sounding key ends the previous note
                        if let Some(index) = active.remove(&(ch, key)) {
                            notes[index].end_tick = Some(current_tick);
                        }
                        active.insert((ch, key), notes.len());
                        notes.push(PendingNote {
                            key,
                            velocity: vel.as_int(),
                            start_tick: current_tick,
                            end_tick: None,
                        });
                    }
                    // Note on with velocity 0 = note off
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        if let Some(index) = active.remove(&(ch, key.as_int())) {
                            notes[index].end_tick = Some(current_tick);
                        }
                    }
                    _ => {} // Ignore other MIDI messages
                }
            }
            _ => {} // Ignore SysEx and other events
        }
    }

    // Close any remaining active notes with a default duration of one beat
    for index in active.into_values() {
        let start = notes[index].start_tick;
        notes[index].end_tick = Some(start.saturating_add(ticks_per_beat));
    }

    ScannedTrack { name, notes }
}
