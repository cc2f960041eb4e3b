//! Standard MIDI File (SMF) export.
//!
//! Writes the staff's notes as a Format 0 file: one track holding the tempo
//! and time signature followed by the notes one after another.
//!
//! # Limitations
//!
//! Every event is assumed to carry exactly one pitch; notes are laid end to
//! end from tick 0 using their symbolic duration, so rests and real timing
//! are not represented.

use super::{DEFAULT_USEC_PER_BEAT, TICKS_PER_BEAT};
use crate::notation::NotationEvent;

/// Velocity written for every exported note.
pub const EXPORT_VELOCITY: u8 = 64;

/// Writes a variable-length quantity (VLQ) used for delta times in MIDI.
///
/// VLQ encodes values using 7 bits per byte, with the MSB indicating
/// whether more bytes follow (1 = more bytes, 0 = last byte).
fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
    if value == 0 {
        buffer.push(0);
        return;
    }

    let mut temp = value;
    let mut bytes = Vec::with_capacity(4);

    while temp > 0 {
        bytes.push((temp & 0x7F) as u8);
        temp >>= 7;
    }

    // Write bytes in reverse order with continuation bits
    for (i, &byte) in bytes.iter().rev().enumerate() {
        if i < bytes.len() - 1 {
            buffer.push(byte | 0x80);
        } else {
            buffer.push(byte);
        }
    }
}

/// Events this writer knows how to encode.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    /// Microseconds per quarter note
    SetTempo(u32),
    /// Numerator and denominator as a power of two
    TimeSignature { numerator: u8, denominator_power: u8 },
    TrackName(String),
    EndOfTrack,
}

/// An event at an absolute tick. `priority` orders events sharing a tick
/// (lower first) so that meta events precede notes and note offs precede
/// the next note on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TimedEvent {
    pub tick: u32,
    pub event: WriteEvent,
    pub priority: u8,
}

impl TimedEvent {
    pub fn new(tick: u32, event: WriteEvent, priority: u8) -> Self {
        Self {
            tick,
            event,
            priority,
        }
    }
}

/// Writes a single MIDI event to the buffer (without delta time).
fn write_event(event: &WriteEvent, buffer: &mut Vec<u8>) {
    match event {
        WriteEvent::NoteOn {
            channel,
            key,
            velocity,
        } => {
            buffer.extend_from_slice(&[0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]);
        }
        WriteEvent::NoteOff { channel, key } => {
            buffer.extend_from_slice(&[0x80 | (channel & 0x0F), key & 0x7F, 0]);
        }
        WriteEvent::SetTempo(usec) => {
            // FF 51 03 tt tt tt
            buffer.extend_from_slice(&[0xFF, 0x51, 0x03]);
            buffer.extend_from_slice(&usec.to_be_bytes()[1..]);
        }
        WriteEvent::TimeSignature {
            numerator,
            denominator_power,
        } => {
            // FF 58 04 nn dd cc bb: 24 clocks per click, 8 32nds per quarter
            buffer.extend_from_slice(&[0xFF, 0x58, 0x04, *numerator, *denominator_power, 24, 8]);
        }
        WriteEvent::TrackName(name) => {
            buffer.extend_from_slice(&[0xFF, 0x03]);
            write_vlq(name.len() as u32, buffer);
            buffer.extend_from_slice(name.as_bytes());
        }
        WriteEvent::EndOfTrack => {
            buffer.extend_from_slice(&[0xFF, 0x2F, 0x00]);
        }
    }
}

/// Builds the track chunk data from a list of timed events.
///
/// Events are sorted by tick position and converted to delta times.
fn build_track_data(events: &mut [TimedEvent]) -> Vec<u8> {
    let mut buffer = Vec::new();
    events.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.priority.cmp(&b.priority)));

    let mut last_tick = 0u32;
    for timed_event in events.iter() {
        let delta = timed_event.tick.saturating_sub(last_tick);
        write_vlq(delta, &mut buffer);
        write_event(&timed_event.event, &mut buffer);
        last_tick = timed_event.tick;
    }

    buffer
}

/// Assembles a complete file: the MThd header followed by one MTrk chunk per
/// track. A single track is written as Format 0, several as Format 1.
pub(crate) fn write_smf(ticks_per_beat: u16, tracks: Vec<Vec<TimedEvent>>) -> Vec<u8> {
    let format: u16 = if tracks.len() == 1 { 0 } else { 1 };

    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&ticks_per_beat.to_be_bytes());

    for mut events in tracks {
        let data = build_track_data(&mut events);
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&data);
    }

    out
}

/// Encodes notation events as a single-track Standard MIDI File.
///
/// Each event becomes one note on channel 0 starting where the previous one
/// ended, at 120 BPM in 4/4. Events whose pitch has no MIDI number are
/// skipped.
pub fn notation_to_midi(events: &[NotationEvent]) -> Vec<u8> {
    let mut track = vec![
        TimedEvent::new(0, WriteEvent::TrackName("pentagrama".to_string()), 0),
        TimedEvent::new(
            0,
            WriteEvent::TimeSignature {
                numerator: 4,
                denominator_power: 2,
            },
            1,
        ),
        TimedEvent::new(0, WriteEvent::SetTempo(DEFAULT_USEC_PER_BEAT), 2),
    ];

    let mut tick = 0u32;
    for event in events {
        let Some(key) = event.pitch.to_midi() else {
            tracing::warn!(key = %event.key(), "skipping note outside the MIDI range");
            continue;
        };
        let length = event.duration.ticks(TICKS_PER_BEAT).max(1);

        track.push(TimedEvent::new(
            tick,
            WriteEvent::NoteOn {
                channel: 0,
                key,
                velocity: EXPORT_VELOCITY,
            },
            11,
        ));
        track.push(TimedEvent::new(
            tick + length,
            WriteEvent::NoteOff { channel: 0, key },
            10, // Note offs before note ons at the same tick
        ));
        tick += length;
    }

    track.push(TimedEvent::new(tick, WriteEvent::EndOfTrack, 255));

    write_smf(TICKS_PER_BEAT as u16, vec![track])
}
