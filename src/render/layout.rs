//! Measure-aware horizontal layout of notes on the staff.

use super::StaffGeometry;
use crate::notation::NotationEvent;

/// Gap between a note's slot start and its head.
const NOTE_PADDING: f32 = 12.0;

/// Half the width of a note head.
const HEAD_HALF_WIDTH: f32 = 6.0;

/// Distance of a barline before the first note head of the next measure.
const BARLINE_GAP: f32 = 4.0;

/// Tolerance when comparing fractional beat positions.
const BEAT_EPSILON: f32 = 1e-4;

/// A note with its position on the staff.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNote {
    pub event: NotationEvent,
    /// Horizontal center of the note head.
    pub x: f32,
    /// Vertical position in staff steps (0 = bottom line E4, 8 = top line F5).
    pub step: i32,
    pub stem_up: bool,
    /// Steps needing a ledger line, nearest the staff first.
    pub ledger_steps: Vec<i32>,
    /// Zero-based measure this note belongs to.
    pub measure: usize,
}

/// Result of laying out a sequence of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub notes: Vec<PlacedNote>,
    /// X positions of barlines between measures.
    pub barlines: Vec<f32>,
    /// Number of (possibly incomplete) measures used.
    pub measures: usize,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Staff step of an event relative to the bottom line of a treble staff.
pub fn staff_step(event: &NotationEvent) -> i32 {
    event.pitch.diatonic_step() - StaffGeometry::BOTTOM_LINE_STEP
}

fn ledger_steps(step: i32) -> Vec<i32> {
    if step <= -2 {
        (step..=-2).rev().filter(|s| s % 2 == 0).collect()
    } else if step >= StaffGeometry::TOP_LINE + 2 {
        (StaffGeometry::TOP_LINE + 2..=step)
            .filter(|s| s % 2 == 0)
            .collect()
    } else {
        Vec::new()
    }
}

/// Lays `events` out left to right within the staff's formatting width.
///
/// Horizontal space is shared in proportion to each note's length in beats,
/// and measures are closed every `beats_per_measure` beats with a barline.
/// An empty input yields an empty layout.
pub fn layout_events(events: &[NotationEvent], staff: &StaffGeometry) -> Layout {
    if events.is_empty() {
        return Layout::default();
    }

    let beats_per_measure = staff.beats_per_measure.max(1) as f32;
    let total_beats: f32 = events.iter().map(|e| e.duration.beats()).sum();
    let start_x = staff.notes_start_x();
    let x_at = |beat: f32| start_x + beat / total_beats * staff.format_width;

    let mut notes = Vec::with_capacity(events.len());
    let mut beat = 0.0f32;
    for event in events {
        let step = staff_step(event);
        let measure = ((beat + BEAT_EPSILON) / beats_per_measure).floor() as usize;
        notes.push(PlacedNote {
            event: *event,
            x: x_at(beat) + NOTE_PADDING,
            step,
            stem_up: step < StaffGeometry::MIDDLE_LINE,
            ledger_steps: ledger_steps(step),
            measure,
        });
        beat += event.duration.beats();
    }

    let mut barlines = Vec::new();
    let mut boundary = beats_per_measure;
    while boundary < total_beats - BEAT_EPSILON {
        barlines.push(x_at(boundary) + NOTE_PADDING - HEAD_HALF_WIDTH - BARLINE_GAP);
        boundary += beats_per_measure;
    }

    let measures = notes.last().map(|n| n.measure + 1).unwrap_or(0);

    Layout {
        notes,
        barlines,
        measures,
    }
}
