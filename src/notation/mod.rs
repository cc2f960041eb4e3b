//! Notation data structures shared by every producer and consumer of notes.
//!
//! Live capture and MIDI import both produce [`NotationEvent`]s, the score
//! renderer draws them and the exporter writes them back out as MIDI.

mod buffer;
mod pitch;

pub use buffer::{NoteBuffer, NOTE_BUFFER_CAPACITY};
pub use pitch::{frequency_to_pitch, note_name, A4_HZ, C0_HZ};

use std::fmt;

/// Note names for the twelve semitones, sharps only.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the twelve semitone classes of the chromatic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All classes in ascending semitone order, starting at C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Returns the class for a semitone index. The index is reduced modulo 12,
    /// so negative values wrap around instead of indexing out of bounds.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Semitone index within the octave (C = 0, B = 11).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Display name, e.g. "C#".
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index() as usize]
    }

    /// Position of the letter name on the staff (C = 0 ... B = 6).
    /// Sharps share the position of their natural.
    pub fn diatonic_index(self) -> i32 {
        match self {
            PitchClass::C | PitchClass::CSharp => 0,
            PitchClass::D | PitchClass::DSharp => 1,
            PitchClass::E => 2,
            PitchClass::F | PitchClass::FSharp => 3,
            PitchClass::G | PitchClass::GSharp => 4,
            PitchClass::A | PitchClass::ASharp => 5,
            PitchClass::B => 6,
        }
    }

    /// Whether this class is written with a sharp sign.
    pub fn is_sharp(self) -> bool {
        self.name().len() > 1
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semitone offset from C of a note name within its octave. "Cb" yields -1.
#[cfg(test)]
fn semitone_of_name(name: &str) -> Option<i32> {
    if let Some(index) = NOTE_NAMES.iter().position(|&n| n.eq_ignore_ascii_case(name)) {
        return Some(index as i32);
    }

    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.as_str() != "b" {
        return None;
    }
    let natural = NOTE_NAMES
        .iter()
        .position(|&n| n.len() == 1 && n.starts_with(letter))?;
    Some(natural as i32 - 1)
}

/// A pitch in scientific pitch notation. C4 is middle C (MIDI note 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i8,
}

impl Pitch {
    pub fn new(class: PitchClass, octave: i8) -> Self {
        Self { class, octave }
    }

    /// Converts a MIDI note number (0-127) to a pitch.
    pub fn from_midi(note: u8) -> Self {
        let octave = (note / 12) as i8 - 1; // MIDI octave convention
        Self::new(PitchClass::from_index((note % 12) as i32), octave)
    }

    /// Converts this pitch to a MIDI note number, or None when the pitch lies
    /// outside the MIDI range (C-1 to G9).
    pub fn to_midi(self) -> Option<u8> {
        let note = (self.octave as i16 + 1) * 12 + self.class.index() as i16;
        if (0..=127).contains(&note) {
            Some(note as u8)
        } else {
            None
        }
    }

    /// Staff key in "Name/Octave" form, e.g. "C#/4".
    pub fn key(self) -> String {
        format!("{}/{}", self.class, self.octave)
    }

    /// Parses either a staff key ("C#/4") or a compact note name ("C#4").
    #[cfg(test)]
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (name, octave) = match text.split_once('/') {
            Some((name, octave)) => (name, octave),
            None => {
                // Find where the octave number starts
                let octave_start = text
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| c.is_ascii_digit() || *c == '-')
                    .map(|(i, _)| i)?;
                text.split_at(octave_start)
            }
        };

        let semitone = semitone_of_name(name)?;
        let octave: i32 = octave.parse().ok()?;
        // "Cb4" is B3: the flat crosses the octave boundary
        let absolute = octave * 12 + semitone;
        let octave = i8::try_from(absolute.div_euclid(12)).ok()?;
        Some(Self::new(PitchClass::from_index(absolute), octave))
    }

    /// Staff position counted in diatonic steps from C0.
    pub fn diatonic_step(self) -> i32 {
        self.class.diatonic_index() + 7 * self.octave as i32
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}

/// Symbolic note duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DurationClass {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl DurationClass {
    /// Length in beats, where a quarter note is one beat.
    pub fn beats(self) -> f32 {
        match self {
            DurationClass::Whole => 4.0,
            DurationClass::Half => 2.0,
            DurationClass::Quarter => 1.0,
            DurationClass::Eighth => 0.5,
            DurationClass::Sixteenth => 0.25,
        }
    }

    /// Length in MIDI ticks at the given resolution.
    pub fn ticks(self, ticks_per_beat: u32) -> u32 {
        (self.beats() * ticks_per_beat as f32).round() as u32
    }

    /// Short notation code: "w", "h", "q", "8" or "16".
    pub fn code(self) -> &'static str {
        match self {
            DurationClass::Whole => "w",
            DurationClass::Half => "h",
            DurationClass::Quarter => "q",
            DurationClass::Eighth => "8",
            DurationClass::Sixteenth => "16",
        }
    }

    /// Number of flags drawn on the stem.
    pub fn flags(self) -> u8 {
        match self {
            DurationClass::Eighth => 1,
            DurationClass::Sixteenth => 2,
            _ => 0,
        }
    }

    /// Whether the note head is drawn hollow.
    pub fn is_open(self) -> bool {
        matches!(self, DurationClass::Whole | DurationClass::Half)
    }

    /// Whether the note has a stem at all.
    pub fn has_stem(self) -> bool {
        self != DurationClass::Whole
    }
}

/// A single symbol destined for the staff: one pitch with a duration.
///
/// Events are never built by hand from strings at runtime; they come from a
/// detected frequency ([`NotationEvent::from_frequency`]) or from an imported
/// MIDI note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotationEvent {
    pub pitch: Pitch,
    pub duration: DurationClass,
}

impl NotationEvent {
    pub fn new(pitch: Pitch, duration: DurationClass) -> Self {
        Self { pitch, duration }
    }

    /// A quarter note, the fixed display duration for captured and imported notes.
    pub fn quarter(pitch: Pitch) -> Self {
        Self::new(pitch, DurationClass::Quarter)
    }

    /// Builds a quarter note from a detected frequency, if it maps to a pitch.
    pub fn from_frequency(hz: f64) -> Option<Self> {
        frequency_to_pitch(hz).map(Self::quarter)
    }

    /// Staff key, e.g. "C#/4".
    pub fn key(&self) -> String {
        self.pitch.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_midi_conversion() {
        assert_eq!(Pitch::from_midi(60), Pitch::new(PitchClass::C, 4));
        assert_eq!(Pitch::from_midi(69), Pitch::new(PitchClass::A, 4));
        assert_eq!(Pitch::from_midi(0), Pitch::new(PitchClass::C, -1));
        assert_eq!(Pitch::from_midi(127), Pitch::new(PitchClass::G, 9));
        assert_eq!(Pitch::new(PitchClass::FSharp, 5).to_midi(), Some(78));
        assert_eq!(Pitch::new(PitchClass::GSharp, 9).to_midi(), None);
        assert_eq!(Pitch::new(PitchClass::B, -2).to_midi(), None);
    }

    #[test]
    fn test_pitch_parse() {
        assert_eq!(Pitch::parse("C#/4"), Some(Pitch::new(PitchClass::CSharp, 4)));
        assert_eq!(Pitch::parse("C4"), Some(Pitch::new(PitchClass::C, 4)));
        assert_eq!(Pitch::parse("A#-1"), Some(Pitch::new(PitchClass::ASharp, -1)));
        assert_eq!(Pitch::parse("Bb3"), Some(Pitch::new(PitchClass::ASharp, 3)));
        assert_eq!(Pitch::parse("Cb/4"), Some(Pitch::new(PitchClass::B, 3)));
        assert_eq!(Pitch::parse("H4"), None);
        assert_eq!(Pitch::parse(""), None);
    }

    #[test]
    fn test_key_format() {
        let event = NotationEvent::quarter(Pitch::new(PitchClass::DSharp, 5));
        assert_eq!(event.key(), "D#/5");
        assert_eq!(event.duration.code(), "q");
        assert_eq!(Pitch::new(PitchClass::DSharp, 5).to_string(), "D#5");
    }

    #[test]
    fn test_from_index_wraps_negative() {
        assert_eq!(PitchClass::from_index(-1), PitchClass::B);
        assert_eq!(PitchClass::from_index(-12), PitchClass::C);
        assert_eq!(PitchClass::from_index(13), PitchClass::CSharp);
    }

    #[test]
    fn test_duration_ticks() {
        assert_eq!(DurationClass::Quarter.ticks(480), 480);
        assert_eq!(DurationClass::Whole.ticks(480), 1920);
        assert_eq!(DurationClass::Sixteenth.ticks(480), 120);
    }
}
