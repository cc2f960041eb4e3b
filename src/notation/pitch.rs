//! Frequency to note name conversion.

use super::{Pitch, PitchClass};

/// Concert pitch reference.
pub const A4_HZ: f64 = 440.0;

/// Frequency of C0, 4.75 octaves (57 semitones) below A4.
pub const C0_HZ: f64 = 16.351_597_831_287_414; // 440 * 2^-4.75

/// Converts a fundamental frequency to the nearest equal-tempered pitch.
///
/// Returns `None` for readings that are not a usable pitch: zero, negative,
/// NaN or infinite input, and frequencies whose nearest note falls outside the
/// MIDI range (below C-1 or above G9).
///
/// # Examples
///
/// ```
/// use pentagrama::notation::{frequency_to_pitch, Pitch, PitchClass};
///
/// assert_eq!(frequency_to_pitch(440.0), Some(Pitch::new(PitchClass::A, 4)));
/// ```
pub fn frequency_to_pitch(hz: f64) -> Option<Pitch> {
    if !hz.is_finite() || hz <= 0.0 {
        return None;
    }

    let half_steps = (12.0 * (hz / C0_HZ).log2()).round();
    // C-1 is 12 half steps below C0, G9 is 127 - 12 above it.
    if !(-12.0..=115.0).contains(&half_steps) {
        return None;
    }

    let half_steps = half_steps as i32;
    let octave = half_steps.div_euclid(12) as i8;
    Some(Pitch::new(PitchClass::from_index(half_steps), octave))
}

/// Staff label ("Name/Octave") for a frequency, e.g. 440.0 -> "A/4".
pub fn note_name(hz: f64) -> Option<String> {
    frequency_to_pitch(hz).map(Pitch::key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frequencies() {
        assert_eq!(note_name(440.0).as_deref(), Some("A/4"));
        assert_eq!(note_name(261.63).as_deref(), Some("C/4"));
        assert_eq!(note_name(523.25).as_deref(), Some("C/5"));
        assert_eq!(note_name(277.18).as_deref(), Some("C#/4"));
        assert_eq!(note_name(82.41).as_deref(), Some("E/2"));
    }

    #[test]
    fn test_c0_constant() {
        assert!((C0_HZ - A4_HZ * 2f64.powf(-4.75)).abs() < 1e-9);
        assert_eq!(note_name(C0_HZ).as_deref(), Some("C/0"));
    }

    #[test]
    fn test_rounds_to_nearest_semitone() {
        // A quarter tone sharp of A4 is still closer to A4 than to A#4
        assert_eq!(note_name(445.0).as_deref(), Some("A/4"));
        assert_eq!(note_name(460.0).as_deref(), Some("A#/4"));
    }

    #[test]
    fn test_idempotent() {
        for hz in [27.5, 110.0, 261.63, 999.9, 4186.0] {
            assert_eq!(frequency_to_pitch(hz), frequency_to_pitch(hz));
        }
    }

    #[test]
    fn test_invalid_readings_ignored() {
        assert_eq!(frequency_to_pitch(0.0), None);
        assert_eq!(frequency_to_pitch(-440.0), None);
        assert_eq!(frequency_to_pitch(f64::NAN), None);
        assert_eq!(frequency_to_pitch(f64::INFINITY), None);
    }

    #[test]
    fn test_below_c0_uses_euclidean_octave() {
        // B-1 sits one semitone below C0; a truncating modulo would yield index -1
        let b = frequency_to_pitch(C0_HZ / 2f64.powf(1.0 / 12.0)).unwrap();
        assert_eq!(b, Pitch::new(PitchClass::B, -1));
        assert_eq!(b.to_midi(), Some(11));
        // C-1 is the lowest MIDI note
        assert_eq!(note_name(C0_HZ / 2.0).as_deref(), Some("C/-1"));
    }

    #[test]
    fn test_out_of_midi_range() {
        assert_eq!(frequency_to_pitch(4.0), None);
        assert_eq!(frequency_to_pitch(20_000.0), None);
        assert_eq!(note_name(12_543.85).as_deref(), Some("G/9"));
    }
}
