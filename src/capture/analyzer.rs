//! Windowed pitch analysis shared by all pitch sources.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;
use serde::{Deserialize, Serialize};

/// Detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Minimum signal power for a window to be analysed at all.
    pub power_threshold: f64,
    /// Minimum normalized clarity of the chosen peak (0..1).
    pub clarity_threshold: f64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            power_threshold: 1.0,
            clarity_threshold: 0.7,
        }
    }
}

/// Splits a mono sample stream into fixed, non-overlapping windows and
/// estimates the fundamental of each with the McLeod pitch method.
pub struct PitchAnalyzer {
    detector: McLeodDetector<f64>,
    window: usize,
    sample_rate: u32,
    settings: AnalyzerSettings,
    pending: Vec<f64>,
}

impl PitchAnalyzer {
    /// Creates an analyzer for `window`-sample frames at `sample_rate` Hz.
    ///
    /// A window of zero is raised to one sample.
    pub fn new(window: usize, sample_rate: u32, settings: AnalyzerSettings) -> Self {
        let window = window.max(1);
        Self {
            detector: McLeodDetector::new(window, window / 2),
            window,
            sample_rate,
            settings,
            pending: Vec::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Feeds interleaved samples with `channels` channels, mixing them down to
    /// mono. `emit` receives one pitch per completed window, 0.0 when the
    /// window holds no detectable pitch.
    pub fn push_interleaved(&mut self, samples: &[f32], channels: usize, mut emit: impl FnMut(f64)) {
        let channels = channels.max(1);
        for frame in samples.chunks(channels) {
            let mono = frame.iter().map(|&s| s as f64).sum::<f64>() / frame.len() as f64;
            self.pending.push(mono);
            if self.pending.len() == self.window {
                let pitch = self.analyze_pending();
                self.pending.clear();
                emit(pitch);
            }
        }
    }

    /// Feeds mono samples.
    pub fn push(&mut self, samples: &[f32], emit: impl FnMut(f64)) {
        self.push_interleaved(samples, 1, emit);
    }

    fn analyze_pending(&mut self) -> f64 {
        self.detector
            .get_pitch(
                &self.pending,
                self.sample_rate as usize,
                self.settings.power_threshold,
                self.settings.clarity_threshold,
            )
            .map(|p| p.frequency)
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notation::note_name;

    pub(crate) fn sine(freq: f64, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                amplitude * (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    #[test]
    fn test_detects_concert_a() {
        let mut analyzer = PitchAnalyzer::new(2048, 44100, AnalyzerSettings::default());
        let mut pitches = Vec::new();
        analyzer.push(&sine(440.0, 44100, 2048, 0.5), |p| pitches.push(p));

        assert_eq!(pitches.len(), 1);
        assert!((pitches[0] - 440.0).abs() < 5.0, "got {}", pitches[0]);
        assert_eq!(note_name(pitches[0]).as_deref(), Some("A/4"));
    }

    #[test]
    fn test_silence_reports_zero() {
        let mut analyzer = PitchAnalyzer::new(1024, 44100, AnalyzerSettings::default());
        let mut pitches = Vec::new();
        analyzer.push(&vec![0.0; 1024], |p| pitches.push(p));
        assert_eq!(pitches, vec![0.0]);
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let mut analyzer = PitchAnalyzer::new(512, 44100, AnalyzerSettings::default());
        let mut count = 0;
        analyzer.push(&vec![0.0; 700], |_| count += 1);
        assert_eq!(count, 1);
        analyzer.push(&vec![0.0; 300], |_| count += 1);
        assert_eq!(count, 1);
        analyzer.push(&vec![0.0; 24], |_| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let mut analyzer = PitchAnalyzer::new(2048, 44100, AnalyzerSettings::default());
        let mono = sine(261.63, 44100, 2048, 0.5);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();
        let mut pitches = Vec::new();
        analyzer.push_interleaved(&stereo, 2, |p| pitches.push(p));
        assert_eq!(pitches.len(), 1);
        assert_eq!(note_name(pitches[0]).as_deref(), Some("C/4"));
    }
}
