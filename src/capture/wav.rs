//! Pitch source that replays a WAV recording.
//!
//! Useful without a microphone: the recording is decoded with hound and
//! pushed through the same analyzer the live input uses. In paced mode the
//! frames arrive at the recording's real speed from a background thread;
//! otherwise every frame is delivered before `open` returns.

use super::{AnalyzerSettings, CaptureError, FrameSink, PitchAnalyzer, PitchSource};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Replays a WAV file as if it were a live input.
pub struct WavFileSource {
    path: PathBuf,
    settings: AnalyzerSettings,
    paced: bool,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl WavFileSource {
    /// Creates a source for `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - WAV file to analyse
    /// * `settings` - Detector thresholds
    /// * `paced` - Deliver frames in real time instead of all at once
    pub fn new<P: AsRef<Path>>(path: P, settings: AnalyzerSettings, paced: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            settings,
            paced,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decodes a WAV file to interleaved `f32` samples in -1..1.
///
/// # Returns
///
/// The samples, the channel count and the sample rate.
fn read_samples(path: &Path) -> Result<(Vec<f32>, usize, u32), hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((samples, spec.channels as usize, spec.sample_rate))
}

impl PitchSource for WavFileSource {
    fn open(&mut self, window: usize, sink: FrameSink) -> Result<(), CaptureError> {
        self.close();

        let (samples, channels, sample_rate) = read_samples(&self.path)?;
        let mut analyzer = PitchAnalyzer::new(window, sample_rate, self.settings);
        tracing::info!(
            path = %self.path.display(),
            sample_rate,
            channels,
            window,
            paced = self.paced,
            "Opening WAV input"
        );

        if !self.paced {
            analyzer.push_interleaved(&samples, channels, |pitch_hz| {
                sink.send(pitch_hz);
            });
            return Ok(());
        }

        self.stop.store(false, Ordering::Relaxed);
        let stop = Arc::clone(&self.stop);
        let chunk = analyzer.window() * channels.max(1);
        let pause = Duration::from_secs_f64(analyzer.window() as f64 / sample_rate.max(1) as f64);
        self.worker = Some(std::thread::spawn(move || {
            for block in samples.chunks(chunk) {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let mut delivered = true;
                analyzer.push_interleaved(block, channels, |pitch_hz| {
                    delivered = sink.send(pitch_hz);
                });
                if !delivered {
                    break;
                }
                std::thread::sleep(pause);
            }
            tracing::debug!("WAV replay finished");
        }));
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("WAV replay thread panicked");
            }
        }
    }

    fn describe(&self) -> String {
        format!("WAV file {}", self.path.display())
    }
}

impl Drop for WavFileSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capture::analyzer::tests::sine;
    use crate::capture::SessionToken;
    use hound::{WavSpec, WavWriter};
    use std::sync::mpsc;

    /// Writes a 16-bit mono WAV with one 2048-sample tone per frequency.
    pub(crate) fn write_tones(path: &Path, freqs: &[f64]) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &freq in freqs {
            for s in sine(freq, 44100, 2048, 0.5) {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_unpaced_replay_emits_every_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tones.wav");
        write_tones(&path, &[440.0, 0.0, 523.25]);

        let (tx, rx) = mpsc::channel();
        let mut source = WavFileSource::new(&path, AnalyzerSettings::default(), false);
        source.open(2048, FrameSink::new(SessionToken::next(), tx)).unwrap();
        source.close();

        let pitches: Vec<f64> = rx.try_iter().map(|f| f.pitch_hz).collect();
        assert_eq!(pitches.len(), 3);
        assert!((pitches[0] - 440.0).abs() < 5.0);
        assert_eq!(pitches[1], 0.0);
        assert!((pitches[2] - 523.25).abs() < 6.0);
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let (tx, _rx) = mpsc::channel();
        let mut source = WavFileSource::new("/no/such/input.wav", AnalyzerSettings::default(), false);
        let err = source
            .open(2048, FrameSink::new(SessionToken::next(), tx))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Wav(_)));
    }
}
