//! Synthesizer-backed transport.
//!
//! Notes are rendered with rustysynth from a SoundFont and played through
//! rodio. The transport clock is advanced inside the audio source, one
//! render buffer at a time, so scheduling follows the output sample count.

use super::transport::{ClockEvent, ClockState, NoteTrigger, Transport, TransportClock, VoiceHandle};
use super::AudioError;
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Frames rendered per synthesizer call.
/// Also the granularity at which scheduled notes start.
const BUFFER_SIZE: usize = 256;

/// Sends clock events to the synthesizer.
fn apply_events(synth: &mut Synthesizer, events: &[ClockEvent]) {
    for event in events {
        match *event {
            ClockEvent::NoteOn {
                channel,
                key,
                velocity,
            } => synth.note_on(channel as i32, key as i32, velocity as i32),
            ClockEvent::NoteOff { channel, key } => synth.note_off(channel as i32, key as i32),
        }
    }
}

/// Audio source that advances the clock and renders the synthesizer.
/// Implements rodio's Source trait for playback.
struct SynthSource {
    clock: Arc<Mutex<TransportClock>>,
    synth: Arc<Mutex<Synthesizer>>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl SynthSource {
    fn new(clock: Arc<Mutex<TransportClock>>, synth: Arc<Mutex<Synthesizer>>) -> Self {
        Self {
            clock,
            synth,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }

    fn render_next(&mut self) {
        let events = match self.clock.lock() {
            Ok(mut clock) => clock.advance(BUFFER_SIZE as u64),
            Err(_) => Vec::new(),
        };

        if let Ok(mut synth) = self.synth.lock() {
            apply_events(&mut synth, &events);
            synth.render(&mut self.left_buf, &mut self.right_buf);
        } else {
            self.left_buf.fill(0.0);
            self.right_buf.fill(0.0);
        }
        self.buf_pos = 0;
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            self.render_next();
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Everything that exists once the engine has started.
struct AudioOutput {
    synth: Arc<Mutex<Synthesizer>>,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

/// Loads a SoundFont and creates a synthesizer for it.
///
/// # Errors
///
/// Returns [`AudioError::SoundFont`] if the file cannot be opened or parsed
/// and [`AudioError::Synthesizer`] if the synthesizer rejects it.
pub fn load_synthesizer(path: &Path) -> Result<Synthesizer, AudioError> {
    let file = File::open(path).map_err(|e| {
        AudioError::SoundFont(format!("failed to open {}: {}", path.display(), e))
    })?;
    let soundfont = Arc::new(
        SoundFont::new(&mut BufReader::new(file))
            .map_err(|e| AudioError::SoundFont(format!("{}: {:?}", path.display(), e)))?,
    );

    let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
    Synthesizer::new(&soundfont, &settings)
        .map_err(|e| AudioError::Synthesizer(format!("{:?}", e)))
}

/// [`Transport`] that plays through the default audio output.
///
/// The output device and SoundFont are only touched by
/// [`start_engine`](Transport::start_engine); until then scheduling works on
/// the clock alone.
pub struct SynthTransport {
    soundfont: Option<PathBuf>,
    clock: Arc<Mutex<TransportClock>>,
    output: Option<AudioOutput>,
}

impl SynthTransport {
    /// Creates a transport that will load `soundfont` when started.
    pub fn new(soundfont: Option<PathBuf>) -> Self {
        Self {
            soundfont,
            clock: Arc::new(Mutex::new(TransportClock::new(SAMPLE_RATE))),
            output: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.output.is_some()
    }

    /// Runs `f` on the locked clock. `None` if the audio thread poisoned it.
    fn with_clock<R>(&self, f: impl FnOnce(&mut TransportClock) -> R) -> Option<R> {
        let mut clock = self.clock.lock().ok()?;
        Some(f(&mut clock))
    }

    fn send(&self, events: &[ClockEvent]) {
        if events.is_empty() {
            return;
        }
        if let Some(output) = &self.output {
            if let Ok(mut synth) = output.synth.lock() {
                apply_events(&mut synth, events);
            }
        }
    }
}

impl Transport for SynthTransport {
    fn start_engine(&mut self) -> Result<(), AudioError> {
        if self.output.is_some() {
            return Ok(());
        }

        let path = self
            .soundfont
            .as_deref()
            .ok_or_else(|| AudioError::SoundFont("no SoundFont configured".to_string()))?;
        let synth = Arc::new(Mutex::new(load_synthesizer(path)?));

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        let source = SynthSource::new(Arc::clone(&self.clock), Arc::clone(&synth));
        stream_handle
            .play_raw(source)
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        tracing::info!(soundfont = %path.display(), "Audio engine started");
        self.output = Some(AudioOutput {
            synth,
            _stream: stream,
            _stream_handle: stream_handle,
        });
        Ok(())
    }

    fn create_voice(&mut self) -> Result<VoiceHandle, AudioError> {
        self.with_clock(|clock| clock.create_voice())
            .unwrap_or_else(|| Err(AudioError::Synthesizer("transport clock poisoned".into())))
    }

    fn clear(&mut self) {
        let events = self.with_clock(|clock| clock.clear()).unwrap_or_default();
        self.send(&events);
    }

    fn schedule(&mut self, voice: VoiceHandle, trigger: NoteTrigger) {
        self.with_clock(|clock| clock.schedule(voice, trigger));
    }

    fn start_clock(&mut self) {
        self.with_clock(|clock| clock.start());
    }

    fn pause_clock(&mut self) {
        let events = self.with_clock(|clock| clock.pause()).unwrap_or_default();
        self.send(&events);
    }

    fn stop_clock(&mut self) {
        let events = self.with_clock(|clock| clock.stop()).unwrap_or_default();
        self.send(&events);
    }

    fn clock_state(&self) -> ClockState {
        self.with_clock(|clock| clock.state())
            .unwrap_or(ClockState::Stopped)
    }

    fn finished(&self) -> bool {
        self.with_clock(|clock| clock.finished()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_soundfont_fails() {
        let mut transport = SynthTransport::new(None);
        assert!(matches!(
            transport.start_engine(),
            Err(AudioError::SoundFont(_))
        ));
        assert!(!transport.is_started());
    }

    #[test]
    fn test_missing_soundfont_file() {
        let err = load_synthesizer(Path::new("/no/such/font.sf2")).unwrap_err();
        assert!(matches!(err, AudioError::SoundFont(_)));
    }

    #[test]
    fn test_scheduling_works_before_engine_start() {
        let mut transport = SynthTransport::new(None);
        let voice = transport.create_voice().unwrap();
        transport.schedule(
            voice,
            NoteTrigger {
                at: 0.0,
                duration: 0.5,
                key: 60,
                velocity: 90,
            },
        );
        assert!(!transport.finished());

        transport.start_clock();
        assert_eq!(transport.clock_state(), ClockState::Started);
        transport.pause_clock();
        assert_eq!(transport.clock_state(), ClockState::Paused);
        transport.stop_clock();
        transport.clear();
        assert_eq!(transport.clock_state(), ClockState::Stopped);
        assert!(transport.finished());
    }
}
