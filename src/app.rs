//! Application state and event handling.
//!
//! [`App`] is the single owner of everything the user interacts with: the
//! note buffer, the loaded MIDI file, the capture and playback sessions, the
//! drawing surface and the exporter. UI events call its methods; the
//! [`Controls`] flags say which actions are currently allowed.

use crate::audio::{MidiPlaybackSession, PlaybackState, SynthTransport, Transport};
use crate::capture::{CaptureState, LiveCaptureSession, MicrophoneSource, PitchSource, WavFileSource};
use crate::config::Settings;
use crate::export::{ExportService, PdfWriter};
use crate::midi::{import_midi_bytes, import_midi_file, MidiFile, MidiImportError};
use crate::notation::{NotationEvent, NoteBuffer};
use crate::render::{Layout, RasterSurface, ScoreRenderer, StaffGeometry};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Which user actions are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_capture: bool,
    pub stop_capture: bool,
    /// Off while capturing, so only one producer fills the staff.
    pub load_midi: bool,
    pub play: bool,
    pub pause: bool,
    pub export_pdf: bool,
    pub export_midi: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            start_capture: true,
            stop_capture: false,
            load_midi: true,
            play: false,
            pause: false,
            export_pdf: true,
            export_midi: false,
        }
    }
}

/// Main application state.
pub struct App {
    settings: Settings,
    notes: NoteBuffer,
    current_midi: Option<MidiFile>,
    capture: LiveCaptureSession,
    playback: MidiPlaybackSession,
    renderer: ScoreRenderer,
    surface: RasterSurface,
    exporter: ExportService,
    layout: Layout,
    /// Enabled actions.
    pub controls: Controls,
    /// Status message to display, with the time it was set.
    pub status_message: Option<(String, Instant)>,
    /// Set when the user asked to quit.
    pub should_quit: bool,
}

impl App {
    /// Creates the application with the default microphone (or the
    /// configured WAV file) and the SoundFont synthesizer.
    ///
    /// # Errors
    ///
    /// Returns error if the drawing surface cannot be created.
    pub fn new(settings: Settings) -> Result<Self> {
        let source: Box<dyn PitchSource> = match &settings.wav_input {
            Some(path) => Box::new(WavFileSource::new(path, settings.analyzer_settings(), true)),
            None => Box::new(MicrophoneSource::new(settings.analyzer_settings())),
        };
        let transport = Box::new(SynthTransport::new(settings.soundfont.clone()));
        Self::with_collaborators(settings, source, transport)
    }

    /// Creates the application around the given pitch source and transport.
    ///
    /// # Errors
    ///
    /// Returns error if the drawing surface cannot be created.
    pub fn with_collaborators(
        settings: Settings,
        source: Box<dyn PitchSource>,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let surface = RasterSurface::new(settings.surface_width, settings.surface_height)
            .context("Failed to create drawing surface")?;
        let staff = StaffGeometry::for_surface(settings.surface_width, settings.surface_height);
        let exporter = ExportService::new(Box::new(PdfWriter::new()), &settings.output_dir);

        let mut app = Self {
            capture: LiveCaptureSession::new(source, settings.analysis_window),
            playback: MidiPlaybackSession::new(transport),
            renderer: ScoreRenderer::new(staff),
            surface,
            exporter,
            notes: NoteBuffer::new(),
            current_midi: None,
            layout: Layout::default(),
            controls: Controls::default(),
            status_message: None,
            should_quit: false,
            settings,
        };
        app.redraw();
        Ok(app)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notes(&self) -> &NoteBuffer {
        &self.notes
    }

    pub fn current_midi(&self) -> Option<&MidiFile> {
        self.current_midi.as_ref()
    }

    /// Layout of the notes currently drawn.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn staff(&self) -> &StaffGeometry {
        self.renderer.staff()
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn playback_state(&mut self) -> PlaybackState {
        self.playback.state()
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Redraws the staff from the note buffer.
    fn redraw(&mut self) {
        let events = self.notes.to_vec();
        self.layout = self.renderer.redraw(&mut self.surface, &events);
    }

    /// Periodic update: collects captured notes, follows the end of
    /// playback and expires the status line.
    ///
    /// # Returns
    ///
    /// Whether the staff was redrawn.
    pub fn tick(&mut self) -> bool {
        let appended = self.capture.poll(&mut self.notes);
        if appended > 0 {
            self.redraw();
            self.controls.export_pdf = true;
            self.controls.export_midi = true;
        }

        if self.controls.pause && self.playback.state() == PlaybackState::Stopped {
            self.controls.pause = false;
            self.controls.play = self.current_midi.is_some();
        }

        self.clear_expired_status();
        appended > 0
    }

    // ==================== Live capture ====================

    /// Starts listening for pitches.
    pub fn start_capture(&mut self) {
        if !self.controls.start_capture {
            return;
        }
        self.controls.start_capture = false;
        self.controls.stop_capture = true;
        self.controls.load_midi = false;

        match self.capture.start() {
            Ok(()) => {
                let source = self.capture.source_name();
                self.set_status(format!("Listening ({})", source));
            }
            Err(e) => {
                tracing::error!("Failed to start capture: {}", e);
                self.set_status(format!("Could not open audio input: {}", e));
                self.controls.start_capture = true;
                self.controls.stop_capture = false;
                self.controls.load_midi = true;
            }
        }
    }

    /// Stops listening. Notes analysed before the stop are still shown.
    pub fn stop_capture(&mut self) {
        if !self.controls.stop_capture {
            return;
        }
        self.capture.stop();
        self.controls.start_capture = true;
        self.controls.stop_capture = false;
        self.controls.load_midi = true;
        self.tick();
        self.set_status("Capture stopped");
    }

    // ==================== MIDI import ====================

    /// Loads MIDI file contents. Refused while capturing.
    ///
    /// # Returns
    ///
    /// Whether the file was loaded.
    pub fn load_midi_bytes(&mut self, bytes: &[u8], name: &str) -> bool {
        if !self.import_allowed() {
            return false;
        }
        let result = import_midi_bytes(bytes, name);
        self.finish_import(result)
    }

    /// Reads and loads a MIDI file.
    pub fn load_midi_path<P: AsRef<Path>>(&mut self, path: P) -> bool {
        if !self.import_allowed() {
            return false;
        }
        let result = import_midi_file(path.as_ref());
        self.finish_import(result)
    }

    /// Loads the MIDI file named in the settings, if any.
    pub fn load_configured_midi(&mut self) -> bool {
        if !self.import_allowed() {
            return false;
        }
        match self.settings.midi_file.clone() {
            Some(path) => self.load_midi_path(path),
            None => {
                self.set_status("No MIDI file configured (use --midi PATH)");
                false
            }
        }
    }

    fn import_allowed(&mut self) -> bool {
        if !self.controls.load_midi {
            tracing::warn!("Ignoring MIDI import while capturing");
            self.set_status("Stop listening before loading a MIDI file");
        }
        self.controls.load_midi
    }

    fn finish_import(&mut self, result: Result<MidiFile, MidiImportError>) -> bool {
        match result {
            Ok(file) => {
                self.playback.stop();
                self.notes.replace_all(file.notation_events());
                let message = format!(
                    "Loaded {} ({} notes, {} tracks)",
                    file.name,
                    file.event_count(),
                    file.tracks.len()
                );
                self.current_midi = Some(file);
                self.redraw();

                self.controls.play = true;
                self.controls.pause = false;
                self.controls.export_pdf = true;
                self.controls.export_midi = true;
                self.set_status(message);
                true
            }
            Err(e) => {
                tracing::error!("MIDI import failed: {}", e);
                self.set_status(format!("Could not load MIDI file: {}", e));
                self.controls.play = false;
                self.controls.pause = false;
                self.controls.export_pdf = false;
                self.controls.export_midi = false;
                false
            }
        }
    }

    // ==================== Playback ====================

    /// Plays the loaded MIDI file from the beginning.
    pub fn play(&mut self) {
        if !self.controls.play {
            return;
        }
        let Some(midi) = self.current_midi.as_ref() else {
            tracing::warn!("No MIDI file loaded to play");
            return;
        };

        match self.playback.play(midi) {
            Ok(()) => {
                self.controls.play = false;
                self.controls.pause = true;
                self.set_status("Playing");
            }
            Err(e) => {
                tracing::error!("Playback failed: {}", e);
                self.set_status(format!("Playback failed: {}", e));
            }
        }
    }

    /// Pauses playback.
    pub fn pause(&mut self) {
        if !self.controls.pause {
            return;
        }
        self.playback.pause();
        if self.playback.state() == PlaybackState::Paused {
            self.controls.play = true;
            self.controls.pause = false;
            self.set_status("Paused");
        }
    }

    // ==================== Export ====================

    /// Saves the staff as `pentagrama.pdf`.
    pub fn export_pdf(&mut self) -> Option<PathBuf> {
        if !self.controls.export_pdf {
            return None;
        }
        let result = self.exporter.save_pdf(&self.surface);
        self.report_export("PDF", result)
    }

    /// Saves the notes as `pentagrama.mid`.
    pub fn export_midi(&mut self) -> Option<PathBuf> {
        if !self.controls.export_midi {
            return None;
        }
        let events: Vec<NotationEvent> = self.notes.to_vec();
        let result = self.exporter.save_midi(&events);
        self.report_export("MIDI", result)
    }

    /// Saves a PNG snapshot of the staff as `pentagrama.png`.
    pub fn export_png(&mut self) -> Option<PathBuf> {
        if !self.controls.export_pdf {
            return None;
        }
        let result = self.exporter.save_png(&self.surface);
        self.report_export("image", result)
    }

    fn report_export(
        &mut self,
        kind: &str,
        result: Result<PathBuf, crate::export::ExportError>,
    ) -> Option<PathBuf> {
        match result {
            Ok(path) => {
                self.set_status(format!("Exported {} to {}", kind, path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::error!("{} export failed: {}", kind, e);
                self.set_status(format!("{} export failed: {}", kind, e));
                None
            }
        }
    }

    /// Stops capture and playback before exiting.
    pub fn shutdown(&mut self) {
        self.capture.stop();
        self.playback.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::tests::{FakeTransport, TransportLog};
    use crate::capture::{FakeSource, FakeSourceState};
    use crate::midi::{smf_bytes, RawEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        app: App,
        source: Rc<RefCell<FakeSourceState>>,
        transport: Rc<RefCell<TransportLog>>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            output_dir: dir.path().join("output"),
            ..Settings::default()
        };
        let (source, source_state) = FakeSource::new();
        let (transport, log) = FakeTransport::new();
        let app = App::with_collaborators(settings, Box::new(source), Box::new(transport)).unwrap();
        Harness {
            app,
            source: source_state,
            transport: log,
            _dir: dir,
        }
    }

    fn sing(source: &Rc<RefCell<FakeSourceState>>, pitches: &[f64]) {
        let state = source.borrow();
        let sink = state.sink.as_ref().unwrap();
        for &hz in pitches {
            sink.send(hz);
        }
    }

    fn keys(app: &App) -> Vec<String> {
        app.notes().iter().map(|e| e.key()).collect()
    }

    fn two_track_file() -> Vec<u8> {
        smf_bytes(
            480,
            &[
                vec![
                    RawEvent::note(0, 60, 480, 90),
                    RawEvent::note(480, 62, 480, 90),
                    RawEvent::note(960, 64, 480, 90),
                ],
                vec![RawEvent::note(0, 48, 960, 70), RawEvent::note(960, 43, 960, 70)],
            ],
        )
    }

    #[test]
    fn test_starts_with_empty_staff() {
        let h = harness();
        assert!(h.app.notes().is_empty());
        assert!(h.app.layout().is_empty());
        assert_eq!(h.app.controls, Controls::default());
    }

    #[test]
    fn test_two_track_import_fills_staff() {
        let mut h = harness();
        assert!(h.app.load_midi_bytes(&two_track_file(), "duet"));

        assert_eq!(h.app.notes().len(), 5);
        assert_eq!(keys(&h.app), vec!["C/4", "D/4", "E/4", "C/3", "G/2"]);
        assert_eq!(h.app.layout().notes.len(), 5);
        assert!(h.app.controls.play);
        assert!(h.app.controls.export_midi);
        assert_eq!(h.app.current_midi().unwrap().name, "duet");
    }

    #[test]
    fn test_malformed_import_keeps_notes_and_disables_controls() {
        let mut h = harness();
        h.app.load_midi_bytes(&two_track_file(), "duet");

        assert!(!h.app.load_midi_bytes(b"not a midi file", "junk"));

        assert_eq!(h.app.notes().len(), 5);
        assert_eq!(h.app.current_midi().unwrap().name, "duet");
        assert!(!h.app.controls.play);
        assert!(!h.app.controls.pause);
        assert!(!h.app.controls.export_pdf);
        assert!(!h.app.controls.export_midi);
        assert!(h.app.status_message.is_some());
    }

    #[test]
    fn test_capture_appends_and_redraws() {
        let mut h = harness();
        h.app.start_capture();
        assert_eq!(h.app.capture_state(), CaptureState::Capturing);
        assert!(!h.app.controls.start_capture);
        assert!(h.app.controls.stop_capture);

        sing(&h.source, &[440.0, 0.0, 261.63]);
        assert!(h.app.tick());

        assert_eq!(keys(&h.app), vec!["A/4", "C/4"]);
        assert_eq!(h.app.layout().notes.len(), 2);
        assert!(h.app.controls.export_midi);

        h.app.stop_capture();
        assert_eq!(h.app.capture_state(), CaptureState::Idle);
        assert!(h.app.controls.start_capture);
        assert!(!h.app.tick());
    }

    #[test]
    fn test_import_refused_while_capturing() {
        let mut h = harness();
        h.app.start_capture();
        assert!(!h.app.controls.load_midi);
        sing(&h.source, &[440.0]);
        h.app.tick();

        assert!(!h.app.load_midi_bytes(&two_track_file(), "duet"));

        assert_eq!(keys(&h.app), vec!["A/4"]);
        assert!(h.app.current_midi().is_none());
        assert!(!h.app.controls.play);

        h.app.stop_capture();
        assert!(h.app.controls.load_midi);
        assert!(h.app.load_midi_bytes(&two_track_file(), "duet"));
        assert_eq!(h.app.notes().len(), 5);
    }

    #[test]
    fn test_capture_keeps_last_sixteen() {
        let mut h = harness();
        h.app.start_capture();
        let pitches: Vec<f64> = (0..20)
            .map(|i| 261.63 * 2f64.powf(i as f64 / 12.0))
            .collect();
        sing(&h.source, &pitches);
        h.app.tick();

        assert_eq!(h.app.notes().len(), 16);
        assert_eq!(keys(&h.app)[0], "E/4");
        assert_eq!(keys(&h.app)[15], "G/5");
    }

    #[test]
    fn test_capture_failure_restores_controls() {
        let mut h = harness();
        h.source.borrow_mut().fail_with_permission = true;

        h.app.start_capture();

        assert_eq!(h.app.capture_state(), CaptureState::Idle);
        assert!(h.app.controls.start_capture);
        assert!(!h.app.controls.stop_capture);
        assert!(h.app.controls.load_midi);
        let (message, _) = h.app.status_message.as_ref().unwrap();
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_stop_capture_when_idle_is_noop() {
        let mut h = harness();
        h.app.stop_capture();
        assert_eq!(h.app.capture_state(), CaptureState::Idle);
        assert_eq!(h.source.borrow().closed, 0);
    }

    #[test]
    fn test_play_requires_loaded_file() {
        let mut h = harness();
        h.app.play();
        assert_eq!(h.app.playback_state(), PlaybackState::Stopped);
        assert_eq!(h.transport.borrow().engine_starts, 0);
    }

    #[test]
    fn test_play_pause_play() {
        let mut h = harness();
        h.app.load_midi_bytes(&two_track_file(), "duet");

        h.app.play();
        assert_eq!(h.app.playback_state(), PlaybackState::Playing);
        assert!(!h.app.controls.play);
        assert!(h.app.controls.pause);
        assert_eq!(h.transport.borrow().triggers.len(), 5);

        h.app.pause();
        assert_eq!(h.app.playback_state(), PlaybackState::Paused);
        assert!(h.app.controls.play);

        h.app.play();
        assert_eq!(h.transport.borrow().triggers.len(), 5);
        assert_eq!(h.app.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_new_import_stops_playback() {
        let mut h = harness();
        h.app.load_midi_bytes(&two_track_file(), "duet");
        h.app.play();

        h.app.load_midi_bytes(&two_track_file(), "again");

        assert_eq!(h.app.playback_state(), PlaybackState::Stopped);
        assert!(h.transport.borrow().triggers.is_empty());
        assert!(h.app.controls.play);
    }

    #[test]
    fn test_exports_write_files() {
        let mut h = harness();
        assert!(h.app.export_midi().is_none());

        h.app.load_midi_bytes(&two_track_file(), "duet");
        let pdf = h.app.export_pdf().unwrap();
        let midi = h.app.export_midi().unwrap();

        assert!(std::fs::read(pdf).unwrap().starts_with(b"%PDF"));
        let exported = import_midi_file(&midi).unwrap();
        assert_eq!(exported.notation_events(), h.app.notes().to_vec());
    }
}
