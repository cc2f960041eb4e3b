//! Playback of an imported MIDI file on a transport.

use super::transport::{NoteTrigger, Transport, VoiceHandle};
use super::{AudioError, PlaybackState};
use crate::midi::MidiFile;

/// Plays every note of a [`MidiFile`] on a single voice.
pub struct MidiPlaybackSession {
    transport: Box<dyn Transport>,
    voice: Option<VoiceHandle>,
    state: PlaybackState,
}

impl MidiPlaybackSession {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            voice: None,
            state: PlaybackState::Stopped,
        }
    }

    /// Current playback state, updated for a transport that ran out of notes.
    pub fn state(&mut self) -> PlaybackState {
        if self.state == PlaybackState::Playing && self.transport.finished() {
            tracing::info!("Playback finished");
            self.transport.stop_clock();
            self.state = PlaybackState::Stopped;
        }
        self.state
    }

    /// Plays `midi` from the beginning.
    ///
    /// Any previous schedule is cleared first, so calling this repeatedly
    /// never stacks notes. Playback always restarts from the top.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError`] if the engine cannot start or no voice can be
    /// created; the state is left unchanged.
    pub fn play(&mut self, midi: &MidiFile) -> Result<(), AudioError> {
        self.transport.start_engine()?;
        let voice = match self.voice {
            Some(voice) => voice,
            None => {
                let voice = self.transport.create_voice()?;
                self.voice = Some(voice);
                voice
            }
        };

        self.transport.stop_clock();
        self.transport.clear();

        let mut scheduled = 0;
        for event in midi.events() {
            let Some(key) = event.key() else {
                continue;
            };
            self.transport.schedule(
                voice,
                NoteTrigger {
                    at: event.time,
                    duration: event.duration,
                    key,
                    velocity: event.velocity,
                },
            );
            scheduled += 1;
        }

        self.transport.start_clock();
        self.state = PlaybackState::Playing;
        tracing::info!(name = %midi.name, notes = scheduled, "Playback started");
        Ok(())
    }

    /// Pauses a playing file. Does nothing in any other state.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.transport.pause_clock();
        self.state = PlaybackState::Paused;
        tracing::info!("Playback paused");
    }

    /// Stops playback and forgets the schedule.
    pub fn stop(&mut self) {
        self.transport.stop_clock();
        self.transport.clear();
        if self.state != PlaybackState::Stopped {
            tracing::info!("Playback stopped");
        }
        self.state = PlaybackState::Stopped;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::transport::{ClockState, TransportClock};
    use crate::midi::{MidiEvent, MidiTrack};
    use crate::notation::Pitch;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// What a [`FakeTransport`] was asked to do.
    #[derive(Debug, Default)]
    pub(crate) struct TransportLog {
        pub engine_starts: usize,
        pub voices: usize,
        pub triggers: Vec<NoteTrigger>,
        pub fail_engine: bool,
    }

    /// Transport that records calls and keeps a real clock for state.
    pub(crate) struct FakeTransport {
        log: Rc<RefCell<TransportLog>>,
        clock: TransportClock,
    }

    impl FakeTransport {
        pub(crate) fn new() -> (Self, Rc<RefCell<TransportLog>>) {
            let log = Rc::new(RefCell::new(TransportLog::default()));
            (
                Self {
                    log: Rc::clone(&log),
                    clock: TransportClock::new(100),
                },
                log,
            )
        }
    }

    impl Transport for FakeTransport {
        fn start_engine(&mut self) -> Result<(), AudioError> {
            let mut log = self.log.borrow_mut();
            if log.fail_engine {
                return Err(AudioError::DeviceUnavailable("no output in test".into()));
            }
            log.engine_starts += 1;
            Ok(())
        }

        fn create_voice(&mut self) -> Result<VoiceHandle, AudioError> {
            self.log.borrow_mut().voices += 1;
            self.clock.create_voice()
        }

        fn clear(&mut self) {
            self.log.borrow_mut().triggers.clear();
            self.clock.clear();
        }

        fn schedule(&mut self, voice: VoiceHandle, trigger: NoteTrigger) {
            self.log.borrow_mut().triggers.push(trigger);
            self.clock.schedule(voice, trigger);
        }

        fn start_clock(&mut self) {
            self.clock.start();
        }

        fn pause_clock(&mut self) {
            self.clock.pause();
        }

        fn stop_clock(&mut self) {
            self.clock.stop();
        }

        fn clock_state(&self) -> ClockState {
            self.clock.state()
        }

        fn finished(&self) -> bool {
            self.clock.finished()
        }
    }

    fn midi(keys: &[u8]) -> MidiFile {
        MidiFile {
            name: "test".to_string(),
            tracks: vec![MidiTrack {
                name: None,
                events: keys
                    .iter()
                    .enumerate()
                    .map(|(i, &k)| MidiEvent::new(Pitch::from_midi(k), i as f64 * 0.5, 0.5, 80))
                    .collect(),
            }],
            tempo_bpm: 120,
            ticks_per_beat: 480,
        }
    }

    #[test]
    fn test_play_twice_does_not_duplicate_triggers() {
        let (transport, log) = FakeTransport::new();
        let mut session = MidiPlaybackSession::new(Box::new(transport));
        let file = midi(&[60, 62, 64]);

        session.play(&file).unwrap();
        session.play(&file).unwrap();

        let log = log.borrow();
        assert_eq!(log.triggers.len(), 3);
        assert_eq!(log.voices, 1);
        assert_eq!(log.engine_starts, 2);
        let keys: Vec<u8> = log.triggers.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![60, 62, 64]);
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_pause_only_when_playing() {
        let (transport, _log) = FakeTransport::new();
        let mut session = MidiPlaybackSession::new(Box::new(transport));

        session.pause();
        assert_eq!(session.state(), PlaybackState::Stopped);

        session.play(&midi(&[60])).unwrap();
        session.pause();
        assert_eq!(session.state(), PlaybackState::Paused);
        session.pause();
        assert_eq!(session.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_engine_failure_leaves_state() {
        let (transport, log) = FakeTransport::new();
        log.borrow_mut().fail_engine = true;
        let mut session = MidiPlaybackSession::new(Box::new(transport));

        assert!(matches!(
            session.play(&midi(&[60])),
            Err(AudioError::DeviceUnavailable(_))
        ));
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(log.borrow().triggers.is_empty());
    }

    #[test]
    fn test_stop_clears_schedule() {
        let (transport, log) = FakeTransport::new();
        let mut session = MidiPlaybackSession::new(Box::new(transport));

        session.play(&midi(&[60, 67])).unwrap();
        session.stop();

        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(log.borrow().triggers.is_empty());
    }

    #[test]
    fn test_empty_file_finishes_immediately() {
        let (transport, _log) = FakeTransport::new();
        let mut session = MidiPlaybackSession::new(Box::new(transport));

        session.play(&midi(&[])).unwrap();
        assert_eq!(session.state(), PlaybackState::Stopped);
    }
}
