//! Scheduling transport.
//!
//! [`TransportClock`] holds the schedule and advances in samples; it knows
//! nothing about audio output, so it is driven directly by tests and by the
//! synthesizer source alike.

use super::AudioError;

/// A monophonic instrument created on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub(crate) usize);

impl VoiceHandle {
    /// MIDI channel the voice plays on. Channel 10 (percussion) is skipped.
    pub fn channel(&self) -> u8 {
        let channel = (self.0 % 15) as u8;
        if channel >= 9 {
            channel + 1
        } else {
            channel
        }
    }
}

/// One note to sound at a transport time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTrigger {
    /// Onset in seconds from transport start.
    pub at: f64,
    /// Length in seconds.
    pub duration: f64,
    /// MIDI note number.
    pub key: u8,
    /// Velocity (0-127).
    pub velocity: u8,
}

/// State of the transport clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Started,
    Paused,
}

/// Synthesizer commands produced while the clock runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
}

/// A scheduling transport: timed triggers on voices plus a start/pause/stop
/// clock.
pub trait Transport {
    /// Starts the audio engine. Must be called before playback; repeated
    /// calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError`] if no output is available or the synthesizer
    /// cannot be loaded.
    fn start_engine(&mut self) -> Result<(), AudioError>;

    /// Creates a new monophonic voice.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Synthesizer`] when no more voices are available.
    fn create_voice(&mut self) -> Result<VoiceHandle, AudioError>;

    /// Removes every scheduled trigger.
    fn clear(&mut self);

    /// Schedules `trigger` on `voice`.
    fn schedule(&mut self, voice: VoiceHandle, trigger: NoteTrigger);

    /// Starts the clock, or resumes it after a pause.
    fn start_clock(&mut self);

    /// Pauses the clock, keeping its position.
    fn pause_clock(&mut self);

    /// Stops the clock and rewinds to the start.
    fn stop_clock(&mut self);

    fn clock_state(&self) -> ClockState;

    /// Whether every scheduled note has been played and released.
    fn finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    voice: VoiceHandle,
    start: u64,
    end: u64,
    key: u8,
    velocity: u8,
}

#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    key: u8,
    release: u64,
}

/// Sample-accurate schedule of triggers.
///
/// Each voice sounds one note at a time: a trigger that starts while the
/// voice still holds a note releases that note first.
#[derive(Debug)]
pub struct TransportClock {
    sample_rate: u32,
    state: ClockState,
    position: u64,
    schedule: Vec<Scheduled>,
    /// Set when triggers were appended since the last sort.
    unsorted: bool,
    next: usize,
    active: Vec<Option<ActiveNote>>,
}

/// Maximum voices a transport hands out (the melodic MIDI channels).
pub const MAX_VOICES: usize = 15;

impl TransportClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            state: ClockState::Stopped,
            position: 0,
            schedule: Vec::new(),
            unsorted: false,
            next: 0,
            active: Vec::new(),
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Current position in samples.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn scheduled(&self) -> usize {
        self.schedule.len()
    }

    /// Registers a new voice.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Synthesizer`] past [`MAX_VOICES`].
    pub fn create_voice(&mut self) -> Result<VoiceHandle, AudioError> {
        if self.active.len() >= MAX_VOICES {
            return Err(AudioError::Synthesizer(format!(
                "at most {MAX_VOICES} voices are available"
            )));
        }
        self.active.push(None);
        Ok(VoiceHandle(self.active.len() - 1))
    }

    fn to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Appends a trigger. The pending part of the schedule is sorted by
    /// onset once, on the next [`start`](Self::start) or
    /// [`advance`](Self::advance). Triggers for unknown voices are ignored.
    pub fn schedule(&mut self, voice: VoiceHandle, trigger: NoteTrigger) {
        if voice.0 >= self.active.len() {
            tracing::warn!(voice = voice.0, "Ignoring trigger for unknown voice");
            return;
        }
        let start = self.to_samples(trigger.at);
        let end = start.max(self.to_samples(trigger.at + trigger.duration));
        let entry = Scheduled {
            voice,
            start,
            end,
            key: trigger.key.min(127),
            velocity: trigger.velocity.min(127),
        };
        self.schedule.push(entry);
        self.unsorted = true;
    }

    /// Orders the not yet fired triggers by onset. The sort is stable, so
    /// triggers with equal onsets keep their scheduling order.
    fn settle(&mut self) {
        if self.unsorted {
            self.schedule[self.next..].sort_by_key(|s| s.start);
            self.unsorted = false;
        }
    }

    /// Drops the schedule and releases sounding notes.
    pub fn clear(&mut self) -> Vec<ClockEvent> {
        self.schedule.clear();
        self.unsorted = false;
        self.next = 0;
        self.release_all()
    }

    pub fn start(&mut self) {
        self.settle();
        self.state = ClockState::Started;
    }

    /// Pauses only a started clock and releases sounding notes.
    pub fn pause(&mut self) -> Vec<ClockEvent> {
        if self.state != ClockState::Started {
            return Vec::new();
        }
        self.state = ClockState::Paused;
        self.release_all()
    }

    /// Stops, rewinds and releases sounding notes.
    pub fn stop(&mut self) -> Vec<ClockEvent> {
        self.state = ClockState::Stopped;
        self.position = 0;
        self.next = 0;
        self.release_all()
    }

    /// True once all triggers have fired and every note was released.
    pub fn finished(&self) -> bool {
        self.next >= self.schedule.len() && self.active.iter().all(Option::is_none)
    }

    fn release_all(&mut self) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        for (index, slot) in self.active.iter_mut().enumerate() {
            if let Some(note) = slot.take() {
                events.push(ClockEvent::NoteOff {
                    channel: VoiceHandle(index).channel(),
                    key: note.key,
                });
            }
        }
        events
    }

    /// Earliest pending release strictly before `end`, as (voice index, sample).
    fn next_release(&self, end: u64) -> Option<(usize, u64)> {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|n| (i, n.release)))
            .filter(|&(_, release)| release < end)
            .min_by_key(|&(_, release)| release)
    }

    /// Advances a started clock by `frames` samples.
    ///
    /// # Returns
    ///
    /// The note events falling inside the advanced span, in time order.
    /// Releases sort before onsets at the same sample.
    pub fn advance(&mut self, frames: u64) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if self.state != ClockState::Started {
            return events;
        }
        self.settle();
        let end = self.position + frames;

        loop {
            let onset = self
                .schedule
                .get(self.next)
                .filter(|s| s.start < end)
                .map(|s| s.start);
            let release = self.next_release(end);

            match (release, onset) {
                (Some((voice, at)), Some(start)) if at <= start => self.release(voice, &mut events),
                (Some((voice, _)), None) => self.release(voice, &mut events),
                (_, Some(_)) => self.fire_next(&mut events),
                (None, None) => break,
            }
        }

        self.position = end;
        events
    }

    fn release(&mut self, voice: usize, events: &mut Vec<ClockEvent>) {
        if let Some(note) = self.active[voice].take() {
            events.push(ClockEvent::NoteOff {
                channel: VoiceHandle(voice).channel(),
                key: note.key,
            });
        }
    }

    fn fire_next(&mut self, events: &mut Vec<ClockEvent>) {
        let entry = self.schedule[self.next];
        self.next += 1;

        // Skip triggers that were already passed (scheduled behind the clock)
        if entry.end < self.position {
            return;
        }

        let voice = entry.voice.0;
        self.release(voice, events);
        events.push(ClockEvent::NoteOn {
            channel: entry.voice.channel(),
            key: entry.key,
            velocity: entry.velocity,
        });
        self.active[voice] = Some(ActiveNote {
            key: entry.key,
            release: entry.end,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(at: f64, duration: f64, key: u8) -> NoteTrigger {
        NoteTrigger {
            at,
            duration,
            key,
            velocity: 100,
        }
    }

    fn on(key: u8) -> ClockEvent {
        ClockEvent::NoteOn {
            channel: 0,
            key,
            velocity: 100,
        }
    }

    fn off(key: u8) -> ClockEvent {
        ClockEvent::NoteOff { channel: 0, key }
    }

    #[test]
    fn test_voice_channels_skip_percussion() {
        let channels: Vec<u8> = (0..MAX_VOICES).map(|i| VoiceHandle(i).channel()).collect();
        assert_eq!(channels[8], 8);
        assert_eq!(channels[9], 10);
        assert!(!channels.contains(&9));
        assert_eq!(channels[14], 15);
    }

    #[test]
    fn test_stopped_clock_emits_nothing() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.0, 0.5, 60));
        assert!(clock.advance(100).is_empty());
        assert_eq!(clock.position(), 0);
    }

    #[test]
    fn test_notes_fire_and_release_in_order() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.5, 0.25, 64));
        clock.schedule(voice, trigger(0.0, 0.25, 60));
        clock.start();

        assert_eq!(clock.advance(10), vec![on(60)]);
        assert_eq!(clock.advance(40), vec![off(60)]);
        assert_eq!(clock.advance(50), vec![on(64), off(64)]);
        assert!(clock.finished());
    }

    #[test]
    fn test_interleaved_voices_fire_in_onset_order() {
        let mut clock = TransportClock::new(100);
        let lead = clock.create_voice().unwrap();
        let bass = clock.create_voice().unwrap();
        // Whole first part, then the second, as a flattened file arrives
        clock.schedule(lead, trigger(0.0, 0.25, 60));
        clock.schedule(lead, trigger(1.0, 0.25, 62));
        clock.schedule(bass, trigger(0.5, 0.25, 48));
        clock.schedule(bass, trigger(1.5, 0.25, 50));
        clock.start();

        let bass_on = |key| ClockEvent::NoteOn {
            channel: 1,
            key,
            velocity: 100,
        };
        let bass_off = |key| ClockEvent::NoteOff { channel: 1, key };
        assert_eq!(
            clock.advance(200),
            vec![
                on(60),
                off(60),
                bass_on(48),
                bass_off(48),
                on(62),
                off(62),
                bass_on(50),
                bass_off(50),
            ]
        );
        assert!(clock.finished());
    }

    #[test]
    fn test_trigger_added_while_running_still_fires() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(1.0, 0.25, 64));
        clock.start();
        assert!(clock.advance(10).is_empty());

        clock.schedule(voice, trigger(0.5, 0.25, 60));

        assert_eq!(clock.advance(90), vec![on(60), off(60)]);
        assert_eq!(clock.advance(50), vec![on(64), off(64)]);
    }

    #[test]
    fn test_voice_is_monophonic() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.0, 2.0, 60));
        clock.schedule(voice, trigger(0.5, 0.5, 67));
        clock.start();

        let events = clock.advance(100);
        assert_eq!(events, vec![on(60), off(60), on(67)]);
        assert_eq!(clock.advance(100), vec![off(67)]);
    }

    #[test]
    fn test_release_before_onset_at_same_sample() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.0, 0.5, 60));
        clock.schedule(voice, trigger(0.5, 0.5, 62));
        clock.start();

        assert_eq!(clock.advance(100), vec![on(60), off(60), on(62)]);
        assert_eq!(clock.advance(1), vec![off(62)]);
    }

    #[test]
    fn test_pause_and_stop_release_notes() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.0, 5.0, 60));

        // Pausing a clock that never started is a no-op
        assert!(clock.pause().is_empty());
        assert_eq!(clock.state(), ClockState::Stopped);

        clock.start();
        clock.advance(10);
        assert_eq!(clock.pause(), vec![off(60)]);
        assert_eq!(clock.state(), ClockState::Paused);
        assert!(clock.advance(10).is_empty());
        assert_eq!(clock.position(), 10);

        clock.start();
        assert_eq!(clock.position(), 10);
        assert!(clock.stop().is_empty());
        assert_eq!(clock.position(), 0);
    }

    #[test]
    fn test_clear_drops_schedule() {
        let mut clock = TransportClock::new(100);
        let voice = clock.create_voice().unwrap();
        clock.schedule(voice, trigger(0.0, 1.0, 60));
        clock.schedule(voice, trigger(1.0, 1.0, 62));
        clock.start();
        clock.advance(10);

        assert_eq!(clock.clear(), vec![off(60)]);
        assert_eq!(clock.scheduled(), 0);
        assert!(clock.advance(1000).is_empty());
    }

    #[test]
    fn test_voice_limit() {
        let mut clock = TransportClock::new(100);
        for _ in 0..MAX_VOICES {
            clock.create_voice().unwrap();
        }
        assert!(matches!(
            clock.create_voice(),
            Err(AudioError::Synthesizer(_))
        ));
    }
}
