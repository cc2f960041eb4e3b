//! Tick to wall-clock conversion across tempo changes.

use super::DEFAULT_USEC_PER_BEAT;

/// One tempo segment: from `tick` onwards a beat lasts `usec_per_beat`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    tick: u32,
    usec_per_beat: u32,
    /// Seconds elapsed at the start of the segment.
    start_seconds: f64,
}

/// Piecewise-constant tempo map built from Set Tempo meta events.
///
/// Without any tempo event the map runs at 120 BPM.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    ticks_per_beat: u32,
    segments: Vec<Segment>,
}

impl TempoMap {
    /// Builds a map from `(tick, microseconds per beat)` changes in any order.
    /// Later changes at the same tick win.
    pub fn new(ticks_per_beat: u32, mut changes: Vec<(u32, u32)>) -> Self {
        let ticks_per_beat = ticks_per_beat.max(1);
        changes.retain(|&(_, usec)| usec > 0);
        changes.sort_by_key(|&(tick, _)| tick);

        let mut segments = vec![Segment {
            tick: 0,
            usec_per_beat: DEFAULT_USEC_PER_BEAT,
            start_seconds: 0.0,
        }];

        for (tick, usec_per_beat) in changes {
            let last = segments[segments.len() - 1];
            if tick == last.tick {
                let index = segments.len() - 1;
                segments[index].usec_per_beat = usec_per_beat;
                continue;
            }
            let start_seconds = last.start_seconds
                + Self::span_seconds(tick - last.tick, last.usec_per_beat, ticks_per_beat);
            segments.push(Segment {
                tick,
                usec_per_beat,
                start_seconds,
            });
        }

        Self {
            ticks_per_beat,
            segments,
        }
    }

    fn span_seconds(ticks: u32, usec_per_beat: u32, ticks_per_beat: u32) -> f64 {
        ticks as f64 / ticks_per_beat as f64 * usec_per_beat as f64 / 1_000_000.0
    }

    /// Converts an absolute tick to seconds.
    pub fn seconds_at(&self, tick: u32) -> f64 {
        let segment = self
            .segments
            .iter()
            .rev()
            .find(|s| s.tick <= tick)
            .unwrap_or(&self.segments[0]);
        segment.start_seconds
            + Self::span_seconds(tick - segment.tick, segment.usec_per_beat, self.ticks_per_beat)
    }

    /// Tempo at the start of the file in beats per minute.
    pub fn initial_bpm(&self) -> u32 {
        60_000_000 / self.segments[0].usec_per_beat
    }
}
