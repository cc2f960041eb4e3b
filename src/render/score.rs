//! Redraws the staff with the current notes.

use super::{layout_events, Layout, NotationSurface, StaffGeometry};
use crate::notation::NotationEvent;

/// Draws a fixed single-staff score.
#[derive(Debug, Clone, Default)]
pub struct ScoreRenderer {
    staff: StaffGeometry,
}

impl ScoreRenderer {
    pub fn new(staff: StaffGeometry) -> Self {
        Self { staff }
    }

    pub fn staff(&self) -> &StaffGeometry {
        &self.staff
    }

    /// Clears `surface`, draws the empty staff and then the laid-out events.
    ///
    /// Returns the layout that was drawn so callers can mirror it elsewhere.
    pub fn redraw(&self, surface: &mut dyn NotationSurface, events: &[NotationEvent]) -> Layout {
        surface.clear();
        surface.draw_staff(&self.staff);

        let layout = layout_events(events, &self.staff);
        for &x in &layout.barlines {
            surface.draw_barline(&self.staff, x);
        }
        for note in &layout.notes {
            surface.draw_note(&self.staff, note);
        }

        tracing::debug!(
            notes = layout.notes.len(),
            measures = layout.measures,
            "staff redrawn"
        );
        layout
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notation::Pitch;
    use crate::render::PlacedNote;

    /// Surface that records the calls it receives.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub calls: Vec<String>,
    }

    impl NotationSurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (800, 300)
        }

        fn clear(&mut self) {
            self.calls.clear();
            self.calls.push("clear".to_string());
        }

        fn draw_staff(&mut self, staff: &StaffGeometry) {
            self.calls.push(format!(
                "staff {}/{}",
                staff.beats_per_measure, staff.beat_value
            ));
        }

        fn draw_barline(&mut self, _staff: &StaffGeometry, _x: f32) {
            self.calls.push("barline".to_string());
        }

        fn draw_note(&mut self, _staff: &StaffGeometry, note: &PlacedNote) {
            self.calls.push(format!("note {}", note.event.key()));
        }
    }

    #[test]
    fn test_empty_input_draws_empty_staff() {
        let mut surface = RecordingSurface::default();
        let layout = ScoreRenderer::default().redraw(&mut surface, &[]);
        assert!(layout.is_empty());
        assert_eq!(surface.calls, vec!["clear", "staff 4/4"]);
    }

    #[test]
    fn test_redraw_replaces_previous_drawing() {
        let mut surface = RecordingSurface::default();
        let renderer = ScoreRenderer::default();
        let events: Vec<NotationEvent> = (60..66)
            .map(|m| NotationEvent::quarter(Pitch::from_midi(m)))
            .collect();

        renderer.redraw(&mut surface, &events);
        renderer.redraw(&mut surface, &events[..2]);

        assert_eq!(surface.calls, vec!["clear", "staff 4/4", "note C/4", "note C#/4"]);
    }

    #[test]
    fn test_barlines_drawn_between_measures() {
        let mut surface = RecordingSurface::default();
        let events: Vec<NotationEvent> = (0..9)
            .map(|_| NotationEvent::quarter(Pitch::from_midi(67)))
            .collect();
        let layout = ScoreRenderer::default().redraw(&mut surface, &events);

        assert_eq!(layout.measures, 3);
        let barlines = surface.calls.iter().filter(|c| *c == "barline").count();
        assert_eq!(barlines, 2);
        let notes = surface.calls.iter().filter(|c| c.starts_with("note")).count();
        assert_eq!(notes, 9);
    }
}
