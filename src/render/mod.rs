//! Staff rendering.
//!
//! The [`ScoreRenderer`] lays notation events out on a fixed treble staff
//! and draws them through a [`NotationSurface`]. Layout is pure
//! ([`layout_events`]); surfaces only know how to paint a staff, a barline
//! and a placed note.

mod layout;
mod raster;
mod score;

pub use layout::{layout_events, Layout, PlacedNote};
pub use raster::RasterSurface;
pub use score::ScoreRenderer;

use thiserror::Error;

/// Default drawing surface size in pixels.
pub const SURFACE_WIDTH: u32 = 800;
pub const SURFACE_HEIGHT: u32 = 300;

/// Errors raised while preparing a drawing surface.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
}

/// Position and proportions of the single treble staff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaffGeometry {
    /// Left edge of the staff.
    pub x: f32,
    /// Top of the staff's bounding box; the top line sits four spaces below.
    pub y: f32,
    /// Total staff width including clef and time signature.
    pub width: f32,
    /// Distance between two staff lines.
    pub line_spacing: f32,
    /// Width available to the formatter for notes.
    pub format_width: f32,
    /// Beats per measure (time signature numerator).
    pub beats_per_measure: u8,
    /// Beat unit (time signature denominator).
    pub beat_value: u8,
}

impl Default for StaffGeometry {
    fn default() -> Self {
        Self {
            x: 10.0,
            y: 40.0,
            width: 780.0,
            line_spacing: 10.0,
            format_width: 700.0,
            beats_per_measure: 4,
            beat_value: 4,
        }
    }
}

impl StaffGeometry {
    /// Diatonic step of the bottom line (E4) counted from C0.
    pub const BOTTOM_LINE_STEP: i32 = 2 + 7 * 4;

    /// Staff step of the middle line (B4), relative to the bottom line.
    pub const MIDDLE_LINE: i32 = 4;

    /// Staff step of the top line (F5), relative to the bottom line.
    pub const TOP_LINE: i32 = 8;

    /// Fits the default staff proportions to a surface of the given size.
    pub fn for_surface(width: u32, _height: u32) -> Self {
        let default = Self::default();
        let width = (width as f32 - 2.0 * default.x).max(100.0);
        Self {
            width,
            format_width: (width - 80.0).max(20.0),
            ..default
        }
    }

    pub fn top_line_y(&self) -> f32 {
        self.y + 4.0 * self.line_spacing
    }

    pub fn bottom_line_y(&self) -> f32 {
        self.top_line_y() + 4.0 * self.line_spacing
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// X where the formatter starts placing notes, after clef and time signature.
    pub fn notes_start_x(&self) -> f32 {
        self.right() - self.format_width
    }

    /// Vertical position of a staff step (0 = bottom line, 1 = first space...).
    pub fn y_for_step(&self, step: i32) -> f32 {
        self.bottom_line_y() - step as f32 * self.line_spacing / 2.0
    }
}

/// A 2-D target the score can be drawn on.
pub trait NotationSurface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Erases everything.
    fn clear(&mut self);

    /// Draws the five lines, the clef and the time signature.
    fn draw_staff(&mut self, staff: &StaffGeometry);

    /// Draws a measure separator at `x`.
    fn draw_barline(&mut self, staff: &StaffGeometry, x: f32);

    /// Draws one laid-out note.
    fn draw_note(&mut self, staff: &StaffGeometry, note: &PlacedNote);
}
