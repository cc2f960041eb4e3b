//! Raster drawing surface backed by a tiny-skia pixmap.

use super::{NotationSurface, PlacedNote, RenderError, StaffGeometry};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tiny_skia::{
    Color, FillRule, LineCap, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

const HEAD_WIDTH: f32 = 11.0;
const HEAD_HEIGHT: f32 = 8.0;
const STEM_LENGTH: f32 = 35.0;
const LEDGER_HALF_WIDTH: f32 = 9.0;

/// Segments of a seven-segment digit: top, upper right, lower right, bottom,
/// lower left, upper left, middle.
const DIGIT_SEGMENTS: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],
    [false, true, true, false, false, false, false],
    [true, true, false, true, true, false, true],
    [true, true, true, true, false, false, true],
    [false, true, true, false, false, true, true],
    [true, false, true, true, false, true, true],
    [true, false, true, true, true, true, true],
    [true, true, true, false, false, false, false],
    [true, true, true, true, true, true, true],
    [true, true, true, true, false, true, true],
];

/// An RGBA pixmap the score is painted on, white background, black ink.
pub struct RasterSurface {
    pixmap: Pixmap,
    ink: Paint<'static>,
}

impl RasterSurface {
    /// Creates a white surface of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSurface`] for a zero or oversized dimension.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidSurface { width, height })?;
        pixmap.fill(Color::WHITE);

        let mut ink = Paint::default();
        ink.set_color_rgba8(0, 0, 0, 255);
        ink.anti_alias = true;

        Ok(Self { pixmap, ink })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Captures the surface as an opaque RGB image, flattening any
    /// transparency onto white.
    pub fn capture(&self) -> RgbImage {
        let width = self.pixmap.width();
        RgbImage::from_fn(width, self.pixmap.height(), |x, y| {
            let pixel = self.pixmap.pixels()[(y * width + x) as usize].demultiply();
            let alpha = pixel.alpha() as u32;
            let over_white = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
            Rgb([
                over_white(pixel.red()),
                over_white(pixel.green()),
                over_white(pixel.blue()),
            ])
        })
    }

    /// Encodes the captured surface as a PNG file.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if the image cannot be written.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        self.capture()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn stroke(&mut self, path: Option<Path>, width: f32) {
        if let Some(path) = path {
            let stroke = Stroke {
                width,
                line_cap: LineCap::Round,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &self.ink, &stroke, Transform::identity(), None);
        }
    }

    fn fill(&mut self, path: Option<Path>) {
        if let Some(path) = path {
            self.pixmap.fill_path(
                &path,
                &self.ink,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        self.stroke(pb.finish(), width);
    }

    /// Draws a digit in a box `width` wide and `height` tall at (x, y).
    fn digit(&mut self, value: u8, x: f32, y: f32, width: f32, height: f32) {
        let Some(segments) = DIGIT_SEGMENTS.get(value as usize) else {
            return;
        };
        let (left, right) = (x, x + width);
        let (top, middle, bottom) = (y, y + height / 2.0, y + height);
        let lines = [
            (left, top, right, top),
            (right, top, right, middle),
            (right, middle, right, bottom),
            (left, bottom, right, bottom),
            (left, middle, left, bottom),
            (left, top, left, middle),
            (left, middle, right, middle),
        ];
        for (on, (x0, y0, x1, y1)) in segments.iter().zip(lines) {
            if *on {
                self.line(x0, y0, x1, y1, 2.5);
            }
        }
    }

    /// Draws a number centered on `center_x` between `top` and `top + height`.
    fn number(&mut self, value: u8, center_x: f32, top: f32, height: f32) {
        let text = value.to_string();
        let digit_width = height * 0.5;
        let spacing = digit_width * 0.5;
        let total = text.len() as f32 * digit_width + (text.len() as f32 - 1.0) * spacing;
        let mut x = center_x - total / 2.0;
        for ch in text.bytes() {
            self.digit(ch - b'0', x, top + 2.0, digit_width, height - 4.0);
            x += digit_width + spacing;
        }
    }

    /// Stylized G clef curling around the second line.
    fn treble_clef(&mut self, staff: &StaffGeometry) {
        let s = staff.line_spacing;
        let cx = staff.x + 18.0;
        let g = staff.y_for_step(2);
        let top = staff.top_line_y();
        let bottom = staff.bottom_line_y();

        let mut pb = PathBuilder::new();
        // Tail hook below the staff
        pb.move_to(cx - 5.0, bottom + 1.5 * s);
        pb.quad_to(cx - 1.0, bottom + 2.2 * s, cx + 1.0, bottom + 1.2 * s);
        // Spine up to the top loop
        pb.line_to(cx + 1.0, top - 1.5 * s);
        pb.cubic_to(cx + 8.0, top - 0.5 * s, cx + 6.0, top + 1.2 * s, cx - 4.0, top + 2.2 * s);
        // Body sweeping down and around the G line
        pb.cubic_to(cx - 11.0, top + 3.0 * s, cx - 9.0, bottom + 0.4 * s, cx, bottom + 0.3 * s);
        pb.cubic_to(cx + 9.0, bottom + 0.2 * s, cx + 8.0, g - 1.2 * s, cx + 1.0, g - 1.0 * s);
        pb.cubic_to(cx - 4.0, g - 0.9 * s, cx - 5.0, g, cx - 1.0, g + 0.4 * s);
        self.stroke(pb.finish(), 2.0);
    }
}

impl NotationSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::WHITE);
    }

    fn draw_staff(&mut self, staff: &StaffGeometry) {
        for line in 0..5 {
            let y = staff.top_line_y() + line as f32 * staff.line_spacing;
            self.line(staff.x, y, staff.right(), y, 1.0);
        }
        self.line(staff.x, staff.top_line_y(), staff.x, staff.bottom_line_y(), 1.0);
        self.line(
            staff.right(),
            staff.top_line_y(),
            staff.right(),
            staff.bottom_line_y(),
            1.0,
        );

        self.treble_clef(staff);

        let half = 2.0 * staff.line_spacing;
        let center_x = staff.x + 50.0;
        self.number(staff.beats_per_measure, center_x, staff.top_line_y(), half);
        self.number(staff.beat_value, center_x, staff.top_line_y() + half, half);
    }

    fn draw_barline(&mut self, staff: &StaffGeometry, x: f32) {
        self.line(x, staff.top_line_y(), x, staff.bottom_line_y(), 1.0);
    }

    fn draw_note(&mut self, staff: &StaffGeometry, note: &PlacedNote) {
        let x = note.x;
        let y = staff.y_for_step(note.step);
        let duration = note.event.duration;

        for &step in &note.ledger_steps {
            let ly = staff.y_for_step(step);
            self.line(x - LEDGER_HALF_WIDTH, ly, x + LEDGER_HALF_WIDTH, ly, 1.0);
        }

        let head = Rect::from_xywh(
            x - HEAD_WIDTH / 2.0,
            y - HEAD_HEIGHT / 2.0,
            HEAD_WIDTH,
            HEAD_HEIGHT,
        )
        .and_then(PathBuilder::from_oval);
        if duration.is_open() {
            self.stroke(head, 1.5);
        } else {
            self.fill(head);
        }

        if duration.has_stem() {
            let (stem_x, tip_y, direction) = if note.stem_up {
                (x + HEAD_WIDTH / 2.0 - 0.5, y - STEM_LENGTH, 1.0)
            } else {
                (x - HEAD_WIDTH / 2.0 + 0.5, y + STEM_LENGTH, -1.0)
            };
            self.line(stem_x, y, stem_x, tip_y, 1.2);

            for flag in 0..duration.flags() {
                let fy = tip_y + direction * flag as f32 * 7.0;
                self.line(stem_x, fy, stem_x + 8.0, fy + direction * 12.0, 1.5);
            }
        }

        if note.event.pitch.class.is_sharp() {
            let sx = x - HEAD_WIDTH / 2.0 - 9.0;
            self.line(sx - 2.0, y - 8.0, sx - 2.0, y + 8.0, 1.0);
            self.line(sx + 2.0, y - 9.0, sx + 2.0, y + 7.0, 1.0);
            self.line(sx - 5.0, y - 2.0, sx + 5.0, y - 4.0, 2.0);
            self.line(sx - 5.0, y + 4.0, sx + 5.0, y + 2.0, 2.0);
        }
    }
}
