//! Staff view.
//!
//! Mirrors the laid-out score on a braille canvas. Coordinates are the
//! surface's pixel coordinates, cropped vertically around the staff and
//! flipped because the canvas y axis points up.

use crate::render::{Layout, PlacedNote, StaffGeometry};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

/// Space kept above and below the five lines.
const VERTICAL_MARGIN: f64 = 60.0;

const INK: Color = Color::White;
const NOTE: Color = Color::Cyan;

/// Renders the staff and the notes of `layout`.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `staff` - Geometry the layout was computed for
/// * `layout` - Notes and barlines to show
/// * `title` - Block title
pub fn render_staff(frame: &mut Frame, area: Rect, staff: &StaffGeometry, layout: &Layout, title: &str) {
    let top = staff.top_line_y() as f64 - VERTICAL_MARGIN;
    let bottom = staff.bottom_line_y() as f64 + VERTICAL_MARGIN;
    let flip = move |y: f32| bottom - y as f64 + top;

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(" {} ", title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, (staff.right() + staff.x) as f64])
        .y_bounds([top, bottom])
        .paint(move |ctx| {
            draw_staff_lines(ctx, staff, &flip);
            for &x in &layout.barlines {
                line(ctx, x as f64, flip(staff.top_line_y()), x as f64, flip(staff.bottom_line_y()), INK);
            }
            for note in &layout.notes {
                draw_note(ctx, staff, note, &flip);
            }
        });

    frame.render_widget(canvas, area);
}

fn line(ctx: &mut Context, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) {
    ctx.draw(&CanvasLine {
        x1,
        y1,
        x2,
        y2,
        color,
    });
}

fn draw_staff_lines(ctx: &mut Context, staff: &StaffGeometry, flip: &impl Fn(f32) -> f64) {
    let (left, right) = (staff.x as f64, staff.right() as f64);
    for i in 0..5 {
        let y = flip(staff.top_line_y() + i as f32 * staff.line_spacing);
        line(ctx, left, y, right, y, INK);
    }
    let (top, bottom) = (flip(staff.top_line_y()), flip(staff.bottom_line_y()));
    line(ctx, left, top, left, bottom, INK);
    line(ctx, right, top, right, bottom, INK);

    ctx.print(left + 8.0, flip(staff.y_for_step(2)), "𝄞");
    ctx.print(
        left + 45.0,
        flip(staff.y_for_step(6)),
        staff.beats_per_measure.to_string(),
    );
    ctx.print(
        left + 45.0,
        flip(staff.y_for_step(2)),
        staff.beat_value.to_string(),
    );
}

fn draw_note(ctx: &mut Context, staff: &StaffGeometry, note: &PlacedNote, flip: &impl Fn(f32) -> f64) {
    let x = note.x as f64;
    let y = flip(staff.y_for_step(note.step));

    for &step in &note.ledger_steps {
        let ly = flip(staff.y_for_step(step));
        line(ctx, x - 9.0, ly, x + 9.0, ly, INK);
    }

    ctx.draw(&Circle {
        x,
        y,
        radius: 4.0,
        color: NOTE,
    });

    if note.event.duration.has_stem() {
        let (stem_x, tip) = if note.stem_up {
            (x + 4.0, y + 35.0)
        } else {
            (x - 4.0, y - 35.0)
        };
        line(ctx, stem_x, y, stem_x, tip, NOTE);
    }

    if note.event.pitch.class.is_sharp() {
        ctx.print(x - 16.0, y, "#");
    }
}
