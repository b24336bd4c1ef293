//! Reference rings and spokes of the radar chart.

use crate::figure::{Color, Figure, Point, Stroke};

/// Distance between two consecutive reference rings.
pub const RING_STEP: u32 = 25;

/// Default outer value of the chart scale.
pub const DEFAULT_MAX_VALUE: u32 = 100;

pub(crate) const GRID_Z: u32 = 2;

const OUTER_RING_COLOR: Color = Color::rgb(0x33, 0x33, 0x33);

/// Ring values drawn for a scale ending at `max_value`: every multiple of
/// [`RING_STEP`] up to and including the maximum.
pub fn ring_values(max_value: u32) -> Vec<u32> {
    (1..=max_value / RING_STEP).map(|k| k * RING_STEP).collect()
}

/// Closed polygon through one vertex per angle at distance `radius`.
pub fn ring_vertices(radius: f64, angles: &[f64]) -> Vec<Point> {
    let mut vertices: Vec<Point> = angles
        .iter()
        .map(|&theta| Point::polar(radius, theta))
        .collect();
    if let Some(&first) = vertices.first() {
        vertices.push(first);
    }
    vertices
}

/// Stroke used for a ring; the outermost ring is emphasized.
pub fn ring_stroke(value: u32, max_value: u32) -> Stroke {
    if value == max_value {
        Stroke::solid(OUTER_RING_COLOR, 1.5)
    } else {
        Stroke::dashed(Color::GRAY, 0.5).with_opacity(0.7)
    }
}

/// Draws the reference rings and spokes onto a figure.
#[derive(Clone, Copy, Debug)]
pub struct GridRenderer {
    max_value: u32,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VALUE)
    }
}

impl GridRenderer {
    pub fn new(max_value: u32) -> Self {
        Self { max_value }
    }

    /// Draws one closed ring per [`ring_values`] entry.
    pub fn draw_rings(&self, figure: &mut Figure, angles: &[f64]) {
        for value in ring_values(self.max_value) {
            figure.plot(
                ring_vertices(f64::from(value), angles),
                ring_stroke(value, self.max_value),
                GRID_Z,
            );
        }
    }

    /// Draws one dashed spoke from the origin to the outer ring per angle.
    pub fn draw_spokes(&self, figure: &mut Figure, angles: &[f64]) {
        let stroke = Stroke::dashed(Color::GRAY, 0.5).with_opacity(0.5);
        for &theta in angles {
            figure.plot(
                vec![Point::ORIGIN, Point::polar(f64::from(self.max_value), theta)],
                stroke,
                GRID_Z,
            );
        }
    }

    pub fn draw(&self, figure: &mut Figure, angles: &[f64]) {
        self.draw_rings(figure, angles);
        self.draw_spokes(figure, angles);
    }
}
