//! Plots the score polygon on top of the grid.

use crate::error::{ReportError, Result};
use crate::figure::{
    Color, Figure, HorizontalAlign, Point, Stroke, TextStyle, VerticalAlign,
};

pub const SERIES_COLOR: Color = Color::rgb(0x6A, 0x1B, 0x9A);
pub const FILL_COLOR: Color = Color::rgb(0xE6, 0xE6, 0xFA);
pub const FILL_OPACITY: f64 = 0.2;
pub const OUTLINE_WIDTH: f64 = 2.0;

const SERIES_Z: u32 = 3;
const MARKER_Z: u32 = 4;
const ORIGIN_LABEL_Z: u32 = 5;
const MARKER_DIAMETER: f64 = 8.0;

/// Cartesian points of the score polygon, closed by repeating point 0.
///
/// Scores are used as radii without clamping.
pub fn polygon_points(scores: &[f64], angles: &[f64]) -> Result<Vec<Point>> {
    if scores.len() != angles.len() {
        return Err(ReportError::ShapeMismatch {
            scores: scores.len(),
            angles: angles.len(),
        });
    }

    let mut points: Vec<Point> = scores
        .iter()
        .zip(angles)
        .map(|(&score, &theta)| Point::polar(score, theta))
        .collect();
    if let Some(&first) = points.first() {
        points.push(first);
    }
    Ok(points)
}

/// Draws the outline, translucent fill and origin marker of a series.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeriesPlotter;

impl SeriesPlotter {
    /// Plots `scores` along `angles` and returns the closed polygon.
    pub fn draw(&self, figure: &mut Figure, scores: &[f64], angles: &[f64]) -> Result<Vec<Point>> {
        let points = polygon_points(scores, angles)?;

        figure.plot(
            points.clone(),
            Stroke::solid(SERIES_COLOR, OUTLINE_WIDTH),
            SERIES_Z,
        );
        figure.fill(points.clone(), FILL_COLOR, FILL_OPACITY, SERIES_Z);
        figure.marker(Point::ORIGIN, MARKER_DIAMETER, Color::BLACK, MARKER_Z);
        figure.text(
            Point::new(0.0, -3.0),
            "0%",
            TextStyle::new(Color::BLACK, 9.0)
                .with_align(HorizontalAlign::Center, VerticalAlign::Top),
            ORIGIN_LABEL_Z,
        );

        Ok(points)
    }
}
