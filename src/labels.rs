//! Percentage tick labels along a fixed bearing.

use std::f64::consts::FRAC_PI_6;

use crate::figure::{
    Color, Figure, HorizontalAlign, Point, TextBackground, TextStyle, VerticalAlign,
};
use crate::grid::{ring_values, DEFAULT_MAX_VALUE};

/// Bearing of the tick labels: −30° from the positive x axis.
pub const LABEL_BEARING: f64 = -FRAC_PI_6;

/// Labels sit at this fraction of their ring's radius.
pub const LABEL_RADIUS_FACTOR: f64 = 0.90;

pub const LABEL_FONT_SIZE: f64 = 9.0;
pub const LABEL_FONT_FAMILY: &str = "Arial, sans-serif";

const LABEL_Z: u32 = 3;
const LABEL_BACKGROUND: Color = Color::rgb(0xF1, 0xF9, 0xFF);

/// Anchor of the label for `value`.
pub fn label_anchor(value: u32) -> Point {
    Point::polar(f64::from(value) * LABEL_RADIUS_FACTOR, LABEL_BEARING)
}

pub fn label_text(value: u32) -> String {
    format!("{value}%")
}

/// Draws `"{value}%"` for every ring of the scale.
#[derive(Clone, Copy, Debug)]
pub struct LabelRenderer {
    max_value: u32,
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VALUE)
    }
}

impl LabelRenderer {
    pub fn new(max_value: u32) -> Self {
        Self { max_value }
    }

    fn style() -> TextStyle {
        TextStyle::new(Color::GRAY, LABEL_FONT_SIZE)
            .with_family(LABEL_FONT_FAMILY)
            .with_align(HorizontalAlign::Right, VerticalAlign::Top)
            .with_background(TextBackground {
                fill: LABEL_BACKGROUND,
                opacity: 0.8,
                pad_pt: 1.0,
            })
    }

    pub fn draw(&self, figure: &mut Figure) {
        for value in ring_values(self.max_value) {
            figure.text(label_anchor(value), label_text(value), Self::style(), LABEL_Z);
        }
    }
}
