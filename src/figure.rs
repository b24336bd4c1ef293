//! Drawing surface shared by the chart renderers.
//!
//! A [`Figure`] records shapes in data coordinates together with their
//! z-order and serializes them into a standalone SVG document. Styling is
//! expressed in typographic points and converted to data units when the
//! document is written, so line widths and font sizes stay independent of the
//! view window.
//!
//! Every figure is owned by exactly one chart generation call and released when
//! it goes out of scope; [`live_figures`] reports how many are currently alive.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

const POINTS_PER_INCH: f64 = 72.0;
const DASH_ON: f64 = 3.7;
const DASH_OFF: f64 = 1.6;
const ASCENT: f64 = 0.8;
const CHAR_WIDTH: f64 = 0.55;

static LIVE_FIGURES: AtomicUsize = AtomicUsize::new(0);

/// Number of figures that have been created and not yet dropped.
pub fn live_figures() -> usize {
    LIVE_FIGURES.load(Ordering::SeqCst)
}

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(0x80, 0x80, 0x80);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` notation.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A position in data coordinates (y grows upwards).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at distance `radius` from the origin along `theta` (radians).
    pub fn polar(radius: f64, theta: f64) -> Self {
        Self::new(radius * theta.cos(), radius * theta.sin())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Outline styling; the width is given in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width_pt: f64,
    pub opacity: f64,
    pub style: LineStyle,
}

impl Stroke {
    pub fn solid(color: Color, width_pt: f64) -> Self {
        Self {
            color,
            width_pt,
            opacity: 1.0,
            style: LineStyle::Solid,
        }
    }

    pub fn dashed(color: Color, width_pt: f64) -> Self {
        Self {
            style: LineStyle::Dashed,
            ..Self::solid(color, width_pt)
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    #[default]
    Baseline,
    Bottom,
}

/// Filled box drawn behind a text label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBackground {
    pub fill: Color,
    pub opacity: f64,
    pub pad_pt: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size_pt: f64,
    pub family: String,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub background: Option<TextBackground>,
}

impl TextStyle {
    pub fn new(color: Color, size_pt: f64) -> Self {
        Self {
            color,
            size_pt,
            family: "sans-serif".to_string(),
            horizontal: HorizontalAlign::default(),
            vertical: VerticalAlign::default(),
            background: None,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn with_align(mut self, horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        self.horizontal = horizontal;
        self.vertical = vertical;
        self
    }

    pub fn with_background(mut self, background: TextBackground) -> Self {
        self.background = Some(background);
        self
    }
}

/// A single recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Line {
        points: Vec<Point>,
        stroke: Stroke,
    },
    Fill {
        points: Vec<Point>,
        color: Color,
        opacity: f64,
    },
    Marker {
        center: Point,
        diameter_pt: f64,
        color: Color,
    },
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

/// Visible data range of a figure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewWindow {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewWindow {
    /// Window spanning `-half..half` on both axes.
    pub fn symmetric(half: f64) -> Self {
        Self {
            x_min: -half,
            x_max: half,
            y_min: -half,
            y_max: half,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

#[derive(Debug)]
struct Layer {
    z: u32,
    shape: Shape,
}

/// A square drawing surface measured in inches.
#[derive(Debug)]
pub struct Figure {
    size_inches: f64,
    window: ViewWindow,
    equal_aspect: bool,
    axes_visible: bool,
    background: Option<Color>,
    layers: Vec<Layer>,
}

impl Figure {
    /// Creates an empty figure with visible axes and a unit window.
    pub fn new(size_inches: f64) -> Self {
        let live = LIVE_FIGURES.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("acquired figure ({size_inches}in, {live} live)");
        Self {
            size_inches,
            window: ViewWindow::symmetric(1.0),
            equal_aspect: false,
            axes_visible: true,
            background: Some(Color::WHITE),
            layers: Vec::new(),
        }
    }

    pub fn size_inches(&self) -> f64 {
        self.size_inches
    }

    /// Document edge length in points.
    pub fn size_points(&self) -> f64 {
        self.size_inches * POINTS_PER_INCH
    }

    pub fn window(&self) -> ViewWindow {
        self.window
    }

    pub fn set_window(&mut self, window: ViewWindow) {
        self.window = window;
    }

    pub fn set_equal_aspect(&mut self, equal: bool) {
        self.equal_aspect = equal;
    }

    pub fn set_axes_visible(&mut self, visible: bool) {
        self.axes_visible = visible;
    }

    pub fn axes_visible(&self) -> bool {
        self.axes_visible
    }

    /// `None` leaves the document background transparent.
    pub fn set_background(&mut self, background: Option<Color>) {
        self.background = background;
    }

    /// Strokes the polyline through `points`.
    pub fn plot(&mut self, points: Vec<Point>, stroke: Stroke, z: u32) {
        self.push(z, Shape::Line { points, stroke });
    }

    /// Fills the polygon described by `points`.
    pub fn fill(&mut self, points: Vec<Point>, color: Color, opacity: f64, z: u32) {
        self.push(
            z,
            Shape::Fill {
                points,
                color,
                opacity,
            },
        );
    }

    /// Draws a filled circular marker whose diameter is given in points.
    pub fn marker(&mut self, center: Point, diameter_pt: f64, color: Color, z: u32) {
        self.push(
            z,
            Shape::Marker {
                center,
                diameter_pt,
                color,
            },
        );
    }

    pub fn text(&mut self, at: Point, text: impl Into<String>, style: TextStyle, z: u32) {
        self.push(
            z,
            Shape::Text {
                at,
                text: text.into(),
                style,
            },
        );
    }

    fn push(&mut self, z: u32, shape: Shape) {
        self.layers.push(Layer { z, shape });
    }

    /// Shapes in paint order: ascending z, insertion order within a z level.
    pub fn shapes(&self) -> Vec<&Shape> {
        let mut ordered: Vec<&Layer> = self.layers.iter().collect();
        ordered.sort_by_key(|layer| layer.z);
        ordered.into_iter().map(|layer| &layer.shape).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn units_per_point(&self) -> f64 {
        self.window.width() / self.size_points()
    }

    /// Declared `viewBox` of the SVG document.
    pub fn view_box(&self) -> [f64; 4] {
        let w = self.window;
        [w.x_min, -w.y_max, w.width(), w.height()]
    }

    /// Writes the figure as a standalone SVG document.
    pub fn write_svg(&self, out: &mut impl Write) -> fmt::Result {
        let size = fmt_num(self.size_points());
        let [vx, vy, vw, vh] = self.view_box();
        let aspect = if self.equal_aspect {
            "xMidYMid meet"
        } else {
            "none"
        };

        writeln!(out, r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#)?;
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{size}pt" height="{size}pt" viewBox="{} {} {} {}" preserveAspectRatio="{aspect}">"#,
            fmt_num(vx),
            fmt_num(vy),
            fmt_num(vw),
            fmt_num(vh),
        )?;

        if let Some(background) = self.background {
            writeln!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                fmt_num(vx),
                fmt_num(vy),
                fmt_num(vw),
                fmt_num(vh),
                background.to_hex()
            )?;
        }

        if self.axes_visible {
            self.write_axes(out)?;
        }

        for shape in self.shapes() {
            self.write_shape(out, shape)?;
        }

        writeln!(out, "</svg>")
    }

    /// Convenience wrapper around [`Figure::write_svg`].
    pub fn to_svg(&self) -> Result<String, fmt::Error> {
        let mut svg = String::new();
        self.write_svg(&mut svg)?;
        Ok(svg)
    }

    fn write_axes(&self, out: &mut impl Write) -> fmt::Result {
        let [vx, vy, vw, vh] = self.view_box();
        writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            fmt_num(vx),
            fmt_num(vy),
            fmt_num(vw),
            fmt_num(vh),
            Color::BLACK.to_hex(),
            fmt_num(0.8 * self.units_per_point())
        )
    }

    fn write_shape(&self, out: &mut impl Write, shape: &Shape) -> fmt::Result {
        let upp = self.units_per_point();
        match shape {
            Shape::Line { points, stroke } => {
                write!(
                    out,
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round" stroke-linecap="butt""#,
                    svg_points(points),
                    stroke.color.to_hex(),
                    fmt_num(stroke.width_pt * upp)
                )?;
                if stroke.opacity < 1.0 {
                    write!(out, r#" stroke-opacity="{}""#, fmt_num(stroke.opacity))?;
                }
                if stroke.style == LineStyle::Dashed {
                    let scale = stroke.width_pt * upp;
                    write!(
                        out,
                        r#" stroke-dasharray="{} {}""#,
                        fmt_num(DASH_ON * scale),
                        fmt_num(DASH_OFF * scale)
                    )?;
                }
                writeln!(out, "/>")
            }
            Shape::Fill {
                points,
                color,
                opacity,
            } => writeln!(
                out,
                r#"<polygon points="{}" fill="{}" fill-opacity="{}" stroke="none"/>"#,
                svg_points(points),
                color.to_hex(),
                fmt_num(*opacity)
            ),
            Shape::Marker {
                center,
                diameter_pt,
                color,
            } => writeln!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                fmt_num(center.x),
                fmt_num(-center.y),
                fmt_num(diameter_pt * upp / 2.0),
                color.to_hex()
            ),
            Shape::Text { at, text, style } => self.write_text(out, *at, text, style),
        }
    }

    fn write_text(
        &self,
        out: &mut impl Write,
        at: Point,
        text: &str,
        style: &TextStyle,
    ) -> fmt::Result {
        let upp = self.units_per_point();
        let size = style.size_pt * upp;
        let width = text.chars().count() as f64 * CHAR_WIDTH * size;
        let x = at.x;
        let y = -at.y;

        let left = match style.horizontal {
            HorizontalAlign::Left => x,
            HorizontalAlign::Center => x - width / 2.0,
            HorizontalAlign::Right => x - width,
        };
        let top = match style.vertical {
            VerticalAlign::Top => y,
            VerticalAlign::Center => y - size / 2.0,
            VerticalAlign::Baseline => y - ASCENT * size,
            VerticalAlign::Bottom => y - size,
        };
        let baseline = top + ASCENT * size;

        if let Some(background) = style.background {
            let pad = background.pad_pt * upp;
            writeln!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" fill-opacity="{}" stroke="none"/>"#,
                fmt_num(left - pad),
                fmt_num(top - pad),
                fmt_num(width + 2.0 * pad),
                fmt_num(size + 2.0 * pad),
                background.fill.to_hex(),
                fmt_num(background.opacity)
            )?;
        }

        let anchor = match style.horizontal {
            HorizontalAlign::Left => "start",
            HorizontalAlign::Center => "middle",
            HorizontalAlign::Right => "end",
        };
        writeln!(
            out,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="{}" text-anchor="{anchor}">{}</text>"#,
            fmt_num(x),
            fmt_num(baseline),
            xml_escape(&style.family),
            fmt_num(size),
            style.color.to_hex(),
            xml_escape(text)
        )
    }
}

impl Drop for Figure {
    fn drop(&mut self) {
        let live = LIVE_FIGURES.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(
            "released figure with {} shapes ({live} live)",
            self.layers.len()
        );
    }
}

fn svg_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(-p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats a coordinate with at most three decimals and no negative zero.
pub fn fmt_num(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_trimmed_and_never_negative_zero() {
        assert_eq!(fmt_num(120.0), "120");
        assert_eq!(fmt_num(-0.0000001), "0");
        assert_eq!(fmt_num(1.5), "1.5");
        assert_eq!(fmt_num(0.41666), "0.417");
        assert_eq!(fmt_num(-120.0), "-120");
    }

    #[test]
    fn shapes_are_ordered_by_z_then_insertion() {
        let mut figure = Figure::new(1.0);
        figure.marker(Point::ORIGIN, 8.0, Color::BLACK, 4);
        figure.plot(vec![Point::ORIGIN], Stroke::solid(Color::GRAY, 1.0), 2);
        figure.fill(vec![Point::ORIGIN], Color::GRAY, 0.5, 2);

        let shapes = figure.shapes();
        assert!(matches!(shapes[0], Shape::Line { .. }));
        assert!(matches!(shapes[1], Shape::Fill { .. }));
        assert!(matches!(shapes[2], Shape::Marker { .. }));
    }

    #[test]
    fn svg_flips_y_and_declares_the_window() {
        let mut figure = Figure::new(8.0);
        figure.set_window(ViewWindow::symmetric(120.0));
        figure.set_axes_visible(false);
        figure.set_background(None);
        figure.plot(
            vec![Point::new(0.0, 100.0), Point::new(50.0, -25.0)],
            Stroke::solid(Color::BLACK, 1.0),
            2,
        );

        let svg = figure.to_svg().unwrap();
        assert!(svg.contains(r#"viewBox="-120 -120 240 240""#));
        assert!(svg.contains(r#"width="576pt""#));
        assert!(svg.contains(r#"points="0,-100 50,25""#));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn text_is_escaped() {
        let mut figure = Figure::new(1.0);
        figure.text(
            Point::ORIGIN,
            "<a & b>",
            TextStyle::new(Color::BLACK, 9.0),
            3,
        );
        let svg = figure.to_svg().unwrap();
        assert!(svg.contains("&lt;a &amp; b&gt;"));
    }
}
