//! Serialization of finished charts into embeddable payloads.
//!
//! The vector document is produced straight from the [`Figure`]; raster
//! formats rasterize that document with `resvg` and encode the pixels with the
//! [`image`] crate. Every payload is returned base64 encoded. The persisted
//! raster format is additionally written to the images directory.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use log::{debug, info};
use resvg::tiny_skia::{self, Pixmap, Transform};
use resvg::usvg::{self, TreeParsing, TreeTextToPath};
use serde::Deserialize;

use crate::error::{ReportError, Result};
use crate::figure::{Color, Figure, ViewWindow};
use crate::fonts;

/// Half extent of the exported view window on both axes.
pub const VIEW_LIMIT: f64 = 120.0;

const CSS_PIXELS_PER_POINT: f64 = 96.0 / 72.0;

/// Output encodings supported by the exporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Svg,
    Png,
    /// Persisted raster: a WebP file on disk, PNG bytes in the payload.
    Webp,
}

impl ChartFormat {
    pub const ALL: [ChartFormat; 3] = [ChartFormat::Svg, ChartFormat::Png, ChartFormat::Webp];

    pub fn name(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Media type of the returned payload bytes.
    pub fn payload_media_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png | Self::Webp => "image/png",
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartFormat {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(ReportError::invalid(format!(
                "unsupported chart format '{other}' (use svg|png|webp)"
            ))),
        }
    }
}

/// Resolution and framing of exported charts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub dpi: f64,
    /// Transparent border added around raster output.
    pub pad_inches: f64,
    pub transparent: bool,
    /// File name of the persisted raster inside the images directory.
    pub raster_file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            pad_inches: 0.1,
            transparent: true,
            raster_file_name: "radar_chart.webp".to_string(),
        }
    }
}

/// One exported encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPayload {
    pub format: ChartFormat,
    pub media_type: &'static str,
    pub base64: String,
    /// Path of the file written alongside the payload, if any.
    pub file: Option<PathBuf>,
}

impl ChartPayload {
    fn new(format: ChartFormat, bytes: &[u8], file: Option<PathBuf>) -> Self {
        Self {
            format,
            media_type: format.payload_media_type(),
            base64: STANDARD.encode(bytes),
            file,
        }
    }

    /// Decodes the base64 payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.base64)
            .map_err(|err| ReportError::Encoding(format!("invalid base64 payload: {err}")))
    }
}

/// Payloads of one chart generation call, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartResult {
    payloads: Vec<ChartPayload>,
}

impl ChartResult {
    pub fn get(&self, format: ChartFormat) -> Option<&ChartPayload> {
        self.payloads.iter().find(|payload| payload.format == format)
    }

    /// Removes and returns the payload for `format`.
    pub fn take(&mut self, format: ChartFormat) -> Option<ChartPayload> {
        let index = self
            .payloads
            .iter()
            .position(|payload| payload.format == format)?;
        Some(self.payloads.remove(index))
    }

    pub fn payloads(&self) -> &[ChartPayload] {
        &self.payloads
    }

    pub fn formats(&self) -> Vec<ChartFormat> {
        self.payloads.iter().map(|payload| payload.format).collect()
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Finalizes figures and serializes them into the requested formats.
#[derive(Clone, Debug)]
pub struct ChartExporter {
    settings: ExportSettings,
    images_dir: PathBuf,
}

impl ChartExporter {
    pub fn new(settings: ExportSettings, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            images_dir: images_dir.into(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Path of the persisted raster file.
    pub fn raster_path(&self) -> PathBuf {
        self.images_dir.join(&self.settings.raster_file_name)
    }

    /// Square aspect, hidden axes and the fixed `-120..120` window.
    pub fn finalize(&self, figure: &mut Figure) {
        figure.set_equal_aspect(true);
        figure.set_axes_visible(false);
        figure.set_window(ViewWindow::symmetric(VIEW_LIMIT));
        figure.set_background(if self.settings.transparent {
            None
        } else {
            Some(Color::WHITE)
        });
    }

    /// Exports `figure` once per distinct format in `formats`.
    pub fn export(&self, figure: &mut Figure, formats: &[ChartFormat]) -> Result<ChartResult> {
        self.finalize(figure);
        let svg = figure
            .to_svg()
            .map_err(|err| ReportError::Encoding(format!("failed to write SVG document: {err}")))?;

        let mut raster: Option<RgbaImage> = None;
        let mut result = ChartResult::default();

        for &format in formats {
            if result.get(format).is_some() {
                continue;
            }

            let payload = match format {
                ChartFormat::Svg => ChartPayload::new(format, svg.as_bytes(), None),
                ChartFormat::Png => {
                    let image = self.raster(&mut raster, &svg, figure)?;
                    ChartPayload::new(format, &encode_raster(image, ImageFormat::Png)?, None)
                }
                ChartFormat::Webp => {
                    let image = self.raster(&mut raster, &svg, figure)?;
                    let path = self.persist_raster(image)?;
                    let png = encode_raster(image, ImageFormat::Png)?;
                    ChartPayload::new(format, &png, Some(path))
                }
            };
            debug!(
                "exported {} chart ({} base64 chars)",
                format,
                payload.base64.len()
            );
            result.payloads.push(payload);
        }

        Ok(result)
    }

    fn raster<'a>(
        &self,
        cache: &'a mut Option<RgbaImage>,
        svg: &str,
        figure: &Figure,
    ) -> Result<&'a RgbaImage> {
        if cache.is_none() {
            *cache = Some(rasterize(svg, figure.size_points(), &self.settings)?);
        }
        cache
            .as_ref()
            .ok_or_else(|| ReportError::Encoding("raster cache is empty".to_string()))
    }

    fn persist_raster(&self, image: &RgbaImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.images_dir)
            .map_err(|source| ReportError::resource(&self.images_dir, source))?;
        let path = self.raster_path();
        let bytes = encode_raster(image, ImageFormat::WebP)?;
        fs::write(&path, &bytes).map_err(|source| ReportError::resource(&path, source))?;
        info!("Radar chart image written to {}", path.display());
        Ok(path)
    }
}

/// Rasterizes an SVG document of `size_points` edge length at the configured DPI.
pub fn rasterize(svg: &str, size_points: f64, settings: &ExportSettings) -> Result<RgbaImage> {
    let options = usvg::Options::default();
    let mut tree = usvg::Tree::from_str(svg, &options)
        .map_err(|err| ReportError::Encoding(format!("failed to parse SVG document: {err}")))?;
    tree.convert_text(fonts::font_database());
    let render_tree = resvg::Tree::from_usvg(&tree);

    let side = (size_points / 72.0 * settings.dpi).round().max(1.0);
    let pad = (settings.pad_inches * settings.dpi).round().max(0.0);
    let total = (side + 2.0 * pad) as u32;

    let mut pixmap = Pixmap::new(total, total).ok_or_else(|| {
        ReportError::Encoding(format!("failed to allocate a {total}x{total} pixmap"))
    })?;
    if !settings.transparent {
        pixmap.fill(tiny_skia::Color::WHITE);
    }

    let scale = (side / (size_points * CSS_PIXELS_PER_POINT)) as f32;
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, pad as f32, pad as f32);
    render_tree.render(transform, &mut pixmap.as_mut());

    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(total, total, data)
        .ok_or_else(|| ReportError::Encoding("pixel buffer size mismatch".to_string()))
}

/// Encodes an RGBA image with the given container format.
pub fn encode_raster(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ReportError::Encoding(format!("failed to encode {format:?}: {err}")))?;
    Ok(cursor.into_inner())
}
