//! Radar chart generation and report assembly for the aptitude report pipeline.
//!
//! A record's per-category scores are drawn as a radar chart, exported as a
//! base64 payload, stored back into the record and handed to an external
//! document renderer.

pub mod angles;
pub mod assemble;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod figure;
pub mod fonts;
pub mod grid;
pub mod labels;
pub mod pipeline;
pub mod plot;
pub mod render;
pub mod sample;
pub mod series;

pub use angles::{compute_angles, AngleSet, AngleTable};
pub use assemble::ReportAssembler;
pub use chart::RadarChart;
pub use config::Config;
pub use error::{ReportError, Result};
pub use export::{ChartExporter, ChartFormat, ChartPayload, ChartResult, ExportSettings};
pub use figure::{live_figures, Figure, Point};
pub use pipeline::ReportPipeline;
pub use render::{CancelToken, ExternalRenderInvoker, RenderedDocument, RendererConfig};
pub use series::{CategoryScore, ScorePolicy, Series};
