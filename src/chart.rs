//! Radar chart generation pipeline.

use std::sync::Arc;

use log::{error, info};

use crate::angles::AngleTable;
use crate::error::Result;
use crate::export::{ChartExporter, ChartFormat, ChartResult};
use crate::figure::{Figure, Point};
use crate::grid::GridRenderer;
use crate::labels::LabelRenderer;
use crate::plot::SeriesPlotter;
use crate::series::Series;

/// Edge length of the square chart figure.
pub const FIGURE_SIZE_INCHES: f64 = 8.0;

/// Draws a series onto a fresh figure and exports it.
///
/// Each call owns its figure; the figure is released before the call returns,
/// whether exporting succeeded or not. The angle table is shared.
#[derive(Clone)]
pub struct RadarChart {
    angles: Arc<AngleTable>,
    grid: GridRenderer,
    labels: LabelRenderer,
    plotter: SeriesPlotter,
    exporter: ChartExporter,
}

impl RadarChart {
    /// Creates a chart generator backed by the process-wide angle table.
    pub fn new(exporter: ChartExporter) -> Self {
        Self::with_angle_table(exporter, AngleTable::global())
    }

    pub fn with_angle_table(exporter: ChartExporter, angles: Arc<AngleTable>) -> Self {
        Self {
            angles,
            grid: GridRenderer::default(),
            labels: LabelRenderer::default(),
            plotter: SeriesPlotter,
            exporter,
        }
    }

    pub fn exporter(&self) -> &ChartExporter {
        &self.exporter
    }

    pub fn angle_table(&self) -> &Arc<AngleTable> {
        &self.angles
    }

    /// Draws grid, labels, spokes and the series polygon onto `figure`.
    pub fn draw(&self, figure: &mut Figure, series: &Series) -> Result<Vec<Point>> {
        let angles = self.angles.angles(series.len())?;
        self.grid.draw_rings(figure, &angles);
        self.labels.draw(figure);
        self.grid.draw_spokes(figure, &angles);
        self.plotter.draw(figure, &series.scores(), &angles)
    }

    /// Renders `series` into every requested format.
    pub fn generate(&self, series: &Series, formats: &[ChartFormat]) -> Result<ChartResult> {
        let result = self.render(series, formats);
        match &result {
            Ok(_) => info!("Radar chart generated successfully"),
            Err(err) => error!("Error generating radar chart: {err}"),
        }
        result
    }

    fn render(&self, series: &Series, formats: &[ChartFormat]) -> Result<ChartResult> {
        let mut figure = Figure::new(FIGURE_SIZE_INCHES);
        self.draw(&mut figure, series)?;
        let result = self.exporter.export(&mut figure, formats)?;
        drop(figure);
        Ok(result)
    }
}
