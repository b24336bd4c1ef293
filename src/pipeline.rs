//! End-to-end report generation: directories, chart enrichment and the
//! external render call.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info};
use serde_json::Value;

use crate::assemble::ReportAssembler;
use crate::chart::RadarChart;
use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::export::ChartExporter;
use crate::render::{CancelToken, ExternalRenderInvoker, RenderedDocument};

/// Output path used when the caller does not name one.
pub const DEFAULT_DOCUMENT_NAME: &str = "optimized_final.pdf";

/// Creates `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| ReportError::resource(dir, source))
}

/// Prepares report records and hands them to the external renderer.
pub struct ReportPipeline {
    output_dir: PathBuf,
    assembler: ReportAssembler,
    invoker: ExternalRenderInvoker,
}

impl ReportPipeline {
    /// Builds the pipeline described by `config` and creates its directories.
    pub fn new(config: &Config) -> Result<Self> {
        let exporter = ChartExporter::new(config.export.clone(), config.images_dir.clone());
        let assembler = ReportAssembler::new(RadarChart::new(exporter))
            .with_product_key(config.product_key.clone())
            .with_chart_field(config.chart_field.clone())
            .with_formats(config.formats.iter().copied())
            .with_score_policy(config.score_policy)
            .with_category_order(config.category_order.clone());
        let invoker = ExternalRenderInvoker::from_config(&config.renderer);
        Self::from_parts(config.output_dir.clone(), assembler, invoker)
    }

    /// Assembles a pipeline from already configured components.
    pub fn from_parts(
        output_dir: PathBuf,
        assembler: ReportAssembler,
        invoker: ExternalRenderInvoker,
    ) -> Result<Self> {
        ensure_dir(&output_dir)?;
        ensure_dir(assembler.images_dir())?;
        Ok(Self {
            output_dir,
            assembler,
            invoker,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn default_output_path(&self) -> PathBuf {
        self.output_dir.join(DEFAULT_DOCUMENT_NAME)
    }

    pub fn assembler(&self) -> &ReportAssembler {
        &self.assembler
    }

    pub fn invoker(&self) -> &ExternalRenderInvoker {
        &self.invoker
    }

    /// Returns `record` with the chart field added.
    pub fn prepare(&self, record: Value) -> Result<Value> {
        self.assembler.assemble(record)
    }

    /// Prepares `record` and renders it to `output_path`.
    ///
    /// Returns `output_path` unchanged on success.
    pub fn generate(&self, record: Value, output_path: &Path) -> Result<PathBuf> {
        self.generate_with_cancel(record, output_path, &CancelToken::new())
    }

    pub fn generate_with_cancel(
        &self,
        record: Value,
        output_path: &Path,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let prepared = self.prepare(record)?;
        if let Some(parent) = output_path.parent() {
            ensure_dir(parent)?;
        }
        self.invoker.invoke_with_cancel(&prepared, output_path, cancel)
    }

    /// Like [`generate`](Self::generate), then reports size and elapsed time.
    pub fn generate_document(&self, record: Value, output_path: &Path) -> Result<RenderedDocument> {
        let started = Instant::now();
        let path = self.generate(record, output_path).inspect_err(|err| {
            error!("Generation failed: {err}");
        })?;
        let document = RenderedDocument::inspect(path);

        info!("Generation complete");
        info!("File: {}", document.path.display());
        if let Some(kib) = document.size_kib() {
            info!("Size: {kib:.1} KB");
        }
        info!("Time: {:.2} seconds", started.elapsed().as_secs_f64());
        Ok(document)
    }
}
