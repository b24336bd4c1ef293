//! Pipeline configuration loaded from TOML.
//!
//! Every key is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! output_dir = "output"
//! images_dir = "public/images"
//! product_key = "EDAPPGS006"
//! chart_field = "RadarGraphBase64"
//! formats = ["svg"]
//! score_policy = "pass-through"
//!
//! [export]
//! dpi = 150
//! pad_inches = 0.1
//!
//! [renderer]
//! program = "node"
//! args = ["cli.js"]
//! timeout_secs = 120
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::assemble::{DEFAULT_CHART_FIELD, DEFAULT_PRODUCT_KEY};
use crate::error::{ReportError, Result};
use crate::export::{ChartFormat, ExportSettings};
use crate::render::RendererConfig;
use crate::series::ScorePolicy;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    pub product_key: String,
    pub chart_field: String,
    pub formats: Vec<ChartFormat>,
    pub score_policy: ScorePolicy,
    /// Explicit spoke order by category code or name; document order when unset.
    pub category_order: Option<Vec<String>>,
    pub export: ExportSettings,
    pub renderer: RendererConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            images_dir: PathBuf::from("public/images"),
            product_key: DEFAULT_PRODUCT_KEY.to_string(),
            chart_field: DEFAULT_CHART_FIELD.to_string(),
            formats: vec![ChartFormat::Svg],
            score_policy: ScorePolicy::default(),
            category_order: None,
            export: ExportSettings::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| ReportError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ReportError::resource(path, source))?;
        Self::from_toml_str(&text).map_err(|err| match err {
            ReportError::Config(message) => {
                ReportError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.export.dpi.is_finite() && self.export.dpi > 0.0) {
            return Err(ReportError::Config(format!(
                "export.dpi must be positive, got {}",
                self.export.dpi
            )));
        }
        if !(self.export.pad_inches.is_finite() && self.export.pad_inches >= 0.0) {
            return Err(ReportError::Config(format!(
                "export.pad_inches must not be negative, got {}",
                self.export.pad_inches
            )));
        }
        if self.export.raster_file_name.trim().is_empty() {
            return Err(ReportError::Config(
                "export.raster_file_name must not be empty".to_string(),
            ));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(ReportError::Config(
                "renderer.program must not be empty".to_string(),
            ));
        }
        if self.chart_field.is_empty() {
            return Err(ReportError::Config("chart_field must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn overrides_nested_sections() {
        let config = Config::from_toml_str(
            r#"
            images_dir = "img"
            formats = ["svg", "webp"]
            score_policy = "clamp"
            category_order = ["R", "I", "A", "S", "E", "C"]

            [export]
            dpi = 300

            [renderer]
            program = "renderer"
            args = []
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.images_dir, PathBuf::from("img"));
        assert_eq!(config.formats, vec![ChartFormat::Svg, ChartFormat::Webp]);
        assert_eq!(config.score_policy, ScorePolicy::Clamp);
        assert_eq!(config.category_order.as_ref().map(Vec::len), Some(6));
        assert_eq!(config.export.dpi, 300.0);
        assert_eq!(config.export.pad_inches, 0.1);
        assert!(config.renderer.args.is_empty());
        assert_eq!(config.renderer.timeout_secs, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("colour = \"red\""),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn non_positive_dpi_is_rejected() {
        assert!(Config::from_toml_str("[export]\ndpi = 0").is_err());
    }

    #[test]
    fn load_reports_the_missing_file() {
        let err = Config::load(Path::new("/nonexistent/radar.toml")).unwrap_err();
        assert!(matches!(err, ReportError::Resource { .. }));
    }
}
