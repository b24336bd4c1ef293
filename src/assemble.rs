//! Attaches the rendered chart to the outgoing report record.

use std::path::Path;

use log::error;
use serde_json::{Map, Value};

use crate::chart::RadarChart;
use crate::error::{ReportError, Result};
use crate::export::{ChartFormat, ChartResult};
use crate::series::{ScorePolicy, Series};

/// Top-level key of the product section in the sample records.
pub const DEFAULT_PRODUCT_KEY: &str = "EDAPPGS006";

/// Top-level field receiving the base64 chart.
pub const DEFAULT_CHART_FIELD: &str = "RadarGraphBase64";

/// Encoding written into the record.
pub const PRIMARY_FORMAT: ChartFormat = ChartFormat::Svg;

/// Locates `<product_key>.ResultInfo.genetic_results` in `record`.
pub fn results_map<'a>(record: &'a Value, product_key: &str) -> Result<&'a Map<String, Value>> {
    let product = record
        .get(product_key)
        .ok_or_else(|| ReportError::invalid(format!("record has no '{product_key}' section")))?;
    let info = product.get("ResultInfo").ok_or_else(|| {
        ReportError::invalid(format!("'{product_key}' section has no 'ResultInfo'"))
    })?;
    info.get("genetic_results")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ReportError::invalid(format!(
                "'{product_key}.ResultInfo.genetic_results' is missing or not an object"
            ))
        })
}

/// Extracts the series from a record, renders the chart and stores it in the record.
#[derive(Clone)]
pub struct ReportAssembler {
    chart: RadarChart,
    product_key: String,
    chart_field: String,
    formats: Vec<ChartFormat>,
    score_policy: ScorePolicy,
    category_order: Option<Vec<String>>,
}

impl ReportAssembler {
    /// Creates an assembler that only requests the vector encoding.
    pub fn new(chart: RadarChart) -> Self {
        Self {
            chart,
            product_key: DEFAULT_PRODUCT_KEY.to_string(),
            chart_field: DEFAULT_CHART_FIELD.to_string(),
            formats: vec![PRIMARY_FORMAT],
            score_policy: ScorePolicy::default(),
            category_order: None,
        }
    }

    pub fn with_product_key(mut self, product_key: impl Into<String>) -> Self {
        self.product_key = product_key.into();
        self
    }

    pub fn with_chart_field(mut self, chart_field: impl Into<String>) -> Self {
        self.chart_field = chart_field.into();
        self
    }

    /// Requests additional encodings; the primary encoding is always included.
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = ChartFormat>) -> Self {
        let mut formats: Vec<ChartFormat> = formats.into_iter().collect();
        if !formats.contains(&PRIMARY_FORMAT) {
            formats.insert(0, PRIMARY_FORMAT);
        }
        self.formats = formats;
        self
    }

    pub fn with_score_policy(mut self, policy: ScorePolicy) -> Self {
        self.score_policy = policy;
        self
    }

    pub fn with_category_order(mut self, order: impl Into<Option<Vec<String>>>) -> Self {
        self.category_order = order.into();
        self
    }

    pub fn chart_field(&self) -> &str {
        &self.chart_field
    }

    pub fn formats(&self) -> &[ChartFormat] {
        &self.formats
    }

    pub fn chart(&self) -> &RadarChart {
        &self.chart
    }

    /// Directory receiving persisted raster files.
    pub fn images_dir(&self) -> &Path {
        self.chart.exporter().images_dir()
    }

    /// Reads the ordered series from `record`.
    pub fn extract_series(&self, record: &Value) -> Result<Series> {
        let series = Series::from_results(results_map(record, &self.product_key)?)?;
        let series = match &self.category_order {
            Some(order) => series.reordered(order)?,
            None => series,
        };
        series.apply_policy(self.score_policy)
    }

    /// Renders the chart and writes the primary encoding into `record`.
    ///
    /// The record is left untouched when any step fails. Returns every
    /// exported encoding, minus the primary one that now lives in the record.
    pub fn enrich(&self, record: &mut Value) -> Result<ChartResult> {
        self.try_enrich(record).inspect_err(|err| {
            error!("Error preparing report data: {err}");
        })
    }

    fn try_enrich(&self, record: &mut Value) -> Result<ChartResult> {
        if !record.is_object() {
            return Err(ReportError::invalid("report record must be a JSON object"));
        }

        let series = self.extract_series(record)?;
        let mut chart = self.chart.generate(&series, &self.formats)?;
        let primary = chart.take(PRIMARY_FORMAT).ok_or_else(|| {
            ReportError::Encoding(format!("chart export produced no {PRIMARY_FORMAT} payload"))
        })?;

        if let Some(fields) = record.as_object_mut() {
            fields.insert(self.chart_field.clone(), Value::String(primary.base64));
        }
        Ok(chart)
    }

    /// Returns `record` extended with the chart field.
    pub fn assemble(&self, mut record: Value) -> Result<Value> {
        self.enrich(&mut record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::angles::AngleTable;
    use crate::export::{ChartExporter, ExportSettings};

    fn assembler() -> ReportAssembler {
        ReportAssembler::new(RadarChart::with_angle_table(
            ChartExporter::new(ExportSettings::default(), "unused"),
            Arc::new(AngleTable::default()),
        ))
    }

    fn record(result: &str) -> Value {
        json!({
            "OrderInfo": { "order_id": "OAT250300005" },
            "EDAPPGS006": {
                "ResultInfo": {
                    "genetic_results": {
                        "A_results": { "item_code": "A", "holland_code": "Artistic", "result": "30" },
                        "C_results": { "item_code": "C", "holland_code": "Conventional", "result": result }
                    }
                }
            }
        })
    }

    #[test]
    fn adds_exactly_one_top_level_field() {
        let enriched = assembler().assemble(record("50")).unwrap();
        let fields = enriched.as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields[DEFAULT_CHART_FIELD].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(enriched["OrderInfo"]["order_id"], "OAT250300005");
    }

    #[test]
    fn failed_enrichment_leaves_the_record_untouched() {
        let mut input = record("fifty");
        let before = input.clone();
        let err = assembler().enrich(&mut input).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert_eq!(input, before);
    }

    #[test]
    fn missing_path_is_invalid_input() {
        let err = assembler().assemble(json!({ "OrderInfo": {} })).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(message) if message.contains("EDAPPGS006")));
    }

    #[test]
    fn primary_format_is_always_requested() {
        let assembler = assembler().with_formats([ChartFormat::Png]);
        assert_eq!(assembler.formats(), &[ChartFormat::Svg, ChartFormat::Png]);
    }

    #[test]
    fn custom_field_and_product_key() {
        let input = json!({
            "P1": { "ResultInfo": { "genetic_results": {
                "x": { "holland_code": "Social", "result": "40" }
            } } }
        });
        let enriched = assembler()
            .with_product_key("P1")
            .with_chart_field("Chart")
            .assemble(input)
            .unwrap();
        assert!(enriched.get("Chart").is_some());
        assert!(enriched.get(DEFAULT_CHART_FIELD).is_none());
    }
}
