//! Ordered category scores extracted from report records.
//!
//! The chart layout follows the order of the series exactly, so a [`Series`]
//! is always an explicit list: either the document order of the record's
//! results map or a caller-supplied category order.

use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ReportError, Result};

/// Lower bound of the expected score range.
pub const MIN_SCORE: f64 = 0.0;
/// Upper bound of the expected score range.
pub const MAX_SCORE: f64 = 100.0;

/// One spoke of the radar chart.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryScore {
    /// Short category code, for example `"E"`.
    pub code: String,
    /// Full category name, for example `"Enterprising"`.
    pub name: String,
    pub score: f64,
}

impl CategoryScore {
    pub fn new(code: impl Into<String>, name: impl Into<String>, score: f64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            score,
        }
    }
}

/// How scores outside `0..=100` are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    /// Plot the score unchanged.
    #[default]
    PassThrough,
    /// Clamp the score into range.
    Clamp,
    /// Fail with an invalid input error.
    Reject,
}

impl std::str::FromStr for ScorePolicy {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pass-through" => Ok(Self::PassThrough),
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(ReportError::invalid(format!(
                "unknown score policy '{other}' (use pass-through|clamp|reject)"
            ))),
        }
    }
}

/// Non-empty, ordered list of category scores.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    entries: Vec<CategoryScore>,
}

impl Series {
    /// Creates a series, rejecting an empty list.
    pub fn new(entries: Vec<CategoryScore>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ReportError::invalid("series must contain at least one category"));
        }
        Ok(Self { entries })
    }

    /// Builds a series from a `genetic_results` map in document order.
    ///
    /// Every entry must carry a `holland_code` label and an integer `result`,
    /// stored either as a numeric string or as a JSON integer. `item_code`
    /// is used as the short code when present.
    pub fn from_results(results: &Map<String, Value>) -> Result<Self> {
        let entries = results
            .iter()
            .map(|(key, entry)| parse_entry(key, entry))
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[CategoryScore] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.entries.iter().map(|entry| entry.score).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Reorders the series to follow `order`.
    ///
    /// Each item of `order` may name a category by code or full name; every
    /// category must be named exactly once.
    pub fn reordered(&self, order: &[String]) -> Result<Self> {
        if order.len() != self.entries.len() {
            return Err(ReportError::invalid(format!(
                "category order names {} categories but the series has {}",
                order.len(),
                self.entries.len()
            )));
        }

        let mut taken = vec![false; self.entries.len()];
        let mut entries = Vec::with_capacity(order.len());
        for wanted in order {
            let index = self
                .entries
                .iter()
                .position(|entry| &entry.code == wanted || &entry.name == wanted)
                .ok_or_else(|| {
                    ReportError::invalid(format!("category order names unknown category '{wanted}'"))
                })?;
            if taken[index] {
                return Err(ReportError::invalid(format!(
                    "category '{wanted}' appears more than once in the category order"
                )));
            }
            taken[index] = true;
            entries.push(self.entries[index].clone());
        }
        Self::new(entries)
    }

    /// Applies `policy` to scores outside `0..=100`.
    pub fn apply_policy(mut self, policy: ScorePolicy) -> Result<Self> {
        for entry in &mut self.entries {
            if (MIN_SCORE..=MAX_SCORE).contains(&entry.score) {
                continue;
            }
            match policy {
                ScorePolicy::PassThrough => {
                    warn!(
                        "score {} for '{}' is outside 0..=100 and is plotted as-is",
                        entry.score,
                        entry.name
                    );
                }
                ScorePolicy::Clamp => {
                    entry.score = entry.score.clamp(MIN_SCORE, MAX_SCORE);
                }
                ScorePolicy::Reject => {
                    return Err(ReportError::invalid(format!(
                        "score {} for '{}' is outside 0..=100",
                        entry.score, entry.name
                    )));
                }
            }
        }
        Ok(self)
    }
}

fn parse_entry(key: &str, entry: &Value) -> Result<CategoryScore> {
    let fields = entry
        .as_object()
        .ok_or_else(|| ReportError::invalid(format!("result '{key}' is not an object")))?;

    let name = fields
        .get("holland_code")
        .and_then(Value::as_str)
        .ok_or_else(|| ReportError::invalid(format!("result '{key}' is missing 'holland_code'")))?;

    let code = fields
        .get("item_code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| name.chars().take(1).collect());

    let score = match fields.get("result") {
        Some(Value::String(text)) => text.trim().parse::<i64>().map_err(|_| {
            ReportError::invalid(format!("result '{key}' has non-numeric score '{text}'"))
        })?,
        Some(Value::Number(number)) => number.as_i64().ok_or_else(|| {
            ReportError::invalid(format!("result '{key}' has non-integer score {number}"))
        })?,
        Some(other) => {
            return Err(ReportError::invalid(format!(
                "result '{key}' has unsupported score {other}"
            )))
        }
        None => {
            return Err(ReportError::invalid(format!(
                "result '{key}' is missing 'result'"
            )))
        }
    };

    Ok(CategoryScore::new(code, name, score as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results() -> Map<String, Value> {
        let value = json!({
            "A_results": { "item_code": "A", "holland_code": "Artistic", "result": "30" },
            "C_results": { "item_code": "C", "holland_code": "Conventional", "result": "50" },
            "E_results": { "holland_code": "Enterprising", "result": 90 }
        });
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn extraction_keeps_document_order() {
        let series = Series::from_results(&results()).unwrap();
        assert_eq!(series.names(), vec!["Artistic", "Conventional", "Enterprising"]);
        assert_eq!(series.scores(), vec![30.0, 50.0, 90.0]);
        assert_eq!(series.entries()[2].code, "E");
    }

    #[test]
    fn non_numeric_score_is_invalid() {
        let value = json!({ "A": { "holland_code": "Artistic", "result": "high" } });
        let err = Series::from_results(value.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(message) if message.contains("high")));
    }

    #[test]
    fn missing_label_is_invalid() {
        let value = json!({ "A": { "result": "10" } });
        assert!(matches!(
            Series::from_results(value.as_object().unwrap()),
            Err(ReportError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_results_are_invalid() {
        assert!(matches!(
            Series::from_results(&Map::new()),
            Err(ReportError::InvalidInput(_))
        ));
    }

    #[test]
    fn explicit_order_by_code_or_name() {
        let series = Series::from_results(&results()).unwrap();
        let order = vec!["E".to_string(), "Artistic".to_string(), "C".to_string()];
        let reordered = series.reordered(&order).unwrap();
        assert_eq!(reordered.scores(), vec![90.0, 30.0, 50.0]);
    }

    #[test]
    fn explicit_order_must_name_every_category_once() {
        let series = Series::from_results(&results()).unwrap();
        let duplicate = vec!["E".to_string(), "E".to_string(), "C".to_string()];
        assert!(series.reordered(&duplicate).is_err());
        let short = vec!["E".to_string()];
        assert!(series.reordered(&short).is_err());
        let unknown = vec!["E".to_string(), "X".to_string(), "C".to_string()];
        assert!(series.reordered(&unknown).is_err());
    }

    #[test]
    fn score_policies() {
        let series = Series::new(vec![
            CategoryScore::new("A", "Artistic", 130.0),
            CategoryScore::new("S", "Social", -5.0),
        ])
        .unwrap();

        let passed = series.clone().apply_policy(ScorePolicy::PassThrough).unwrap();
        assert_eq!(passed.scores(), vec![130.0, -5.0]);

        let clamped = series.clone().apply_policy(ScorePolicy::Clamp).unwrap();
        assert_eq!(clamped.scores(), vec![100.0, 0.0]);

        assert!(series.apply_policy(ScorePolicy::Reject).is_err());
    }
}
