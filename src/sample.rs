//! Bundled six-category aptitude record used by the `sample` command and tests.

use serde_json::Value;

use crate::error::Result;

const SAMPLE_RECORD: &str = include_str!("../assets/sample_record.json");

/// Scores of the bundled record in document order (A, C, E, I, R, S).
pub const SAMPLE_SCORES: [f64; 6] = [30.0, 50.0, 90.0, 90.0, 50.0, 30.0];

pub fn sample_record() -> Result<Value> {
    Ok(serde_json::from_str(SAMPLE_RECORD)?)
}
