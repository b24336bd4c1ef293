//! Error type shared by every stage of the chart and report pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while building charts, enriching records or invoking the renderer.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Malformed or missing input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The score series and the angle table disagree in length.
    #[error("Shape mismatch: {scores} scores for {angles} angles")]
    ShapeMismatch { scores: usize, angles: usize },

    /// The external renderer exited unsuccessfully.
    #[error("External renderer `{program}` failed with exit code {}", display_code(.code))]
    ExternalProcess {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The external renderer did not finish within the configured timeout.
    #[error("External renderer `{program}` timed out after {timeout:?}")]
    ExternalTimeout { program: String, timeout: Duration },

    /// The caller cancelled the external render.
    #[error("External renderer `{program}` was cancelled")]
    Cancelled { program: String },

    /// A directory or file could not be created, written or spawned.
    #[error("Resource error at {path}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The chart could not be rasterized or encoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}

impl ReportError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }

    /// Exit code of a failed external render, if the error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExternalProcess { code, .. } => *code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
