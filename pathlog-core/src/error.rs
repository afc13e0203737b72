//! Error types shared by every stage of log processing.
use std::path::PathBuf;

use thiserror::Error;

/// A single CSV row that does not match the shape its tag requires.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("line {line}: unknown record tag `{tag}`")]
    UnknownTag { line: u64, tag: String },
    #[error("line {line}: {tag} record needs field {index} but has only {arity} fields")]
    MissingField {
        line: u64,
        tag: &'static str,
        index: usize,
        arity: usize,
    },
    #[error("line {line}: {tag} field {index} is not a number (got `{value}`)")]
    InvalidNumber {
        line: u64,
        tag: &'static str,
        index: usize,
        value: String,
    },
}

impl RecordError {
    #[must_use]
    pub const fn line(&self) -> u64 {
        match self {
            Self::UnknownTag { line, .. }
            | Self::MissingField { line, .. }
            | Self::InvalidNumber { line, .. } => *line,
        }
    }
}

/// Failures raised while reading logs or writing derived outputs.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("malformed record in {}", path.display())]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
    #[error("I/O failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV failure on {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to render plot {}: {message}", path.display())]
    Plot { path: PathBuf, message: String },
    #[error("unsupported image format for {} (expected png, jpg, jpeg, bmp or svg)", path.display())]
    UnsupportedImageFormat { path: PathBuf },
    #[error("invalid layout config {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to overwrite existing stage folder {}", path.display())]
    DestinationExists { path: PathBuf },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
