use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Convenience result type used by every stage.
pub type Result<T> = std::result::Result<T, Error>;

/// A single failed check reported by [`crate::validation::TableSchema::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Offending column.
    pub column: String,
    /// 1-based data row, or `None` for column-level failures (e.g. missing column).
    pub row: Option<usize>,
    /// Human readable description of the failed constraint.
    pub constraint: String,
    /// Rendered offending value, if any.
    pub value: Option<String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column '{}' failed {}", self.column, self.constraint)?;
        if let Some(row) = self.row {
            write!(f, " at row {row}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " (value='{value}')")?;
        }
        Ok(())
    }
}

/// Error type shared by the reader, validator, ingestion stage and preprocessor.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O error (e.g. permission denied, unwritable artifact path).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The relational source could not be reached or the query failed.
    #[error("connection failure: {message}")]
    Connection { message: String },

    /// An input file does not exist.
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// The input does not have the shape the reader expects.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required type.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// One or more schema checks failed.
    #[error("schema violation: {} ({} failure(s))", first_violation(.violations), .violations.len())]
    SchemaViolation { violations: Vec<Violation> },

    /// A required column is absent after drops.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    /// The target column holds a null, which cannot be stratified on.
    #[error("target column '{column}' is null at row {row}")]
    MissingTarget { column: String, row: usize },

    /// The stratified split cannot place every class in both partitions.
    #[error("insufficient class samples for stratified split: {message}")]
    InsufficientClassSamples { message: String },

    /// Configuration values are out of range or inconsistent.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

fn first_violation(violations: &[Violation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no details".to_string())
}

impl Error {
    /// Map an `open`-style I/O error to [`Error::FileNotFound`] when applicable.
    pub(crate) fn from_open(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound { path: path.into() }
        } else {
            Error::Io(err)
        }
    }

    /// Same as [`Error::from_open`] for errors raised by the `csv` crate.
    pub(crate) fn from_csv_open(err: csv::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::FileNotFound { path: path.into() }
            }
            _ => Error::Csv(err),
        }
    }
}

/// An [`Error`] tagged with the pipeline stage that raised it.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed")]
pub struct StageError {
    /// Stage in which the failure was detected.
    pub stage: Stage,
    /// Original cause.
    #[source]
    pub source: Error,
}

impl StageError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}
