//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which reads a file into an in-memory
//! [`crate::types::DataSet`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If [`IngestionOptions::schema`] is `None`, column types are inferred from the contents.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DataSet, Schema};

use super::{csv, json};

/// Supported flat-file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Options controlling unified ingestion behavior.
#[derive(Debug, Clone, Default)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// If `None`, infer column types from the data.
    pub schema: Option<Schema>,
}

/// Read `path` into a [`DataSet`].
///
/// ```no_run
/// use titanic_prep::ingestion::{ingest_from_path, IngestionOptions};
///
/// # fn main() -> Result<(), titanic_prep::Error> {
/// let ds = ingest_from_path("artifacts/data.csv", &IngestionOptions::default())?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(path: impl AsRef<Path>, options: &IngestionOptions) -> Result<DataSet> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    match (fmt, options.schema.as_ref()) {
        (IngestionFormat::Csv, Some(schema)) => csv::ingest_csv_from_path(path, schema),
        (IngestionFormat::Csv, None) => csv::ingest_csv_inferred_from_path(path),
        (IngestionFormat::Json, Some(schema)) => json::ingest_json_from_path(path, schema),
        (IngestionFormat::Json, None) => json::ingest_json_inferred_from_path(path),
    }
}

fn infer_format_from_path(path: &Path) -> Result<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::SchemaMismatch {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| Error::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}
