//! Flat-file readers and the CSV writer.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - reads against an explicit [`crate::types::Schema`] or infers one
//!
//! Format-specific functions are also available under [`csv`] and [`json`]. Artifacts are
//! written with [`write_csv`].

pub mod csv;
pub mod json;
pub mod unified;

pub use self::csv::write_csv;
pub use unified::{ingest_from_path, IngestionFormat, IngestionOptions};
