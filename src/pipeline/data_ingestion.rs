use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ArtifactPaths;
use crate::error::Result;
use crate::ingestion::csv::copy_csv;
use crate::ingestion::{write_csv, IngestionFormat};
use crate::observability::{preview, PipelineObserver, StageContext};
use crate::reader::DataReader;

use super::Stage;

/// Paths of the raw tables written by [`DataIngestion::initiate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionArtifacts {
    /// Flat-file table.
    pub raw_data_path: PathBuf,
    /// Relational table.
    pub db_data_path: PathBuf,
}

/// Persists both raw tables without transforming them.
pub struct DataIngestion {
    raw_data_path: PathBuf,
    db_data_path: PathBuf,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl DataIngestion {
    pub fn new(paths: &ArtifactPaths) -> Self {
        Self {
            raw_data_path: paths.raw_data.clone(),
            db_data_path: paths.db_data.clone(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<Arc<dyn PipelineObserver>>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch both tables through `reader` and write them to the artifact paths (overwriting).
    ///
    /// A CSV flat file is persisted cell for cell. The relational table is rendered from its
    /// typed values.
    pub fn initiate(&self, reader: &DataReader<'_>) -> Result<IngestionArtifacts> {
        self.log(&format!(
            "reading {} and {}",
            reader.describe_source(),
            reader.flat_file().display()
        ));
        let tables = reader.read()?;
        self.log(&format!("flat-file data:\n{}", preview(&tables.flat, 5)));
        self.log(&format!("database data:\n{}", preview(&tables.db, 5)));

        let flat_is_csv = reader
            .flat_file()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(IngestionFormat::from_extension)
            == Some(IngestionFormat::Csv);
        if !flat_is_csv {
            write_csv(&self.raw_data_path, &tables.flat)?;
        } else if !same_file(reader.flat_file(), &self.raw_data_path) {
            copy_csv(reader.flat_file(), &self.raw_data_path)?;
        }
        write_csv(&self.db_data_path, &tables.db)?;
        self.log(&format!(
            "raw data saved at {} ({} rows), database data saved at {} ({} rows)",
            self.raw_data_path.display(),
            tables.flat.row_count(),
            self.db_data_path.display(),
            tables.db.row_count()
        ));

        Ok(IngestionArtifacts {
            raw_data_path: self.raw_data_path.clone(),
            db_data_path: self.db_data_path.clone(),
        })
    }

    fn log(&self, message: &str) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_message(&StageContext { stage: Stage::Ingestion }, message);
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
