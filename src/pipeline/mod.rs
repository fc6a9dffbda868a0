//! Pipeline orchestration: Reader → Ingestion → Schema Validator → Preprocessor.
//!
//! Each stage reports `on_start`, then `on_success` or `on_failure` (plus `on_alert` when the
//! failure's [`Severity`] meets the configured threshold) to the optional observer. A failing
//! stage aborts the run and its error comes back tagged with the stage in a [`StageError`].

mod data_ingestion;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{Result, StageError};
use crate::ingestion::{ingest_from_path, IngestionOptions};
use crate::observability::{severity_for_error, PipelineObserver, Severity, StageContext, StageStats};
use crate::preprocessing::{DataPreprocessor, SplitOutput};
use crate::reader::DataReader;
use crate::validation::TableSchema;

pub use data_ingestion::{DataIngestion, IngestionArtifacts};

/// Pipeline stage, used to tag errors and observer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingestion,
    Validation,
    Preprocessing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Preprocessing => "preprocessing",
        })
    }
}

/// Everything a full run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub ingestion: IngestionArtifacts,
    /// Rows that passed schema validation.
    pub validated_rows: usize,
    pub split: SplitOutput,
}

/// Runs the stages in order with a shared configuration and observer.
pub struct Pipeline {
    config: PipelineConfig,
    schema: TableSchema,
    observer: Option<Arc<dyn PipelineObserver>>,
    alert_at_or_above: Severity,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Pipeline {
    /// Pipeline validating against [`TableSchema::titanic`], alerting on critical failures.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            schema: TableSchema::titanic(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Severity at or above which failures are also sent to `on_alert`.
    pub fn with_alert_threshold(mut self, severity: Severity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full run. Validation checks the persisted flat-file table, which then feeds the
    /// preprocessor.
    pub fn run(&self, reader: &DataReader<'_>) -> std::result::Result<PipelineOutput, StageError> {
        let paths = self.config.artifact_paths();
        let ingestion = self.stage(
            Stage::Ingestion,
            || {
                DataIngestion::new(&paths)
                    .with_observer(self.observer.clone())
                    .initiate(reader)
            },
            |a| StageStats {
                rows: 0,
                artifacts: vec![a.raw_data_path.clone(), a.db_data_path.clone()],
            },
        )?;
        let validated_rows = self.run_validation(&ingestion.raw_data_path)?;
        let split = self.run_preprocessing(&ingestion.raw_data_path)?;

        Ok(PipelineOutput {
            ingestion,
            validated_rows,
            split,
        })
    }

    /// Load `path` and validate it against the schema. Returns the number of rows checked.
    pub fn run_validation(&self, path: impl AsRef<Path>) -> std::result::Result<usize, StageError> {
        self.stage(
            Stage::Validation,
            || {
                let dataset = ingest_from_path(path, &IngestionOptions::default())?;
                self.schema.validate(&dataset).map(|ds| ds.row_count())
            },
            |rows| StageStats {
                rows: *rows,
                artifacts: Vec::new(),
            },
        )
    }

    /// Split and transform `path`, writing the train/test tables and the fitted transform.
    pub fn run_preprocessing(&self, path: impl AsRef<Path>) -> std::result::Result<SplitOutput, StageError> {
        self.stage(
            Stage::Preprocessing,
            || {
                DataPreprocessor::new(self.config.model.clone(), self.config.artifact_paths())
                    .with_observer(self.observer.clone())
                    .split_data(path)
            },
            |out| StageStats {
                rows: 0,
                artifacts: vec![
                    out.train_path.clone(),
                    out.test_path.clone(),
                    self.config.artifact_paths().preprocessor,
                ],
            },
        )
    }

    fn stage<T>(
        &self,
        stage: Stage,
        body: impl FnOnce() -> Result<T>,
        stats: impl FnOnce(&T) -> StageStats,
    ) -> std::result::Result<T, StageError> {
        let ctx = StageContext { stage };
        if let Some(obs) = self.observer.as_ref() {
            obs.on_start(&ctx);
        }

        let result = body();

        if let Some(obs) = self.observer.as_ref() {
            match &result {
                Ok(value) => obs.on_success(&ctx, &stats(value)),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result.map_err(|e| StageError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Ingestion.to_string(), "ingestion");
        assert_eq!(Stage::Validation.to_string(), "validation");
        assert_eq!(Stage::Preprocessing.to_string(), "preprocessing");
    }

    #[test]
    fn missing_file_fails_validation_stage() {
        let err = Pipeline::new(PipelineConfig::default())
            .run_validation("does/not/exist.csv")
            .unwrap_err();
        assert_eq!(err.stage, Stage::Validation);
        assert!(matches!(err.source, crate::Error::FileNotFound { .. }));
    }
}
