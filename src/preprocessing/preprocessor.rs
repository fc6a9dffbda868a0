use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ArtifactPaths, ModelConfig};
use crate::error::Result;
use crate::ingestion::{ingest_from_path, write_csv, IngestionOptions};
use crate::observability::{preview, PipelineObserver, StageContext};
use crate::pipeline::Stage;
use crate::types::{DataSet, Value};

use super::split::{stratified_split, SplitIndices};
use super::transform::FittedTransform;

/// Paths and feature names returned by [`DataPreprocessor::split_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    /// Ordered feature column names (the target column is not included).
    pub feature_names: Vec<String>,
}

/// In-memory result of [`DataPreprocessor::prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Transformed training features with the target appended.
    pub train: DataSet,
    /// Transformed test features with the target appended.
    pub test: DataSet,
    /// Parameters fitted on the training partition.
    pub transform: FittedTransform,
    /// Row indices (into the loaded dataset) of each partition.
    pub split: SplitIndices,
}

/// Splits a raw dataset into transformed train/test tables and persists them.
pub struct DataPreprocessor {
    config: ModelConfig,
    paths: ArtifactPaths,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl DataPreprocessor {
    pub fn new(config: ModelConfig, paths: ArtifactPaths) -> Self {
        Self {
            config,
            paths,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<Arc<dyn PipelineObserver>>) -> Self {
        self.observer = observer;
        self
    }

    /// Load `path`, split and transform it, and write the train table, test table and
    /// fitted transform to the configured artifact paths (overwriting).
    pub fn split_data(&self, path: impl AsRef<Path>) -> Result<SplitOutput> {
        let dataset = ingest_from_path(path, &IngestionOptions::default())?;
        let prepared = self.prepare(&dataset)?;

        write_csv(&self.paths.train_data, &prepared.train)?;
        self.log(&format!("training data:\n{}", preview(&prepared.train, 4)));
        write_csv(&self.paths.test_data, &prepared.test)?;
        self.log(&format!("test data:\n{}", preview(&prepared.test, 4)));
        prepared.transform.save(&self.paths.preprocessor)?;

        self.log(&format!(
            "train data shape: ({}, {})",
            prepared.train.row_count(),
            prepared.train.column_count()
        ));
        self.log(&format!(
            "test data shape: ({}, {})",
            prepared.test.row_count(),
            prepared.test.column_count()
        ));
        self.log(&format!("preprocessor saved at {}", self.paths.preprocessor.display()));

        Ok(SplitOutput {
            train_path: self.paths.train_data.clone(),
            test_path: self.paths.test_data.clone(),
            feature_names: prepared.transform.feature_names(),
        })
    }

    /// The in-memory part of [`Self::split_data`]: drop, split, fit on train, transform both.
    pub fn prepare(&self, dataset: &DataSet) -> Result<PreparedData> {
        let cfg = &self.config;
        let dataset = dataset.drop_columns(&cfg.drop_columns);

        let target_idx = dataset.require_column(&cfg.target_column)?;
        let target_field = dataset.schema.fields[target_idx].clone();
        let (features, target) = dataset.split_off_column(&cfg.target_column)?;
        for name in cfg.features.numerical.iter().chain(&cfg.features.categorical) {
            features.require_column(name)?;
        }

        let split = stratified_split(&target, &cfg.target_column, cfg.test_size, cfg.random_state)?;
        let train_x = features.take_rows(&split.train);
        let test_x = features.take_rows(&split.test);

        let transform = FittedTransform::fit(&train_x, &cfg.features.numerical, &cfg.features.categorical)?;
        let train = transform
            .transform(&train_x)?
            .with_column(target_field.clone(), pick(&target, &split.train));
        let test = transform
            .transform(&test_x)?
            .with_column(target_field, pick(&target, &split.test));

        Ok(PreparedData {
            train,
            test,
            transform,
            split,
        })
    }

    fn log(&self, message: &str) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_message(&StageContext { stage: Stage::Preprocessing }, message);
        }
    }
}

fn pick(values: &[Value], indices: &[usize]) -> Vec<Value> {
    indices.iter().map(|&i| values[i].clone()).collect()
}
