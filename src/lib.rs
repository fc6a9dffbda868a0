//! `titanic-prep` prepares the Titanic passenger table for model training.
//!
//! A run reads one table from a relational source and one from a flat file, persists both,
//! validates the flat-file table against a fixed schema, then splits it into stratified
//! train/test partitions and transforms them with parameters fitted on the training rows only.
//!
//! ## Modules
//!
//! - [`types`]: schema + in-memory dataset types
//! - [`ingestion`]: CSV/JSON readers (typed or inferred) and the CSV writer
//! - [`reader`]: scoped relational connections and the [`reader::DataReader`]
//! - [`validation`]: column specs, value checks and the Titanic [`validation::TableSchema`]
//! - [`preprocessing`]: stratified split, [`preprocessing::FittedTransform`], persistence
//! - [`pipeline`]: stage orchestration with stage-tagged errors
//! - [`observability`]: observers for stage events
//! - [`config`]: TOML configuration and database credentials
//! - [`error`]: error types used across the crate
//!
//! ## Preprocessing example
//!
//! ```rust
//! use titanic_prep::preprocessing::FittedTransform;
//! use titanic_prep::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Age", DataType::Float64),
//!     Field::new("Sex", DataType::Utf8),
//! ]);
//! let train = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Float64(20.0), Value::Utf8("male".into())],
//!         vec![Value::Null, Value::Utf8("female".into())],
//!         vec![Value::Float64(40.0), Value::Null],
//!     ],
//! );
//!
//! let fitted = FittedTransform::fit(&train, &["Age"], &["Sex"]).unwrap();
//! assert_eq!(fitted.feature_names(), vec!["Age".to_string(), "Sex_male".to_string()]);
//!
//! let out = fitted.transform(&train).unwrap();
//! assert_eq!(out.row_count(), 3);
//! ```

pub mod config;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod pipeline;
pub mod preprocessing;
pub mod reader;
pub mod types;
pub mod validation;

pub use error::{Error, Result, StageError};
