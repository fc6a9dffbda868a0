//! Preprocessor: stratified train/test split, a transform fitted on the training partition,
//! and persistence of the transformed tables and fitted parameters.
//!
//! Numerical columns are median-imputed then standardized; categorical columns are
//! mode-imputed then one-hot encoded with the first (sorted) category dropped. Parameters
//! are learned from training rows only and applied unchanged to the test rows.

mod preprocessor;
pub mod split;
pub mod transform;

pub use preprocessor::{DataPreprocessor, PreparedData, SplitOutput};
pub use split::{stratified_split, SplitIndices};
pub use transform::{CategoricalParams, FittedTransform, NumericParams};
