//! The fitted column transform: median-impute + standardize numerical columns, mode-impute +
//! one-hot categorical columns.
//!
//! All statistics come from the data passed to [`FittedTransform::fit`]; applying the
//! transform never looks at the statistics of its input.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Learned parameters for one numerical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericParams {
    pub column: String,
    /// Imputation value for nulls.
    pub median: f64,
    /// Mean after imputation.
    pub mean: f64,
    /// Population standard deviation after imputation. Zero for constant columns.
    pub std: f64,
}

impl NumericParams {
    fn fit(column: &str, values: &[Option<f64>]) -> Self {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        observed.sort_by(f64::total_cmp);
        let median = median_of_sorted(&observed).unwrap_or(0.0);

        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        let n = imputed.len().max(1) as f64;
        let mean = imputed.iter().sum::<f64>() / n;
        let constant = imputed.windows(2).all(|w| w[0] == w[1]);
        let std = if constant {
            0.0
        } else {
            (imputed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
        };

        Self {
            column: column.to_string(),
            median,
            mean,
            std,
        }
    }

    /// Impute then standardize one value. Zero-variance columns scale to `0.0`.
    pub fn apply(&self, value: Option<f64>) -> f64 {
        let x = value.unwrap_or(self.median);
        if self.std == 0.0 { 0.0 } else { (x - self.mean) / self.std }
    }
}

fn numeric_key(category: &str) -> f64 {
    category.parse().unwrap_or(f64::NAN)
}

fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Learned parameters for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalParams {
    pub column: String,
    /// Imputation value for nulls (most frequent; ties go to the smallest category).
    pub mode: String,
    /// Sorted training vocabulary. The first entry is the reference category and gets no
    /// indicator column.
    pub categories: Vec<String>,
}

impl CategoricalParams {
    /// `numeric` orders categories by value instead of by text, so `2 < 3 < 10`.
    fn fit(column: &str, values: &[Option<String>], numeric: bool) -> Self {
        let mut freq: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *freq.entry(v.as_str()).or_default() += 1;
        }

        let mut categories: Vec<&str> = freq.keys().copied().collect();
        if numeric {
            categories.sort_by(|a, b| numeric_key(a).total_cmp(&numeric_key(b)).then(a.cmp(b)));
        }

        let mut mode = "";
        let mut best = 0;
        for &cat in &categories {
            let count = freq[cat];
            if count > best {
                mode = cat;
                best = count;
            }
        }

        Self {
            column: column.to_string(),
            mode: mode.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Category dropped to avoid collinear indicators.
    pub fn reference_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Indicator column names, `<column>_<category>`, one per non-reference category.
    pub fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .skip(1)
            .map(move |c| format!("{}_{}", self.column, c))
    }

    /// Push one indicator per non-reference category. Unseen values push all zeros.
    pub fn encode_into(&self, value: Option<&str>, out: &mut Vec<f64>) {
        let cat = value.unwrap_or(&self.mode);
        out.extend(
            self.categories
                .iter()
                .skip(1)
                .map(|c| if c == cat { 1.0 } else { 0.0 }),
        );
    }
}

/// Fitted numerical and categorical parameters, in output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    pub numerical: Vec<NumericParams>,
    pub categorical: Vec<CategoricalParams>,
}

impl FittedTransform {
    /// Learn parameters from `data`. Every listed column must be present.
    pub fn fit<S: AsRef<str>>(data: &DataSet, numerical: &[S], categorical: &[S]) -> Result<Self> {
        let numerical = numerical
            .iter()
            .map(|name| {
                let name = name.as_ref();
                Ok(NumericParams::fit(name, &numeric_column(data, name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let categorical = categorical
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let (values, numeric) = category_column(data, name)?;
                Ok(CategoricalParams::fit(name, &values, numeric))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            numerical,
            categorical,
        })
    }

    /// Output column names: numerical columns by name, then indicator columns.
    pub fn feature_names(&self) -> Vec<String> {
        self.numerical
            .iter()
            .map(|p| p.column.clone())
            .chain(self.categorical.iter().flat_map(|p| p.indicator_names()))
            .collect()
    }

    /// Apply the parameters to `data`, producing one `Float64` column per feature name.
    ///
    /// Row order is preserved. Columns of `data` that the transform does not know are ignored.
    pub fn transform(&self, data: &DataSet) -> Result<DataSet> {
        let numeric_cols = self
            .numerical
            .iter()
            .map(|p| numeric_column(data, &p.column))
            .collect::<Result<Vec<_>>>()?;
        let category_cols = self
            .categorical
            .iter()
            .map(|p| category_column(data, &p.column).map(|(values, _)| values))
            .collect::<Result<Vec<_>>>()?;

        let names = self.feature_names();
        let mut rows = Vec::with_capacity(data.row_count());
        let mut buf: Vec<f64> = Vec::with_capacity(names.len());
        for r in 0..data.row_count() {
            buf.clear();
            for (params, col) in self.numerical.iter().zip(&numeric_cols) {
                buf.push(params.apply(col[r]));
            }
            for (params, col) in self.categorical.iter().zip(&category_cols) {
                params.encode_into(col[r].as_deref(), &mut buf);
            }
            rows.push(buf.iter().map(|&v| Value::Float64(v)).collect());
        }

        let schema = Schema::new(
            names
                .into_iter()
                .map(|n| Field::new(n, DataType::Float64))
                .collect(),
        );
        Ok(DataSet::new(schema, rows))
    }

    /// Write as pretty JSON, creating parent directories and overwriting.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    /// Read a transform written by [`FittedTransform::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| Error::from_open(e, path))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn numeric_column(data: &DataSet, name: &str) -> Result<Vec<Option<f64>>> {
    let idx = data.require_column(name)?;
    data.column(idx)
        .enumerate()
        .map(|(row0, v)| match v {
            Value::Null => Ok(None),
            other => other.as_f64().map(Some).ok_or_else(|| Error::ParseError {
                row: row0 + 1,
                column: name.to_string(),
                raw: other.render(),
                message: "expected a numeric value".to_string(),
            }),
        })
        .collect()
}

/// Rendered category values, and whether every non-null cell is a number.
fn category_column(data: &DataSet, name: &str) -> Result<(Vec<Option<String>>, bool)> {
    let idx = data.require_column(name)?;
    let numeric = data.column(idx).all(|v| v.is_null() || v.as_f64().is_some());
    let values = data
        .column(idx)
        .map(|v| (!v.is_null()).then(|| v.render()))
        .collect();
    Ok((values, numeric))
}
