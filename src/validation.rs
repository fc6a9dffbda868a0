//! Schema Validator.
//!
//! A [`TableSchema`] lists the columns a dataset must carry, each with an element type, a
//! nullability flag and an optional value [`Check`]. [`TableSchema::validate`] walks every
//! cell and collects all failures into a single [`Error::SchemaViolation`]; the dataset is
//! never modified.

use std::fmt;

use crate::error::{Error, Result, Violation};
use crate::types::{DataSet, DataType, Value};

/// Value constraint applied to every non-null cell of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Strictly greater than the bound.
    GreaterThan(f64),
    /// Greater than or equal to the bound.
    GreaterThanOrEqual(f64),
    /// Inclusive range.
    InRange { min: f64, max: f64 },
    /// Membership in a fixed set.
    IsIn(Vec<Value>),
}

impl Check {
    /// Convenience for a set of text values.
    pub fn is_in_str(values: &[&str]) -> Self {
        Check::IsIn(values.iter().map(|s| Value::Utf8(s.to_string())).collect())
    }

    /// Convenience for a set of integer values.
    pub fn is_in_int(values: &[i64]) -> Self {
        Check::IsIn(values.iter().map(|v| Value::Int64(*v)).collect())
    }

    fn holds(&self, value: &Value) -> bool {
        match self {
            Check::GreaterThan(bound) => value.as_f64().is_some_and(|v| v > *bound),
            Check::GreaterThanOrEqual(bound) => value.as_f64().is_some_and(|v| v >= *bound),
            Check::InRange { min, max } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
            Check::IsIn(allowed) => allowed.iter().any(|a| same_value(a, value)),
        }
    }
}

// Int and float cells compare numerically so `1` matches `1.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::GreaterThan(b) => write!(f, "greater_than({b})"),
            Check::GreaterThanOrEqual(b) => write!(f, "greater_than_or_equal_to({b})"),
            Check::InRange { min, max } => write!(f, "in_range({min}, {max})"),
            Check::IsIn(values) => {
                let rendered: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
                write!(f, "isin([{}])", rendered.join(", "))
            }
        }
    }
}

/// Expected shape of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub check: Option<Check>,
}

impl ColumnSpec {
    /// Non-nullable column without a value check.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            check: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    fn type_accepts(&self, value: &Value) -> bool {
        matches!(
            (self.data_type, value),
            (_, Value::Null)
                | (DataType::Int64, Value::Int64(_))
                | (DataType::Float64, Value::Int64(_) | Value::Float64(_))
                | (DataType::Bool, Value::Bool(_))
                | (DataType::Utf8, Value::Utf8(_))
        )
    }
}

/// A fixed list of column specifications.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// The Titanic passenger schema.
    pub fn titanic() -> Self {
        use DataType::{Float64, Int64, Utf8};
        Self::new(vec![
            ColumnSpec::new("PassengerId", Int64).check(Check::GreaterThan(0.0)),
            ColumnSpec::new("Survived", Int64).check(Check::is_in_int(&[0, 1])),
            ColumnSpec::new("Pclass", Int64).check(Check::is_in_int(&[1, 2, 3])),
            ColumnSpec::new("Name", Utf8),
            ColumnSpec::new("Sex", Utf8).check(Check::is_in_str(&["male", "female"])),
            ColumnSpec::new("Age", Float64)
                .nullable()
                .check(Check::InRange { min: 0.0, max: 100.0 }),
            ColumnSpec::new("SibSp", Int64).check(Check::GreaterThanOrEqual(0.0)),
            ColumnSpec::new("Parch", Int64).check(Check::GreaterThanOrEqual(0.0)),
            ColumnSpec::new("Ticket", Utf8),
            ColumnSpec::new("Fare", Float64).check(Check::GreaterThanOrEqual(0.0)),
            ColumnSpec::new("Cabin", Utf8).nullable(),
            ColumnSpec::new("Embarked", Utf8)
                .nullable()
                .check(Check::is_in_str(&["C", "Q", "S"])),
        ])
    }

    /// Validate `dataset` against every column spec.
    ///
    /// Returns the dataset unchanged on success, or [`Error::SchemaViolation`] listing every
    /// failure. Columns not named in the schema are ignored.
    pub fn validate<'a>(&self, dataset: &'a DataSet) -> Result<&'a DataSet> {
        let violations = self.violations(dataset);
        if violations.is_empty() {
            Ok(dataset)
        } else {
            Err(Error::SchemaViolation { violations })
        }
    }

    /// All failures for `dataset`, in column order then row order.
    pub fn violations(&self, dataset: &DataSet) -> Vec<Violation> {
        let mut out = Vec::new();
        for spec in &self.columns {
            let Some(idx) = dataset.schema.index_of(&spec.name) else {
                out.push(Violation {
                    column: spec.name.clone(),
                    row: None,
                    constraint: "column_in_dataframe".to_string(),
                    value: None,
                });
                continue;
            };

            for (row0, value) in dataset.column(idx).enumerate() {
                let row = Some(row0 + 1);
                let failed = if value.is_null() {
                    (!spec.nullable).then(|| "not_nullable".to_string())
                } else if !spec.type_accepts(value) {
                    Some(format!("dtype('{}')", spec.data_type))
                } else {
                    spec.check
                        .as_ref()
                        .filter(|c| !c.holds(value))
                        .map(ToString::to_string)
                };

                if let Some(constraint) = failed {
                    out.push(Violation {
                        column: spec.name.clone(),
                        row,
                        constraint,
                        value: (!value.is_null()).then(|| value.render()),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Schema};

    fn spec_only(spec: ColumnSpec, values: Vec<Value>) -> Result<()> {
        let schema = TableSchema::new(vec![spec.clone()]);
        let ds = DataSet::new(
            Schema::new(vec![Field::new(spec.name.clone(), spec.data_type)]),
            values.into_iter().map(|v| vec![v]).collect(),
        );
        schema.validate(&ds).map(|_| ())
    }

    #[test]
    fn greater_than_is_strict() {
        let spec = ColumnSpec::new("PassengerId", DataType::Int64).check(Check::GreaterThan(0.0));
        assert!(spec_only(spec.clone(), vec![Value::Int64(1)]).is_ok());
        assert!(spec_only(spec, vec![Value::Int64(0)]).is_err());
    }

    #[test]
    fn float_column_accepts_integer_cells() {
        let spec = ColumnSpec::new("Fare", DataType::Float64).check(Check::GreaterThanOrEqual(0.0));
        assert!(spec_only(spec, vec![Value::Int64(7), Value::Float64(0.0)]).is_ok());
    }

    #[test]
    fn int_column_rejects_float_cells() {
        let spec = ColumnSpec::new("SibSp", DataType::Int64);
        let err = spec_only(spec, vec![Value::Float64(1.5)]).unwrap_err();
        assert!(err.to_string().contains("dtype('int64')"));
    }

    #[test]
    fn collects_every_failure() {
        let schema = TableSchema::new(vec![
            ColumnSpec::new("Sex", DataType::Utf8).check(Check::is_in_str(&["male", "female"])),
            ColumnSpec::new("Ticket", DataType::Utf8),
        ]);
        let ds = DataSet::new(
            Schema::new(vec![Field::new("Sex", DataType::Utf8)]),
            vec![vec![Value::Utf8("other".into())], vec![Value::Null]],
        );

        let Err(Error::SchemaViolation { violations }) = schema.validate(&ds) else {
            panic!("expected schema violation");
        };
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].row, Some(1));
        assert_eq!(violations[0].value.as_deref(), Some("other"));
        assert_eq!(violations[1].constraint, "not_nullable");
        assert_eq!(violations[2].column, "Ticket");
        assert_eq!(violations[2].row, None);
    }
}
