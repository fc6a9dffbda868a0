//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are supported using dot paths in schema field names (e.g. `user.name`).

use std::fs;
use std::path::Path;

use serde_json::Map;

use crate::error::{Error, Result};
use crate::types::{DataSet, DataType, Field, Schema, Value};

type JsonObject = Map<String, serde_json::Value>;

/// Ingest JSON into an in-memory `DataSet`.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> Result<DataSet> {
    let text = read_text(path.as_ref())?;
    ingest_json_from_str(&text, schema)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> Result<DataSet> {
    let values = parse_documents(input)?;
    ingest_json_values(&values, schema)
}

/// Ingest a JSON file, inferring the schema from the top-level keys.
pub fn ingest_json_inferred_from_path(path: impl AsRef<Path>) -> Result<DataSet> {
    let text = read_text(path.as_ref())?;
    ingest_json_inferred_from_str(&text)
}

/// Ingest JSON from a string, inferring the schema.
///
/// Columns follow first-seen key order across all objects. A key missing from an object is
/// read as null. Integer-only columns are `Int64`, numeric columns `Float64`, boolean columns
/// `Bool`, string columns `Utf8`; mixing kinds in one column is a schema mismatch.
pub fn ingest_json_inferred_from_str(input: &str) -> Result<DataSet> {
    let values = parse_documents(input)?;
    let objects = values
        .iter()
        .enumerate()
        .map(|(idx0, v)| {
            v.as_object().ok_or_else(|| Error::SchemaMismatch {
                message: format!("row {} is not a json object", idx0 + 1),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut names: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let fields = names
        .iter()
        .map(|name| infer_json_type(name, &objects).map(|t| Field::new(name.clone(), t)))
        .collect::<Result<Vec<_>>>()?;
    let schema = Schema::new(fields);

    let mut rows = Vec::with_capacity(objects.len());
    for (idx0, obj) in objects.iter().enumerate() {
        let row = schema
            .fields
            .iter()
            .map(|field| match obj.get(&field.name) {
                Some(jv) => convert_json_value(idx0 + 1, &field.name, field.data_type, jv),
                None => Ok(Value::Null),
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::from_open(e, path))
}

fn parse_documents(input: &str) -> Result<Vec<serde_json::Value>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return match v {
            serde_json::Value::Array(items) => Ok(items),
            serde_json::Value::Object(_) => Ok(vec![v]),
            _ => Err(Error::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        };
    }

    // Fall back to NDJSON.
    let mut values = Vec::new();
    for (i, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| Error::SchemaMismatch {
            message: format!("invalid ndjson at line {}: {}", i + 1, e),
        })?;
        values.push(v);
    }
    Ok(values)
}

fn infer_json_type(name: &str, objects: &[&JsonObject]) -> Result<DataType> {
    let mut seen: Option<DataType> = None;
    for v in objects.iter().filter_map(|o| o.get(name)) {
        let kind = match v {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(_) => DataType::Bool,
            serde_json::Value::Number(n) if n.is_i64() => DataType::Int64,
            serde_json::Value::Number(_) => DataType::Float64,
            serde_json::Value::String(_) => DataType::Utf8,
            _ => {
                return Err(Error::SchemaMismatch {
                    message: format!("field '{name}' holds a nested value; only scalars are supported"),
                });
            }
        };
        seen = Some(match (seen, kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            (Some(a), b) => {
                return Err(Error::SchemaMismatch {
                    message: format!("field '{name}' mixes {a} and {b} values"),
                });
            }
        });
    }
    Ok(seen.unwrap_or(DataType::Utf8))
}

fn ingest_json_values(values: &[serde_json::Value], schema: &Schema) -> Result<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = v.as_object().ok_or_else(|| Error::SchemaMismatch {
            message: format!("row {row_num} is not a json object"),
        })?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let jv = get_by_dot_path(obj, &field.name).ok_or_else(|| Error::SchemaMismatch {
                message: format!("row {row_num} missing required field '{}'", field.name),
            })?;
            row.push(convert_json_value(row_num, &field.name, field.data_type, jv)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn get_by_dot_path<'a>(root: &'a JsonObject, path: &str) -> Option<&'a serde_json::Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn convert_json_value(row: usize, column: &str, data_type: DataType, v: &serde_json::Value) -> Result<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    let parse_error = |message: &str| Error::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Utf8 => v
            .as_str()
            .map(|s| Value::Utf8(s.to_string()))
            .ok_or_else(|| parse_error("expected string")),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| parse_error("expected bool")),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = v.as_u64() {
                i64::try_from(n)
                    .map(Value::Int64)
                    .map_err(|_| parse_error("u64 out of range for i64"))
            } else {
                Err(parse_error("expected integer number"))
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| parse_error("expected number")),
    }
}
