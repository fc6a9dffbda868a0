//! CSV ingestion and output.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (order can differ).
/// - Each value is parsed according to the schema field type.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> Result<DataSet> {
    let path = path.as_ref();
    let mut rdr = open_reader(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: io::Read>(rdr: &mut csv::Reader<R>, schema: &Schema) -> Result<DataSet> {
    let headers = rdr.headers()?.clone();

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(Error::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = record.get(csv_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Ingest a CSV file, inferring the column types from its contents.
pub fn ingest_csv_inferred_from_path(path: impl AsRef<Path>) -> Result<DataSet> {
    let path = path.as_ref();
    let mut rdr = open_reader(path)?;
    ingest_csv_inferred_from_reader(&mut rdr)
}

/// Ingest CSV data from a reader, inferring the column types.
///
/// Every header becomes a field, in file order. See [`infer_column_type`] for the rules.
pub fn ingest_csv_inferred_from_reader<R: io::Read>(rdr: &mut csv::Reader<R>) -> Result<DataSet> {
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let fields = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = infer_column_type(records.iter().map(|r| r.get(idx).unwrap_or("")));
            Field::new(name, data_type)
        })
        .collect();
    let schema = Schema::new(fields);

    let mut rows = Vec::with_capacity(records.len());
    for (row_idx0, record) in records.iter().enumerate() {
        let user_row = row_idx0 + 2;
        let mut row = Vec::with_capacity(schema.fields.len());
        for (idx, field) in schema.fields.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

/// Infer a column type from raw cells. Empty cells are ignored.
///
/// `Int64` if every cell is an integer, else `Float64` if every cell is a finite number,
/// else `Bool` if every cell is `true`/`false`, else `Utf8`. An all-empty column is `Utf8`.
pub fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str>) -> DataType {
    let (mut all_int, mut all_float, mut all_bool, mut any) = (true, true, true, false);
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        any = true;
        all_int &= cell.parse::<i64>().is_ok();
        all_float &= cell.parse::<f64>().map(f64::is_finite).unwrap_or(false);
        all_bool &= cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false");
        if !(all_int || all_float || all_bool) {
            break;
        }
    }

    match (any, all_int, all_float, all_bool) {
        (false, ..) => DataType::Utf8,
        (true, true, _, _) => DataType::Int64,
        (true, false, true, _) => DataType::Float64,
        (true, false, false, true) => DataType::Bool,
        _ => DataType::Utf8,
    }
}

/// Write `dataset` as UTF-8, comma-separated CSV with a header row.
///
/// Parent directories are created and an existing file is overwritten. Nulls are written
/// as empty cells.
pub fn write_csv(path: impl AsRef<Path>, dataset: &DataSet) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    write_csv_to_writer(&mut wtr, dataset)?;
    wtr.flush()?;
    Ok(())
}

/// Write `dataset` to an existing CSV writer (header first).
pub fn write_csv_to_writer<W: io::Write>(wtr: &mut csv::Writer<W>, dataset: &DataSet) -> Result<()> {
    wtr.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(Value::render))?;
    }
    Ok(())
}

/// Copy the records of the CSV file at `src` to `dst` cell for cell, without parsing values.
///
/// Parent directories are created and an existing file is overwritten. Returns the number of
/// data rows copied.
pub fn copy_csv(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<usize> {
    let dst = dst.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(src.as_ref())
        .map_err(|e| Error::from_csv_open(e, src.as_ref()))?;
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(dst)?;

    let mut records = 0usize;
    for record in rdr.records() {
        wtr.write_record(&record?)?;
        records += 1;
    }
    wtr.flush()?;
    Ok(records.saturating_sub(1))
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::from_csv_open(e, path))
}

fn parse_typed_value(row: usize, column: &str, data_type: DataType, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| Error::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn parse_bool(s: &str) -> std::result::Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
