//! MySQL/Postgres source backed by ConnectorX (feature `db_connectorx`).
//!
//! ConnectorX opens its own pooled connections per `get_arrow` call and closes them before
//! returning, so a [`ConnectorXConnection`] only holds the parsed connection descriptor.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowDataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use ::connectorx::get_arrow::get_arrow;
use ::connectorx::source_router::SourceConn;
use ::connectorx::sql::CXQuery;

use crate::config::DbConfig;
use crate::error::{Error, Result};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::{Connection, RelationalSource};

/// Relational source reached through a ConnectorX connection URL.
pub struct ConnectorXSource {
    url: String,
    display: String,
}

impl ConnectorXSource {
    /// Build from credentials; `scheme` is `mysql` or `postgres`.
    pub fn new(db: &DbConfig, scheme: &str) -> Self {
        Self {
            url: db.url(scheme),
            display: format!("{scheme}://{}/{}", db.host, db.database),
        }
    }
}

struct ConnectorXConnection {
    conn: SourceConn,
}

impl RelationalSource for ConnectorXSource {
    fn open(&self) -> Result<Box<dyn Connection + '_>> {
        let conn = SourceConn::try_from(self.url.as_str()).map_err(|e| Error::Connection {
            message: format!("{}: {e}", self.display),
        })?;
        Ok(Box::new(ConnectorXConnection { conn }))
    }

    fn describe(&self) -> String {
        self.display.clone()
    }
}

impl Connection for ConnectorXConnection {
    fn query(&mut self, sql: &str) -> Result<DataSet> {
        let queries = [CXQuery::from(sql)];
        let destination = get_arrow(&self.conn, None, &queries, None).map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;
        let batches = destination.arrow().map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;
        record_batches_to_dataset(&batches)
    }
}

fn record_batches_to_dataset(batches: &[RecordBatch]) -> Result<DataSet> {
    let Some(first) = batches.first() else {
        return Ok(DataSet::new(Schema::new(Vec::new()), Vec::new()));
    };
    let fields: Vec<Field> = first
        .schema()
        .fields()
        .iter()
        .map(|f| Field::new(f.name().as_str(), logical_type(f.data_type())))
        .collect();

    let mut rows = Vec::new();
    for batch in batches {
        let columns = batch
            .columns()
            .iter()
            .zip(&fields)
            .map(|(col, field)| column_values(col, field))
            .collect::<Result<Vec<_>>>()?;
        for r in 0..batch.num_rows() {
            rows.push(columns.iter().map(|c| c[r].clone()).collect());
        }
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn logical_type(dt: &ArrowDataType) -> DataType {
    use ArrowDataType as A;
    match dt {
        A::Int8 | A::Int16 | A::Int32 | A::Int64 | A::UInt8 | A::UInt16 | A::UInt32 => DataType::Int64,
        A::UInt64 | A::Float16 | A::Float32 | A::Float64 | A::Decimal128(..) | A::Decimal256(..) => {
            DataType::Float64
        }
        A::Boolean => DataType::Bool,
        _ => DataType::Utf8,
    }
}

fn column_values(col: &ArrayRef, field: &Field) -> Result<Vec<Value>> {
    let target = match field.data_type {
        DataType::Int64 => ArrowDataType::Int64,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Bool => ArrowDataType::Boolean,
        DataType::Utf8 => ArrowDataType::Utf8,
    };
    let arr = cast(col, &target).map_err(|e| Error::SchemaMismatch {
        message: format!("column '{}' cannot be read as {}: {e}", field.name, field.data_type),
    })?;

    let values = match field.data_type {
        DataType::Int64 => {
            let a = arr.as_primitive::<Int64Type>();
            (0..a.len())
                .map(|i| if a.is_null(i) { Value::Null } else { Value::Int64(a.value(i)) })
                .collect()
        }
        DataType::Float64 => {
            let a = arr.as_primitive::<Float64Type>();
            (0..a.len())
                .map(|i| if a.is_null(i) { Value::Null } else { Value::Float64(a.value(i)) })
                .collect()
        }
        DataType::Bool => {
            let a = arr.as_boolean();
            (0..a.len())
                .map(|i| if a.is_null(i) { Value::Null } else { Value::Bool(a.value(i)) })
                .collect()
        }
        DataType::Utf8 => {
            let a = arr.as_string::<i32>();
            (0..a.len())
                .map(|i| {
                    if a.is_null(i) {
                        Value::Null
                    } else {
                        Value::Utf8(a.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}
