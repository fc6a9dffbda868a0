//! Data Reader: one table from a relational source, one from a flat file.
//!
//! Relational access goes through [`RelationalSource::open`], which hands out a
//! [`Connection`]. Connections are only ever used inside [`with_connection`], so they are
//! released on every exit path, including errors and panics, when the box is dropped.

#[cfg(feature = "db_connectorx")]
mod connectorx_source;

use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::ingestion::{ingest_from_path, IngestionOptions};
use crate::types::DataSet;

#[cfg(feature = "db_connectorx")]
pub use self::connectorx_source::ConnectorXSource;

/// An open session against a relational source.
///
/// Implementations release their resources in `Drop`.
pub trait Connection {
    /// Run `sql` and return the full result table.
    fn query(&mut self, sql: &str) -> Result<DataSet>;
}

/// Something a [`Connection`] can be opened against.
pub trait RelationalSource {
    /// Open a new connection. Fails with [`Error::Connection`] if the source is unreachable.
    fn open(&self) -> Result<Box<dyn Connection + '_>>;

    /// Short description for logs (never includes credentials).
    fn describe(&self) -> String;
}

/// Open a connection, run `f` with it and release it, whatever `f` returns.
pub fn with_connection<T>(
    source: &dyn RelationalSource,
    f: impl FnOnce(&mut dyn Connection) -> Result<T>,
) -> Result<T> {
    let mut conn = source.open()?;
    let out = f(conn.as_mut());
    drop(conn);
    out
}

/// Serves a local CSV/JSON snapshot as if it were the result of any query.
///
/// Useful for offline runs and tests.
#[derive(Debug, Clone)]
pub struct FileTableSource {
    path: PathBuf,
}

impl FileTableSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

struct FileConnection<'a> {
    path: &'a Path,
}

impl Connection for FileConnection<'_> {
    fn query(&mut self, _sql: &str) -> Result<DataSet> {
        ingest_from_path(self.path, &IngestionOptions::default())
    }
}

impl RelationalSource for FileTableSource {
    fn open(&self) -> Result<Box<dyn Connection + '_>> {
        if !self.path.exists() {
            return Err(Error::Connection {
                message: format!("snapshot {} does not exist", self.path.display()),
            });
        }
        Ok(Box::new(FileConnection { path: &self.path }))
    }

    fn describe(&self) -> String {
        format!("file snapshot {}", self.path.display())
    }
}

/// The two raw tables returned by [`DataReader::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawTables {
    /// Result of the configured query against the relational source.
    pub db: DataSet,
    /// Contents of the configured flat file.
    pub flat: DataSet,
}

/// Fetches the relational table and the flat-file table.
pub struct DataReader<'a> {
    source: &'a dyn RelationalSource,
    flat_file: PathBuf,
    query: String,
}

impl<'a> DataReader<'a> {
    pub fn new(source: &'a dyn RelationalSource, config: &SourceConfig) -> Self {
        Self {
            source,
            flat_file: config.flat_file.clone(),
            query: config.query.clone(),
        }
    }

    /// Description of the relational side, for logs.
    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    pub fn flat_file(&self) -> &Path {
        &self.flat_file
    }

    /// Run the query (inside a scoped connection), then load the flat file.
    pub fn read(&self) -> Result<RawTables> {
        let db = with_connection(self.source, |conn| conn.query(&self.query))?;
        let flat = ingest_from_path(&self.flat_file, &IngestionOptions::default())?;
        Ok(RawTables { db, flat })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::{Field, Schema, Value};

    #[derive(Default)]
    struct CountingSource {
        opened: Cell<usize>,
        closed: Cell<usize>,
        fail_query: bool,
    }

    struct CountingConnection<'a> {
        source: &'a CountingSource,
    }

    impl Connection for CountingConnection<'_> {
        fn query(&mut self, sql: &str) -> Result<DataSet> {
            if self.source.fail_query {
                return Err(Error::Connection {
                    message: format!("query failed: {sql}"),
                });
            }
            Ok(DataSet::new(
                Schema::new(vec![Field::new("n", crate::types::DataType::Int64)]),
                vec![vec![Value::Int64(1)]],
            ))
        }
    }

    impl Drop for CountingConnection<'_> {
        fn drop(&mut self) {
            self.source.closed.set(self.source.closed.get() + 1);
        }
    }

    impl RelationalSource for CountingSource {
        fn open(&self) -> Result<Box<dyn Connection + '_>> {
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(CountingConnection { source: self }))
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[test]
    fn connection_is_released_after_success() {
        let source = CountingSource::default();
        let ds = with_connection(&source, |c| c.query("select 1")).unwrap();
        assert_eq!(ds.row_count(), 1);
        assert_eq!((source.opened.get(), source.closed.get()), (1, 1));
    }

    #[test]
    fn connection_is_released_after_failure() {
        let source = CountingSource {
            fail_query: true,
            ..Default::default()
        };
        let err = with_connection(&source, |c| c.query("select 1")).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert_eq!((source.opened.get(), source.closed.get()), (1, 1));
    }

    #[test]
    fn missing_snapshot_is_a_connection_failure() {
        let source = FileTableSource::new("tests/fixtures/definitely_missing.csv");
        let err = with_connection(&source, |c| c.query("select 1")).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
