//! Traced result set wrapper.

use std::error::Error;

use crate::config::TracingConfig;
use crate::observability::Instrumentation;
use crate::types::{Row, SqlWarning};

/// A cursor over the rows produced by a query.
pub trait ResultSet {
    type Error: Error;

    /// Advance the cursor. `None` once the rows are exhausted.
    fn next_row(&mut self) -> Result<Option<Row>, Self::Error>;

    fn column_count(&self) -> Result<usize, Self::Error>;

    /// Name of the column at zero-based `index`.
    fn column_name(&self, index: usize) -> Result<String, Self::Error>;

    fn fetch_size(&self) -> Result<u32, Self::Error>;

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), Self::Error>;

    fn warnings(&self) -> Result<Vec<SqlWarning>, Self::Error>;

    fn clear_warnings(&mut self) -> Result<(), Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;

    fn is_closed(&self) -> Result<bool, Self::Error>;

    /// Iterate over the remaining rows.
    fn rows(&mut self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows {
            result_set: self,
            done: false,
        }
    }
}

/// Iterator over the remaining rows of a [`ResultSet`].
///
/// Stops after the first error.
#[derive(Debug)]
pub struct Rows<'a, R> {
    result_set: &'a mut R,
    done: bool,
}

impl<R: ResultSet> Iterator for Rows<'_, R> {
    type Item = Result<Row, R::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.result_set.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// A traced wrapper around any [`ResultSet`].
///
/// Each cursor movement and accessor call is its own `db.roundtrip` span.
#[derive(Debug)]
pub struct TracedResultSet<R> {
    inner: R,
    tracer: Instrumentation,
}

impl<R: ResultSet> TracedResultSet<R> {
    pub fn with_config(result_set: R, config: TracingConfig) -> Self {
        Self::from_parts(result_set, Instrumentation::new(config))
    }

    pub(crate) fn from_parts(result_set: R, tracer: Instrumentation) -> Self {
        Self {
            inner: result_set,
            tracer,
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn config(&self) -> &TracingConfig {
        self.tracer.config()
    }
}

impl<R> AsRef<R> for TracedResultSet<R> {
    fn as_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: ResultSet> ResultSet for TracedResultSet<R> {
    type Error = R::Error;

    fn next_row(&mut self) -> Result<Option<Row>, Self::Error> {
        self.tracer
            .roundtrip("resultSet.next", "next")
            .track(|| self.inner.next_row())
    }

    fn column_count(&self) -> Result<usize, Self::Error> {
        self.tracer
            .roundtrip("resultSet.getColumnCount", "getColumnCount")
            .track(|| self.inner.column_count())
    }

    fn column_name(&self, index: usize) -> Result<String, Self::Error> {
        self.tracer
            .roundtrip("resultSet.getColumnName", "getColumnName")
            .track(|| self.inner.column_name(index))
    }

    fn fetch_size(&self) -> Result<u32, Self::Error> {
        self.tracer
            .roundtrip("resultSet.getFetchSize", "getFetchSize")
            .track(|| self.inner.fetch_size())
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("resultSet.setFetchSize", "setFetchSize")
            .track(|| self.inner.set_fetch_size(rows))
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, Self::Error> {
        self.tracer
            .roundtrip("resultSet.getWarnings", "getWarnings")
            .track(|| self.inner.warnings())
    }

    fn clear_warnings(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("resultSet.clearWarnings", "clearWarnings")
            .track(|| self.inner.clear_warnings())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("resultSet.close", "close")
            .track(|| self.inner.close())
    }

    fn is_closed(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("resultSet.isClosed", "isClosed")
            .track(|| self.inner.is_closed())
    }
}
