//! Traced statement wrapper.

use std::any::TypeId;
use std::error::Error;
use std::time::Duration;

use crate::config::{TraceOption, TracingConfig};
use crate::observability::Instrumentation;
use crate::result_set::{ResultSet, TracedResultSet};
use crate::types::{
    AutoGeneratedKeys, CurrentResult, FetchDirection, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType, SqlWarning,
};

/// A blocking statement that executes queries against a database.
///
/// Every method may fail with the implementation's own error type; the traced
/// wrapper hands those errors back untouched.
pub trait Statement {
    type Error: Error;
    type ResultSet: ResultSet<Error = Self::Error>;
    /// Handle to the connection that created the statement.
    type Connection;

    fn add_batch(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Ask the database to abort the running query. May be called from
    /// another thread when the implementation allows it.
    fn cancel(&self) -> Result<(), Self::Error>;

    fn clear_batch(&mut self) -> Result<(), Self::Error>;

    fn clear_warnings(&mut self) -> Result<(), Self::Error>;

    /// Release the statement's database resources.
    fn close(&mut self) -> Result<(), Self::Error>;

    fn close_on_completion(&mut self) -> Result<(), Self::Error>;

    /// Execute `sql`, returning `true` when the first result is a result set.
    fn execute(&mut self, sql: &str) -> Result<bool, Self::Error>;

    fn execute_with_generated_keys(
        &mut self,
        sql: &str,
        keys: AutoGeneratedKeys,
    ) -> Result<bool, Self::Error>;

    fn execute_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[usize],
    ) -> Result<bool, Self::Error>;

    fn execute_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[&str],
    ) -> Result<bool, Self::Error>;

    /// Run the batched commands, returning one update count per command.
    /// Negative counts carry driver-specific meaning.
    fn execute_batch(&mut self) -> Result<Vec<i64>, Self::Error>;

    fn execute_query(&mut self, sql: &str) -> Result<Self::ResultSet, Self::Error>;

    fn execute_update(&mut self, sql: &str) -> Result<u64, Self::Error>;

    fn execute_update_with_generated_keys(
        &mut self,
        sql: &str,
        keys: AutoGeneratedKeys,
    ) -> Result<u64, Self::Error>;

    fn execute_update_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[usize],
    ) -> Result<u64, Self::Error>;

    fn execute_update_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[&str],
    ) -> Result<u64, Self::Error>;

    fn connection(&self) -> Result<Self::Connection, Self::Error>;

    fn fetch_direction(&self) -> Result<FetchDirection, Self::Error>;

    fn fetch_size(&self) -> Result<u32, Self::Error>;

    fn generated_keys(&mut self) -> Result<Self::ResultSet, Self::Error>;

    fn max_field_size(&self) -> Result<u32, Self::Error>;

    fn max_rows(&self) -> Result<u64, Self::Error>;

    fn more_results(&mut self) -> Result<bool, Self::Error>;

    fn more_results_with(&mut self, current: CurrentResult) -> Result<bool, Self::Error>;

    /// Zero means no limit.
    fn query_timeout(&self) -> Result<Duration, Self::Error>;

    fn result_set(&mut self) -> Result<Option<Self::ResultSet>, Self::Error>;

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, Self::Error>;

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, Self::Error>;

    fn result_set_type(&self) -> Result<ResultSetType, Self::Error>;

    /// `None` when the current result is a result set or there are no more results.
    fn update_count(&self) -> Result<Option<u64>, Self::Error>;

    fn warnings(&self) -> Result<Vec<SqlWarning>, Self::Error>;

    fn is_closed(&self) -> Result<bool, Self::Error>;

    fn is_close_on_completion(&self) -> Result<bool, Self::Error>;

    fn is_poolable(&self) -> Result<bool, Self::Error>;

    fn set_cursor_name(&mut self, name: &str) -> Result<(), Self::Error>;

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), Self::Error>;

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), Self::Error>;

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), Self::Error>;

    fn set_max_field_size(&mut self, max: u32) -> Result<(), Self::Error>;

    fn set_max_rows(&mut self, max: u64) -> Result<(), Self::Error>;

    fn set_poolable(&mut self, poolable: bool) -> Result<(), Self::Error>;

    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), Self::Error>;

    /// Whether this statement is, or wraps, a value of type `type_id`.
    fn is_wrapper_for(&self, type_id: TypeId) -> Result<bool, Self::Error>;
}

/// A traced wrapper around any [`Statement`].
///
/// Every operation runs inside its own `db.roundtrip` span, except
/// [`connection`](Statement::connection) and
/// [`is_wrapper_for`](Statement::is_wrapper_for), which are forwarded without
/// one. Result sets are handed back wrapped in [`TracedResultSet`].
///
/// # Example
///
/// ```rust,ignore
/// use statement_tracing::{TraceOption, TracedStatement};
///
/// let mut stmt = TracedStatement::new(driver_stmt, &[TraceOption::AnnotateSpansWithSql]);
/// let rows = stmt.execute_query("SELECT id FROM users")?;
/// ```
#[derive(Debug)]
pub struct TracedStatement<S> {
    inner: S,
    tracer: Instrumentation,
}

impl<S: Statement> TracedStatement<S> {
    /// Wrap `statement`, capturing `options` for its whole lifetime.
    pub fn new(statement: S, options: &[TraceOption]) -> Self {
        Self::with_config(statement, TracingConfig::from(options))
    }

    /// Wrap `statement` with a full tracing configuration.
    pub fn with_config(statement: S, config: TracingConfig) -> Self {
        Self::from_parts(statement, Instrumentation::new(config))
    }

    pub(crate) fn from_parts(statement: S, tracer: Instrumentation) -> Self {
        Self {
            inner: statement,
            tracer,
        }
    }

    /// Wrap `statement` with default configuration.
    pub fn wrap(statement: S) -> Self {
        Self::with_config(statement, TracingConfig::default())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the wrapper and return the underlying statement.
    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn config(&self) -> &TracingConfig {
        self.tracer.config()
    }

    /// Whether query text is recorded on spans.
    pub fn annotates_spans_with_sql(&self) -> bool {
        self.tracer.annotates()
    }

    fn wrap_result_set(&self, result_set: S::ResultSet) -> TracedResultSet<S::ResultSet> {
        TracedResultSet::from_parts(result_set, self.tracer.clone())
    }
}

impl<S> AsRef<S> for TracedStatement<S> {
    fn as_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: Statement> Statement for TracedStatement<S> {
    type Error = S::Error;
    type ResultSet = TracedResultSet<S::ResultSet>;
    type Connection = S::Connection;

    fn add_batch(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.addBatch", "addBatch", sql)
            .track(|| self.inner.add_batch(sql))
    }

    fn cancel(&self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.cancel", "cancel")
            .track(|| self.inner.cancel())
    }

    fn clear_batch(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.clearBatch", "clearBatch")
            .track(|| self.inner.clear_batch())
    }

    fn clear_warnings(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.clearWarnings", "clearWarnings")
            .track(|| self.inner.clear_warnings())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.close", "close")
            .track(|| self.inner.close())
    }

    fn close_on_completion(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.closeOnCompletion", "closeOnCompletion")
            .track(|| self.inner.close_on_completion())
    }

    fn execute(&mut self, sql: &str) -> Result<bool, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.execute", "execute", sql)
            .track(|| self.inner.execute(sql))
    }

    fn execute_with_generated_keys(
        &mut self,
        sql: &str,
        keys: AutoGeneratedKeys,
    ) -> Result<bool, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.execute", "execute", sql)
            .track(|| self.inner.execute_with_generated_keys(sql, keys))
    }

    fn execute_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[usize],
    ) -> Result<bool, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.execute", "execute", sql)
            .track(|| self.inner.execute_with_column_indexes(sql, column_indexes))
    }

    fn execute_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[&str],
    ) -> Result<bool, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.execute", "execute", sql)
            .track(|| self.inner.execute_with_column_names(sql, column_names))
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, Self::Error> {
        self.tracer
            .roundtrip("statement.executeBatch", "executeBatch")
            .track(|| self.inner.execute_batch())
    }

    fn execute_query(&mut self, sql: &str) -> Result<Self::ResultSet, Self::Error> {
        let result_set = self
            .tracer
            .annotated_roundtrip("statement.executeQuery", "executeQuery", sql)
            .track(|| self.inner.execute_query(sql))?;
        Ok(self.wrap_result_set(result_set))
    }

    fn execute_update(&mut self, sql: &str) -> Result<u64, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.executeUpdate", "executeUpdate", sql)
            .track(|| self.inner.execute_update(sql))
    }

    fn execute_update_with_generated_keys(
        &mut self,
        sql: &str,
        keys: AutoGeneratedKeys,
    ) -> Result<u64, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.executeUpdate", "executeUpdate", sql)
            .track(|| self.inner.execute_update_with_generated_keys(sql, keys))
    }

    fn execute_update_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[usize],
    ) -> Result<u64, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.executeUpdate", "executeUpdate", sql)
            .track(|| self.inner.execute_update_with_column_indexes(sql, column_indexes))
    }

    fn execute_update_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[&str],
    ) -> Result<u64, Self::Error> {
        self.tracer
            .annotated_roundtrip("statement.executeUpdate", "executeUpdate", sql)
            .track(|| self.inner.execute_update_with_column_names(sql, column_names))
    }

    // Metadata accessor, no roundtrip.
    fn connection(&self) -> Result<Self::Connection, Self::Error> {
        self.inner.connection()
    }

    fn fetch_direction(&self) -> Result<FetchDirection, Self::Error> {
        self.tracer
            .roundtrip("statement.getFetchDirection", "getFetchDirection")
            .track(|| self.inner.fetch_direction())
    }

    fn fetch_size(&self) -> Result<u32, Self::Error> {
        self.tracer
            .roundtrip("statement.getFetchSize", "getFetchSize")
            .track(|| self.inner.fetch_size())
    }

    fn generated_keys(&mut self) -> Result<Self::ResultSet, Self::Error> {
        let result_set = self
            .tracer
            .roundtrip("statement.getGeneratedKeys", "getGeneratedKeys")
            .track(|| self.inner.generated_keys())?;
        Ok(self.wrap_result_set(result_set))
    }

    fn max_field_size(&self) -> Result<u32, Self::Error> {
        self.tracer
            .roundtrip("statement.getMaxFieldSize", "getMaxFieldSize")
            .track(|| self.inner.max_field_size())
    }

    fn max_rows(&self) -> Result<u64, Self::Error> {
        self.tracer
            .roundtrip("statement.getMaxRows", "getMaxRows")
            .track(|| self.inner.max_rows())
    }

    fn more_results(&mut self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("statement.getMoreResults", "getMoreResults")
            .track(|| self.inner.more_results())
    }

    fn more_results_with(&mut self, current: CurrentResult) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("statement.getMoreResults", "getMoreResults")
            .track(|| self.inner.more_results_with(current))
    }

    fn query_timeout(&self) -> Result<Duration, Self::Error> {
        self.tracer
            .roundtrip("statement.getQueryTimeout", "getQueryTimeout")
            .track(|| self.inner.query_timeout())
    }

    fn result_set(&mut self) -> Result<Option<Self::ResultSet>, Self::Error> {
        let result_set = self
            .tracer
            .roundtrip("statement.getResultSet", "getResultSet")
            .track(|| self.inner.result_set())?;
        Ok(result_set.map(|result_set| self.wrap_result_set(result_set)))
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, Self::Error> {
        self.tracer
            .roundtrip("statement.getResultSetConcurrency", "getResultSetConcurrency")
            .track(|| self.inner.result_set_concurrency())
    }

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, Self::Error> {
        self.tracer
            .roundtrip("statement.getResultSetHoldability", "getResultSetHoldability")
            .track(|| self.inner.result_set_holdability())
    }

    fn result_set_type(&self) -> Result<ResultSetType, Self::Error> {
        self.tracer
            .roundtrip("statement.getResultSetType", "getResultSetType")
            .track(|| self.inner.result_set_type())
    }

    fn update_count(&self) -> Result<Option<u64>, Self::Error> {
        self.tracer
            .roundtrip("statement.getUpdateCount", "getUpdateCount")
            .track(|| self.inner.update_count())
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, Self::Error> {
        self.tracer
            .roundtrip("statement.getWarnings", "getWarnings")
            .track(|| self.inner.warnings())
    }

    fn is_closed(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("statement.isClosed", "isClosed")
            .track(|| self.inner.is_closed())
    }

    fn is_close_on_completion(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("statement.isCloseOnCompletion", "isCloseOnCompletion")
            .track(|| self.inner.is_close_on_completion())
    }

    fn is_poolable(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("statement.isPoolable", "isPoolable")
            .track(|| self.inner.is_poolable())
    }

    // Cursor names are identifiers, not query text; never annotated.
    fn set_cursor_name(&mut self, name: &str) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setCursorName", "setCursorName")
            .track(|| self.inner.set_cursor_name(name))
    }

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setEscapeProcessing", "setEscapeProcessing")
            .track(|| self.inner.set_escape_processing(enable))
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setFetchDirection", "setFetchDirection")
            .track(|| self.inner.set_fetch_direction(direction))
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setFetchSize", "setFetchSize")
            .track(|| self.inner.set_fetch_size(rows))
    }

    fn set_max_field_size(&mut self, max: u32) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setMaxFieldSize", "setMaxFieldSize")
            .track(|| self.inner.set_max_field_size(max))
    }

    fn set_max_rows(&mut self, max: u64) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setMaxRows", "setMaxRows")
            .track(|| self.inner.set_max_rows(max))
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setPoolable", "setPoolable")
            .track(|| self.inner.set_poolable(poolable))
    }

    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("statement.setQueryTimeout", "setQueryTimeout")
            .track(|| self.inner.set_query_timeout(timeout))
    }

    // Metadata accessor, no roundtrip.
    fn is_wrapper_for(&self, type_id: TypeId) -> Result<bool, Self::Error> {
        self.inner.is_wrapper_for(type_id)
    }
}

/// Extension trait for easy wrapping of statements.
pub trait StatementExt: Statement + Sized {
    /// Wrap this statement with tracing instrumentation.
    fn with_tracing(self) -> TracedStatement<Self> {
        TracedStatement::wrap(self)
    }

    /// Wrap this statement with custom tracing configuration.
    fn with_tracing_config(self, config: TracingConfig) -> TracedStatement<Self> {
        TracedStatement::with_config(self, config)
    }
}

impl<S: Statement> StatementExt for S {}
