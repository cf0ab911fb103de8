//! Traced connection wrapper.

use std::error::Error;
use std::time::Duration;

use crate::config::{TraceOption, TracingConfig};
use crate::observability::Instrumentation;
use crate::statement::{Statement, TracedStatement};

/// A blocking database connection that hands out statements.
pub trait Connection {
    type Error: Error;
    type Statement: Statement<Error = Self::Error>;

    fn create_statement(&mut self) -> Result<Self::Statement, Self::Error>;

    fn commit(&mut self) -> Result<(), Self::Error>;

    fn rollback(&mut self) -> Result<(), Self::Error>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), Self::Error>;

    fn auto_commit(&self) -> Result<bool, Self::Error>;

    /// Check the connection is still usable, waiting at most `timeout`.
    fn is_valid(&self, timeout: Duration) -> Result<bool, Self::Error>;

    /// Translate `sql` into the database's native grammar without running it.
    fn native_sql(&self, sql: &str) -> Result<String, Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;

    fn is_closed(&self) -> Result<bool, Self::Error>;
}

/// A traced wrapper around any [`Connection`].
///
/// Statements created through it come back as [`TracedStatement`]s sharing
/// this connection's configuration, so everything they produce is traced too.
///
/// # Span Nesting
///
/// Roundtrip spans are children of whatever span is current when the call is
/// made. Run request handlers inside a request span and the database work
/// shows up nested under it.
///
/// # Example
///
/// ```rust,ignore
/// use statement_tracing::{TracingConfig, TracingExt};
///
/// let mut conn = driver_conn.with_tracing_config(TracingConfig::development());
/// let mut stmt = conn.create_statement()?;
/// stmt.execute_update("DELETE FROM sessions WHERE expired")?;
/// conn.commit()?;
/// ```
#[derive(Debug)]
pub struct TracedConnection<C> {
    inner: C,
    tracer: Instrumentation,
}

impl<C: Connection> TracedConnection<C> {
    /// Wrap `connection`, capturing `options` for its whole lifetime.
    pub fn new(connection: C, options: &[TraceOption]) -> Self {
        Self::with_config(connection, TracingConfig::from(options))
    }

    /// Wrap `connection` with a full tracing configuration.
    pub fn with_config(connection: C, config: TracingConfig) -> Self {
        Self {
            inner: connection,
            tracer: Instrumentation::new(config),
        }
    }

    /// Wrap `connection` with default configuration.
    pub fn wrap(connection: C) -> Self {
        Self::with_config(connection, TracingConfig::default())
    }

    /// Get a reference to the underlying connection.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Consume the wrapper and return the underlying connection.
    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn config(&self) -> &TracingConfig {
        self.tracer.config()
    }
}

impl<C> AsRef<C> for TracedConnection<C> {
    fn as_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> Connection for TracedConnection<C> {
    type Error = C::Error;
    type Statement = TracedStatement<C::Statement>;

    fn create_statement(&mut self) -> Result<Self::Statement, Self::Error> {
        let statement = self
            .tracer
            .roundtrip("connection.createStatement", "createStatement")
            .track(|| self.inner.create_statement())?;
        Ok(TracedStatement::from_parts(statement, self.tracer.clone()))
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("connection.commit", "commit")
            .track(|| self.inner.commit())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("connection.rollback", "rollback")
            .track(|| self.inner.rollback())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("connection.setAutoCommit", "setAutoCommit")
            .track(|| self.inner.set_auto_commit(auto_commit))
    }

    fn auto_commit(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("connection.getAutoCommit", "getAutoCommit")
            .track(|| self.inner.auto_commit())
    }

    fn is_valid(&self, timeout: Duration) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("connection.isValid", "isValid")
            .track(|| self.inner.is_valid(timeout))
    }

    fn native_sql(&self, sql: &str) -> Result<String, Self::Error> {
        self.tracer
            .annotated_roundtrip("connection.nativeSQL", "nativeSQL", sql)
            .track(|| self.inner.native_sql(sql))
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.tracer
            .roundtrip("connection.close", "close")
            .track(|| self.inner.close())
    }

    fn is_closed(&self) -> Result<bool, Self::Error> {
        self.tracer
            .roundtrip("connection.isClosed", "isClosed")
            .track(|| self.inner.is_closed())
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait TracingExt: Connection + Sized {
    /// Wrap this connection with tracing instrumentation.
    fn with_tracing(self) -> TracedConnection<Self> {
        TracedConnection::wrap(self)
    }

    /// Wrap this connection with custom tracing configuration.
    fn with_tracing_config(self, config: TracingConfig) -> TracedConnection<Self> {
        TracedConnection::with_config(self, config)
    }
}

impl<C: Connection> TracingExt for C {}
