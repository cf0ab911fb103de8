//! # statement-tracing
//!
//! Tracing instrumentation for blocking statement, result set and connection
//! interfaces.
//!
//! Wrap a driver's statement (or the connection that creates it) and every call
//! through it becomes a `db.roundtrip` span recording latency and outcome, and
//! optionally the query text. Failures are recorded on the span and handed back
//! to the caller exactly as the driver produced them.
//!
//! ## Features
//!
//! - **Transparent**: wrappers implement the same traits as what they wrap
//! - **Exactly one span per roundtrip**: closed on success, failure and unwinding
//! - **Recursive**: result sets and statements produced by a wrapper are wrapped too
//! - **Opt-in SQL Visibility**: query text is only recorded with
//!   [`TraceOption::AnnotateSpansWithSql`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use statement_tracing::{StatementExt, Statement};
//!
//! let mut stmt = driver_stmt.with_tracing();
//! let rows = stmt.execute_query("SELECT id FROM users")?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use statement_tracing::{TraceOption, TracedStatement, TracingConfig};
//!
//! // Options only
//! let stmt = TracedStatement::new(driver_stmt, &[TraceOption::AnnotateSpansWithSql]);
//!
//! // Full configuration
//! let config = TracingConfig::default()
//!     .with_sql_annotation(true)
//!     .with_db_system(sea_orm::DbBackend::Postgres)
//!     .with_slow_roundtrip_threshold(Duration::from_millis(100));
//! let stmt = TracedStatement::with_config(driver_stmt, config);
//! ```
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `otel.name` | Short operation name (`executeQuery`, `cancel`, ...) |
//! | `code.function` | Fully-qualified operation name (`statement.executeQuery`) |
//! | `db.system` | "postgresql", "mysql" or "sqlite" (when configured) |
//! | `db.name` | Database name (when configured) |
//! | `db.statement` | Query text (when annotating) |
//! | `db.operation` | Leading keyword of the query (when annotating) |
//! | `db.sql.table` | Target table (when annotating and detectable) |
//! | `db.duration_ms` | Roundtrip duration |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |
//! | `slow_roundtrip` | Set when the slow roundtrip threshold is exceeded |

mod config;
mod connection;
pub mod observability;
mod parser;
mod result_set;
mod statement;
mod types;

pub use config::{TraceOption, TracingConfig};
pub use connection::{Connection, TracedConnection, TracingExt};
pub use observability::RoundtripTrackingSpan;
pub use result_set::{ResultSet, Rows, TracedResultSet};
pub use statement::{Statement, StatementExt, TracedStatement};
pub use types::{
    AutoGeneratedKeys, CurrentResult, FetchDirection, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType, Row, SqlWarning,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Connection, ResultSet, Statement, StatementExt, TraceOption, TracedConnection,
        TracedResultSet, TracedStatement, TracingConfig, TracingExt,
    };
}
