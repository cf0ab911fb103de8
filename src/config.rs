//! Configuration for tracing behavior.

use std::time::Duration;

use sea_orm::DbBackend;

/// Options captured once when a wrapper is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TraceOption {
    /// Record the literal query text on spans of operations that take one.
    ///
    /// **Security Warning**: query text may carry credentials or PII.
    AnnotateSpansWithSql,
}

/// Configuration options for roundtrip tracing.
///
/// # Example
///
/// ```rust
/// use statement_tracing::{TraceOption, TracingConfig};
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_option(TraceOption::AnnotateSpansWithSql)
///     .with_slow_roundtrip_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Trace options, in the order they were supplied.
    /// Default: empty (no query text on spans)
    pub options: Vec<TraceOption>,

    /// Database system recorded as `db.system`.
    /// Default: `None`
    pub db_system: Option<DbBackend>,

    /// Custom database name to include in spans (useful for multi-database setups).
    /// Default: `None`
    pub database_name: Option<String>,

    /// Roundtrips exceeding this duration are flagged and logged at WARN level.
    /// Default: `None` (no slow roundtrip detection)
    pub slow_roundtrip_threshold: Option<Duration>,
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trace option.
    pub fn with_option(mut self, option: TraceOption) -> Self {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
        self
    }

    /// Enable or disable query text annotation.
    pub fn with_sql_annotation(mut self, enabled: bool) -> Self {
        self.options
            .retain(|option| *option != TraceOption::AnnotateSpansWithSql);
        if enabled {
            self.options.push(TraceOption::AnnotateSpansWithSql);
        }
        self
    }

    /// Set the database system recorded on every span.
    pub fn with_db_system(mut self, backend: DbBackend) -> Self {
        self.db_system = Some(backend);
        self
    }

    /// Set a database name to include in spans.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Set the threshold for slow roundtrip warnings.
    pub fn with_slow_roundtrip_threshold(mut self, threshold: Duration) -> Self {
        self.slow_roundtrip_threshold = Some(threshold);
        self
    }

    /// Create a development-friendly configuration with query text annotation.
    ///
    /// **Warning**: Do not use in production as it records all SQL.
    pub fn development() -> Self {
        Self {
            options: vec![TraceOption::AnnotateSpansWithSql],
            slow_roundtrip_threshold: Some(Duration::from_millis(100)),
            ..Self::default()
        }
    }

    /// Create a production-safe configuration with minimal overhead.
    pub fn production() -> Self {
        Self {
            slow_roundtrip_threshold: Some(Duration::from_secs(1)),
            ..Self::default()
        }
    }

    /// Value recorded as `db.system`.
    pub(crate) fn db_system_name(&self) -> Option<&'static str> {
        self.db_system.map(|backend| match backend {
            DbBackend::Postgres => "postgresql",
            DbBackend::MySql => "mysql",
            DbBackend::Sqlite => "sqlite",
        })
    }
}

impl From<&[TraceOption]> for TracingConfig {
    fn from(options: &[TraceOption]) -> Self {
        Self {
            options: options.to_vec(),
            ..Self::default()
        }
    }
}

impl From<Vec<TraceOption>> for TracingConfig {
    fn from(options: Vec<TraceOption>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}
