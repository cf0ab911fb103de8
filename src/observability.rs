//! Roundtrip spans and the functions that create them.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{field, Span};

use crate::config::{TraceOption, TracingConfig};
use crate::parser::QueryLabel;

/// Returns `true` when `options` ask for query text on spans.
pub fn should_annotate_spans_with_sql(options: &[TraceOption]) -> bool {
    options.contains(&TraceOption::AnnotateSpansWithSql)
}

/// Start a span for an operation that carries no query text.
pub fn create_roundtrip_tracking_span(full_name: &str, short_name: &str) -> RoundtripTrackingSpan {
    RoundtripTrackingSpan::start(full_name, short_name, false, "")
}

/// Start a span for an operation that takes query text.
///
/// `sql` is recorded as `db.statement` only when `annotate` is set and `sql`
/// is non-empty.
pub fn create_annotated_roundtrip_tracking_span(
    full_name: &str,
    short_name: &str,
    annotate: bool,
    sql: &str,
) -> RoundtripTrackingSpan {
    RoundtripTrackingSpan::start(full_name, short_name, annotate, sql)
}

/// A span covering exactly one call into a wrapped delegate.
///
/// The span is closed by [`close`](Self::close) or, failing that, when the
/// value is dropped. Closing more than once has no effect, so the span is
/// reported closed exactly once on every exit path, including unwinding.
///
/// ```rust
/// use statement_tracing::observability::create_roundtrip_tracking_span;
///
/// let span = create_roundtrip_tracking_span("statement.cancel", "cancel");
/// let result: Result<(), std::fmt::Error> = span.track(|| Ok(()));
/// assert!(result.is_ok());
/// ```
#[derive(Debug)]
pub struct RoundtripTrackingSpan {
    span: Span,
    started: Instant,
    slow_threshold: Option<Duration>,
    failed: bool,
    closed: bool,
}

impl RoundtripTrackingSpan {
    /// Start a new span as a child of the current span context.
    pub fn start(full_name: &str, short_name: &str, annotate: bool, sql: &str) -> Self {
        let span = tracing::info_span!(
            "db.roundtrip",
            otel.name = %short_name,
            otel.kind = "client",
            code.function = %full_name,
            db.system = field::Empty,
            db.name = field::Empty,
            db.statement = field::Empty,
            db.operation = field::Empty,
            db.sql.table = field::Empty,
            db.duration_ms = field::Empty,
            otel.status_code = field::Empty,
            error.message = field::Empty,
            slow_roundtrip = field::Empty,
        );

        // Labels are derived from the query only when someone will see them.
        if annotate && !sql.is_empty() && !span.is_disabled() {
            let label = QueryLabel::of(sql);
            span.record("db.statement", sql);
            span.record("db.operation", label.kind.as_str());
            if let Some(table) = &label.table {
                span.record("db.sql.table", table.as_str());
            }
        }

        Self {
            span,
            started: Instant::now(),
            slow_threshold: None,
            failed: false,
            closed: false,
        }
    }

    /// Record database identity and the slow roundtrip threshold from `config`.
    pub fn with_config(mut self, config: &TracingConfig) -> Self {
        if let Some(system) = config.db_system_name() {
            self.span.record("db.system", system);
        }
        if let Some(name) = &config.database_name {
            self.span.record("db.name", name.as_str());
        }
        self.slow_threshold = config.slow_roundtrip_threshold;
        self
    }

    /// The underlying tracing span. Disabled once the roundtrip is closed.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Attach `error` to the span as its terminal failure.
    ///
    /// Only the first failure is kept. Ignored after close.
    pub fn record_exception<E: Error + ?Sized>(&mut self, error: &E) {
        if self.closed || self.failed {
            return;
        }
        self.failed = true;

        let message = error.to_string();
        self.span.record("otel.status_code", "ERROR");
        self.span.record("error.message", message.as_str());

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        if causes.is_empty() {
            tracing::error!(parent: &self.span, error = %message, "Roundtrip failed");
        } else {
            tracing::error!(
                parent: &self.span,
                error = %message,
                caused_by = %causes.join(": "),
                "Roundtrip failed"
            );
        }
    }

    /// Finish the span. Only the first call has any effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let elapsed = self.started.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        self.span.record("db.duration_ms", duration_ms);

        if let Some(threshold) = self.slow_threshold {
            if elapsed > threshold {
                self.span.record("slow_roundtrip", true);
                tracing::warn!(
                    parent: &self.span,
                    duration_ms = duration_ms,
                    threshold_ms = threshold.as_millis() as i64,
                    "Slow roundtrip detected"
                );
            }
        }

        if !self.failed {
            self.span.record("otel.status_code", "OK");
        }

        // Dropping the only handle is what closes the span in the subscriber.
        drop(std::mem::replace(&mut self.span, Span::none()));
    }

    /// Run `op` inside the span, record its failure if any, and close the span.
    ///
    /// The result is returned exactly as `op` produced it.
    pub fn track<T, E, F>(mut self, op: F) -> Result<T, E>
    where
        E: Error,
        F: FnOnce() -> Result<T, E>,
    {
        let result = {
            let _entered = self.span.enter();
            op()
        };
        if let Err(error) = &result {
            self.record_exception(error);
        }
        self.close();
        result
    }
}

impl Drop for RoundtripTrackingSpan {
    fn drop(&mut self) {
        self.close();
    }
}

/// Construction-time tracing state shared by a wrapper and everything it
/// produces.
#[derive(Debug, Clone)]
pub(crate) struct Instrumentation {
    config: Arc<TracingConfig>,
    annotate: bool,
}

impl Instrumentation {
    pub(crate) fn new(config: TracingConfig) -> Self {
        let annotate = should_annotate_spans_with_sql(&config.options);
        Self {
            config: Arc::new(config),
            annotate,
        }
    }

    pub(crate) fn config(&self) -> &TracingConfig {
        &self.config
    }

    pub(crate) fn annotates(&self) -> bool {
        self.annotate
    }

    pub(crate) fn roundtrip(&self, full_name: &str, short_name: &str) -> RoundtripTrackingSpan {
        create_roundtrip_tracking_span(full_name, short_name).with_config(&self.config)
    }

    pub(crate) fn annotated_roundtrip(
        &self,
        full_name: &str,
        short_name: &str,
        sql: &str,
    ) -> RoundtripTrackingSpan {
        create_annotated_roundtrip_tracking_span(full_name, short_name, self.annotate, sql)
            .with_config(&self.config)
    }
}
