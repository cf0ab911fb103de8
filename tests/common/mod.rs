//! Span capture and in-memory delegates shared by the integration tests.

#![allow(dead_code)]

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sea_orm::Value;
use statement_tracing::{
    AutoGeneratedKeys, Connection, CurrentResult, FetchDirection, ResultSet, ResultSetConcurrency,
    ResultSetHoldability, ResultSetType, Row, SqlWarning, Statement,
};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

// ---------------------------------------------------------------------------
// Span capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CapturedSpan {
    pub name: String,
    pub fields: HashMap<String, String>,
    pub events: Vec<CapturedEvent>,
    pub closed: usize,
}

impl CapturedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Short operation name.
    pub fn operation(&self) -> &str {
        self.field("otel.name").unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<&CapturedEvent> {
        self.events
            .iter()
            .filter(|event| event.level == Level::ERROR)
            .collect()
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct SpanIndex(usize);

#[derive(Clone, Default)]
struct CaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl CaptureLayer {
    fn index<S>(id: &Id, ctx: &Context<'_, S>) -> Option<usize>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let span = ctx.span(id)?;
        let extensions = span.extensions();
        extensions.get::<SpanIndex>().map(|index| index.0)
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut captured = CapturedSpan {
            name: attrs.metadata().name().to_string(),
            ..CapturedSpan::default()
        };
        attrs.record(&mut FieldVisitor(&mut captured.fields));

        let index = {
            let mut spans = self.spans.lock().unwrap();
            spans.push(captured);
            spans.len() - 1
        };
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanIndex(index));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(index) = Self::index(id, &ctx) {
            let mut spans = self.spans.lock().unwrap();
            values.record(&mut FieldVisitor(&mut spans[index].fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.event_span(event) else {
            return;
        };
        let Some(index) = Self::index(&span.id(), &ctx) else {
            return;
        };
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.spans.lock().unwrap()[index].events.push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(index) = Self::index(&id, &ctx) {
            self.spans.lock().unwrap()[index].closed += 1;
        }
    }
}

/// Run `f` with a capturing subscriber installed and return what it recorded.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedSpan>) {
    let layer = CaptureLayer::default();
    let spans = layer.spans.clone();
    let subscriber = tracing_subscriber::registry().with(layer);
    let output = tracing::subscriber::with_default(subscriber, f);
    let captured = spans.lock().unwrap().clone();
    (output, captured)
}

/// Only the roundtrip spans, in creation order.
pub fn roundtrips(spans: &[CapturedSpan]) -> Vec<&CapturedSpan> {
    spans
        .iter()
        .filter(|span| span.name == "db.roundtrip")
        .collect()
}

// ---------------------------------------------------------------------------
// Delegates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("socket closed by peer")]
pub struct SocketClosed;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StubError {
    #[error("query timed out after {0} seconds")]
    Timeout(u64),
    #[error("syntax error near {0:?}")]
    Syntax(String),
    #[error("lost connection to server")]
    Disconnected(#[source] SocketClosed),
}

/// Shared log of delegate calls, by method name.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Default)]
pub struct StubStatement {
    pub calls: CallLog,
    pub failures: HashMap<&'static str, StubError>,
    pub panics_on: Option<&'static str>,
    pub query_rows: Vec<Row>,
    pub batch: Vec<String>,
    pub fetch_size: u32,
    pub max_rows: u64,
    pub query_timeout: Duration,
    pub poolable: bool,
    pub closed: bool,
    pub close_count: usize,
}

impl StubStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning_rows(mut self, rows: Vec<Row>) -> Self {
        self.query_rows = rows;
        self
    }

    pub fn failing(mut self, op: &'static str, error: StubError) -> Self {
        self.failures.insert(op, error);
        self
    }

    pub fn panicking(mut self, op: &'static str) -> Self {
        self.panics_on = Some(op);
        self
    }

    fn call(&self, op: &'static str) -> Result<(), StubError> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.panics_on == Some(op) {
            panic!("driver bug in {op}");
        }
        match self.failures.get(op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn fresh_result_set(&self) -> StubResultSet {
        StubResultSet::new(self.query_rows.clone())
    }
}

impl Statement for StubStatement {
    type Error = StubError;
    type ResultSet = StubResultSet;
    type Connection = String;

    fn add_batch(&mut self, sql: &str) -> Result<(), StubError> {
        // Side effect happens before any failure is reported.
        self.batch.push(sql.to_string());
        self.call("add_batch")
    }

    fn cancel(&self) -> Result<(), StubError> {
        self.call("cancel")
    }

    fn clear_batch(&mut self) -> Result<(), StubError> {
        self.call("clear_batch")?;
        self.batch.clear();
        Ok(())
    }

    fn clear_warnings(&mut self) -> Result<(), StubError> {
        self.call("clear_warnings")
    }

    fn close(&mut self) -> Result<(), StubError> {
        self.close_count += 1;
        self.closed = true;
        self.call("close")
    }

    fn close_on_completion(&mut self) -> Result<(), StubError> {
        self.call("close_on_completion")
    }

    fn execute(&mut self, _sql: &str) -> Result<bool, StubError> {
        self.call("execute")?;
        Ok(!self.query_rows.is_empty())
    }

    fn execute_with_generated_keys(
        &mut self,
        _sql: &str,
        _keys: AutoGeneratedKeys,
    ) -> Result<bool, StubError> {
        self.call("execute_with_generated_keys")?;
        Ok(false)
    }

    fn execute_with_column_indexes(
        &mut self,
        _sql: &str,
        _column_indexes: &[usize],
    ) -> Result<bool, StubError> {
        self.call("execute_with_column_indexes")?;
        Ok(false)
    }

    fn execute_with_column_names(
        &mut self,
        _sql: &str,
        _column_names: &[&str],
    ) -> Result<bool, StubError> {
        self.call("execute_with_column_names")?;
        Ok(false)
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, StubError> {
        self.call("execute_batch")?;
        Ok(std::mem::take(&mut self.batch).iter().map(|_| 1).collect())
    }

    fn execute_query(&mut self, _sql: &str) -> Result<StubResultSet, StubError> {
        self.call("execute_query")?;
        Ok(self.fresh_result_set())
    }

    fn execute_update(&mut self, _sql: &str) -> Result<u64, StubError> {
        self.call("execute_update")?;
        Ok(3)
    }

    fn execute_update_with_generated_keys(
        &mut self,
        _sql: &str,
        _keys: AutoGeneratedKeys,
    ) -> Result<u64, StubError> {
        self.call("execute_update_with_generated_keys")?;
        Ok(1)
    }

    fn execute_update_with_column_indexes(
        &mut self,
        _sql: &str,
        column_indexes: &[usize],
    ) -> Result<u64, StubError> {
        self.call("execute_update_with_column_indexes")?;
        Ok(column_indexes.len() as u64)
    }

    fn execute_update_with_column_names(
        &mut self,
        _sql: &str,
        column_names: &[&str],
    ) -> Result<u64, StubError> {
        self.call("execute_update_with_column_names")?;
        Ok(column_names.len() as u64)
    }

    fn connection(&self) -> Result<String, StubError> {
        self.call("connection")?;
        Ok("stub-connection".to_string())
    }

    fn fetch_direction(&self) -> Result<FetchDirection, StubError> {
        self.call("fetch_direction")?;
        Ok(FetchDirection::Forward)
    }

    fn fetch_size(&self) -> Result<u32, StubError> {
        self.call("fetch_size")?;
        Ok(self.fetch_size)
    }

    fn generated_keys(&mut self) -> Result<StubResultSet, StubError> {
        self.call("generated_keys")?;
        Ok(StubResultSet::new(vec![vec![Value::from(42i64)]]))
    }

    fn max_field_size(&self) -> Result<u32, StubError> {
        self.call("max_field_size")?;
        Ok(0)
    }

    fn max_rows(&self) -> Result<u64, StubError> {
        self.call("max_rows")?;
        Ok(self.max_rows)
    }

    fn more_results(&mut self) -> Result<bool, StubError> {
        self.call("more_results")?;
        Ok(false)
    }

    fn more_results_with(&mut self, _current: CurrentResult) -> Result<bool, StubError> {
        self.call("more_results_with")?;
        Ok(false)
    }

    fn query_timeout(&self) -> Result<Duration, StubError> {
        self.call("query_timeout")?;
        Ok(self.query_timeout)
    }

    fn result_set(&mut self) -> Result<Option<StubResultSet>, StubError> {
        self.call("result_set")?;
        Ok((!self.query_rows.is_empty()).then(|| self.fresh_result_set()))
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StubError> {
        self.call("result_set_concurrency")?;
        Ok(ResultSetConcurrency::ReadOnly)
    }

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, StubError> {
        self.call("result_set_holdability")?;
        Ok(ResultSetHoldability::CloseCursorsAtCommit)
    }

    fn result_set_type(&self) -> Result<ResultSetType, StubError> {
        self.call("result_set_type")?;
        Ok(ResultSetType::ForwardOnly)
    }

    fn update_count(&self) -> Result<Option<u64>, StubError> {
        self.call("update_count")?;
        Ok(None)
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, StubError> {
        self.call("warnings")?;
        Ok(vec![SqlWarning::new("value truncated").with_sql_state("01004")])
    }

    fn is_closed(&self) -> Result<bool, StubError> {
        self.call("is_closed")?;
        Ok(self.closed)
    }

    fn is_close_on_completion(&self) -> Result<bool, StubError> {
        self.call("is_close_on_completion")?;
        Ok(false)
    }

    fn is_poolable(&self) -> Result<bool, StubError> {
        self.call("is_poolable")?;
        Ok(self.poolable)
    }

    fn set_cursor_name(&mut self, _name: &str) -> Result<(), StubError> {
        self.call("set_cursor_name")
    }

    fn set_escape_processing(&mut self, _enable: bool) -> Result<(), StubError> {
        self.call("set_escape_processing")
    }

    fn set_fetch_direction(&mut self, _direction: FetchDirection) -> Result<(), StubError> {
        self.call("set_fetch_direction")
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StubError> {
        self.call("set_fetch_size")?;
        self.fetch_size = rows;
        Ok(())
    }

    fn set_max_field_size(&mut self, _max: u32) -> Result<(), StubError> {
        self.call("set_max_field_size")
    }

    fn set_max_rows(&mut self, max: u64) -> Result<(), StubError> {
        self.call("set_max_rows")?;
        self.max_rows = max;
        Ok(())
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StubError> {
        self.call("set_poolable")?;
        self.poolable = poolable;
        Ok(())
    }

    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), StubError> {
        self.call("set_query_timeout")?;
        self.query_timeout = timeout;
        Ok(())
    }

    fn is_wrapper_for(&self, type_id: TypeId) -> Result<bool, StubError> {
        self.call("is_wrapper_for")?;
        Ok(type_id == TypeId::of::<StubStatement>())
    }
}

#[derive(Debug, Default)]
pub struct StubResultSet {
    pub rows: VecDeque<Row>,
    pub closed: bool,
}

impl StubResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
            closed: false,
        }
    }
}

impl ResultSet for StubResultSet {
    type Error = StubError;

    fn next_row(&mut self) -> Result<Option<Row>, StubError> {
        if self.closed {
            return Err(StubError::Disconnected(SocketClosed));
        }
        Ok(self.rows.pop_front())
    }

    fn column_count(&self) -> Result<usize, StubError> {
        Ok(self.rows.front().map_or(0, Vec::len))
    }

    fn column_name(&self, index: usize) -> Result<String, StubError> {
        Ok(format!("col{index}"))
    }

    fn fetch_size(&self) -> Result<u32, StubError> {
        Ok(0)
    }

    fn set_fetch_size(&mut self, _rows: u32) -> Result<(), StubError> {
        Ok(())
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, StubError> {
        Ok(Vec::new())
    }

    fn clear_warnings(&mut self) -> Result<(), StubError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StubError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StubError> {
        Ok(self.closed)
    }
}

#[derive(Debug, Default)]
pub struct StubConnection {
    pub calls: CallLog,
    pub failures: HashMap<&'static str, StubError>,
    pub auto_commit: bool,
    pub closed: bool,
    pub query_rows: Vec<Row>,
}

impl StubConnection {
    fn call(&self, op: &'static str) -> Result<(), StubError> {
        self.calls.lock().unwrap().push(op.to_string());
        match self.failures.get(op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Connection for StubConnection {
    type Error = StubError;
    type Statement = StubStatement;

    fn create_statement(&mut self) -> Result<StubStatement, StubError> {
        self.call("create_statement")?;
        Ok(StubStatement {
            calls: self.calls.clone(),
            query_rows: self.query_rows.clone(),
            ..StubStatement::default()
        })
    }

    fn commit(&mut self) -> Result<(), StubError> {
        self.call("commit")
    }

    fn rollback(&mut self) -> Result<(), StubError> {
        self.call("rollback")
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), StubError> {
        self.call("set_auto_commit")?;
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> Result<bool, StubError> {
        self.call("auto_commit")?;
        Ok(self.auto_commit)
    }

    fn is_valid(&self, _timeout: Duration) -> Result<bool, StubError> {
        self.call("is_valid")?;
        Ok(!self.closed)
    }

    fn native_sql(&self, sql: &str) -> Result<String, StubError> {
        self.call("native_sql")?;
        Ok(sql.replace('?', "$1"))
    }

    fn close(&mut self) -> Result<(), StubError> {
        self.call("close")?;
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StubError> {
        self.call("is_closed")?;
        Ok(self.closed)
    }
}

pub fn one_row() -> Vec<Row> {
    vec![vec![Value::from(1)]]
}
