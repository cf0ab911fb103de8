//! Basic example showing how to use statement-tracing.
//!
//! Run with: cargo run --example basic

use std::any::TypeId;
use std::collections::VecDeque;
use std::time::Duration;

use sea_orm::{DbBackend, Value};
use statement_tracing::prelude::*;
use statement_tracing::{
    AutoGeneratedKeys, CurrentResult, FetchDirection, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType, Row, SqlWarning,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
enum MemoryError {
    #[error("permission denied for {0:?}")]
    Denied(String),
}

/// A statement over a fixed in-memory table of users.
#[derive(Default)]
struct MemoryStatement {
    users: Vec<(i32, &'static str)>,
    batch: Vec<String>,
    fetch_size: u32,
    max_rows: u64,
    timeout: Duration,
    closed: bool,
}

struct MemoryRows(VecDeque<Row>);

impl ResultSet for MemoryRows {
    type Error = MemoryError;

    fn next_row(&mut self) -> Result<Option<Row>, MemoryError> {
        Ok(self.0.pop_front())
    }
    fn column_count(&self) -> Result<usize, MemoryError> {
        Ok(2)
    }
    fn column_name(&self, index: usize) -> Result<String, MemoryError> {
        Ok(["id", "name"].get(index).unwrap_or(&"?").to_string())
    }
    fn fetch_size(&self) -> Result<u32, MemoryError> {
        Ok(0)
    }
    fn set_fetch_size(&mut self, _rows: u32) -> Result<(), MemoryError> {
        Ok(())
    }
    fn warnings(&self) -> Result<Vec<SqlWarning>, MemoryError> {
        Ok(Vec::new())
    }
    fn clear_warnings(&mut self) -> Result<(), MemoryError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), MemoryError> {
        self.0.clear();
        Ok(())
    }
    fn is_closed(&self) -> Result<bool, MemoryError> {
        Ok(self.0.is_empty())
    }
}

impl MemoryStatement {
    fn check(&self, sql: &str) -> Result<(), MemoryError> {
        if sql.trim_start().to_ascii_uppercase().starts_with("DROP") {
            return Err(MemoryError::Denied(sql.to_string()));
        }
        Ok(())
    }

    fn rows(&self) -> MemoryRows {
        MemoryRows(
            self.users
                .iter()
                .map(|(id, name)| vec![Value::from(*id), Value::from(*name)])
                .collect(),
        )
    }
}

impl Statement for MemoryStatement {
    type Error = MemoryError;
    type ResultSet = MemoryRows;
    type Connection = &'static str;

    fn add_batch(&mut self, sql: &str) -> Result<(), MemoryError> {
        self.batch.push(sql.to_string());
        Ok(())
    }
    fn cancel(&self) -> Result<(), MemoryError> {
        Ok(())
    }
    fn clear_batch(&mut self) -> Result<(), MemoryError> {
        self.batch.clear();
        Ok(())
    }
    fn clear_warnings(&mut self) -> Result<(), MemoryError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), MemoryError> {
        self.closed = true;
        Ok(())
    }
    fn close_on_completion(&mut self) -> Result<(), MemoryError> {
        Ok(())
    }
    fn execute(&mut self, sql: &str) -> Result<bool, MemoryError> {
        self.check(sql).map(|_| true)
    }
    fn execute_with_generated_keys(
        &mut self,
        sql: &str,
        _keys: AutoGeneratedKeys,
    ) -> Result<bool, MemoryError> {
        self.execute(sql)
    }
    fn execute_with_column_indexes(
        &mut self,
        sql: &str,
        _column_indexes: &[usize],
    ) -> Result<bool, MemoryError> {
        self.execute(sql)
    }
    fn execute_with_column_names(
        &mut self,
        sql: &str,
        _column_names: &[&str],
    ) -> Result<bool, MemoryError> {
        self.execute(sql)
    }
    fn execute_batch(&mut self) -> Result<Vec<i64>, MemoryError> {
        Ok(self.batch.drain(..).map(|_| 1).collect())
    }
    fn execute_query(&mut self, sql: &str) -> Result<MemoryRows, MemoryError> {
        self.check(sql)?;
        Ok(self.rows())
    }
    fn execute_update(&mut self, sql: &str) -> Result<u64, MemoryError> {
        self.check(sql).map(|_| 1)
    }
    fn execute_update_with_generated_keys(
        &mut self,
        sql: &str,
        _keys: AutoGeneratedKeys,
    ) -> Result<u64, MemoryError> {
        self.execute_update(sql)
    }
    fn execute_update_with_column_indexes(
        &mut self,
        sql: &str,
        _column_indexes: &[usize],
    ) -> Result<u64, MemoryError> {
        self.execute_update(sql)
    }
    fn execute_update_with_column_names(
        &mut self,
        sql: &str,
        _column_names: &[&str],
    ) -> Result<u64, MemoryError> {
        self.execute_update(sql)
    }
    fn connection(&self) -> Result<&'static str, MemoryError> {
        Ok("memory")
    }
    fn fetch_direction(&self) -> Result<FetchDirection, MemoryError> {
        Ok(FetchDirection::Forward)
    }
    fn fetch_size(&self) -> Result<u32, MemoryError> {
        Ok(self.fetch_size)
    }
    fn generated_keys(&mut self) -> Result<MemoryRows, MemoryError> {
        Ok(MemoryRows(VecDeque::new()))
    }
    fn max_field_size(&self) -> Result<u32, MemoryError> {
        Ok(0)
    }
    fn max_rows(&self) -> Result<u64, MemoryError> {
        Ok(self.max_rows)
    }
    fn more_results(&mut self) -> Result<bool, MemoryError> {
        Ok(false)
    }
    fn more_results_with(&mut self, _current: CurrentResult) -> Result<bool, MemoryError> {
        Ok(false)
    }
    fn query_timeout(&self) -> Result<Duration, MemoryError> {
        Ok(self.timeout)
    }
    fn result_set(&mut self) -> Result<Option<MemoryRows>, MemoryError> {
        Ok(None)
    }
    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, MemoryError> {
        Ok(ResultSetConcurrency::ReadOnly)
    }
    fn result_set_holdability(&self) -> Result<ResultSetHoldability, MemoryError> {
        Ok(ResultSetHoldability::CloseCursorsAtCommit)
    }
    fn result_set_type(&self) -> Result<ResultSetType, MemoryError> {
        Ok(ResultSetType::ForwardOnly)
    }
    fn update_count(&self) -> Result<Option<u64>, MemoryError> {
        Ok(None)
    }
    fn warnings(&self) -> Result<Vec<SqlWarning>, MemoryError> {
        Ok(Vec::new())
    }
    fn is_closed(&self) -> Result<bool, MemoryError> {
        Ok(self.closed)
    }
    fn is_close_on_completion(&self) -> Result<bool, MemoryError> {
        Ok(false)
    }
    fn is_poolable(&self) -> Result<bool, MemoryError> {
        Ok(false)
    }
    fn set_cursor_name(&mut self, _name: &str) -> Result<(), MemoryError> {
        Ok(())
    }
    fn set_escape_processing(&mut self, _enable: bool) -> Result<(), MemoryError> {
        Ok(())
    }
    fn set_fetch_direction(&mut self, _direction: FetchDirection) -> Result<(), MemoryError> {
        Ok(())
    }
    fn set_fetch_size(&mut self, rows: u32) -> Result<(), MemoryError> {
        self.fetch_size = rows;
        Ok(())
    }
    fn set_max_field_size(&mut self, _max: u32) -> Result<(), MemoryError> {
        Ok(())
    }
    fn set_max_rows(&mut self, max: u64) -> Result<(), MemoryError> {
        self.max_rows = max;
        Ok(())
    }
    fn set_poolable(&mut self, _poolable: bool) -> Result<(), MemoryError> {
        Ok(())
    }
    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), MemoryError> {
        self.timeout = timeout;
        Ok(())
    }
    fn is_wrapper_for(&self, type_id: TypeId) -> Result<bool, MemoryError> {
        Ok(type_id == TypeId::of::<MemoryStatement>())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_span_events(
            tracing_subscriber::fmt::format::FmtSpan::CLOSE,
        ))
        .init();

    let statement = MemoryStatement {
        users: vec![(1, "ada"), (2, "grace")],
        ..MemoryStatement::default()
    };

    // Option 1: Options only
    // let mut stmt = TracedStatement::new(statement, &[TraceOption::AnnotateSpansWithSql]);

    // Option 2: Using the extension trait
    // let mut stmt = statement.with_tracing();

    // Option 3: With custom configuration
    let mut stmt = statement.with_tracing_config(
        TracingConfig::development()
            .with_db_system(DbBackend::Sqlite)
            .with_database_name("memory"),
    );

    stmt.set_query_timeout(Duration::from_secs(5))?;

    let _request = tracing::info_span!("request", path = "/users").entered();

    let mut users = stmt.execute_query("SELECT id, name FROM users")?;
    for row in users.rows() {
        let row = row?;
        tracing::info!(row = ?row, "fetched");
    }
    users.close()?;

    // Failures come back unchanged; the span records them.
    if let Err(error) = stmt.execute_update("DROP TABLE users") {
        tracing::info!(%error, "update refused");
    }

    stmt.close()?;
    Ok(())
}
