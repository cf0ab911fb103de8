//! Value types shared by the statement, result set and connection interfaces.

use std::fmt;

/// One row of a result set, in column order.
pub type Row = Vec<sea_orm::Value>;

/// Direction in which rows of a result set are expected to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

/// Whether auto-generated keys are made available through `generated_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoGeneratedKeys {
    Return,
    NoReturn,
}

/// What happens to the current result set when moving to the next result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentResult {
    Close,
    Keep,
    CloseAll,
}

/// Scrollability and sensitivity of result sets a statement produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Whether result sets stay open across a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetHoldability {
    HoldCursorsOverCommit,
    #[default]
    CloseCursorsAtCommit,
}

/// A warning reported by the database alongside a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlWarning {
    pub message: String,
    pub sql_state: Option<String>,
    pub vendor_code: i32,
}

impl SqlWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
        }
    }

    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    pub fn with_vendor_code(mut self, code: i32) -> Self {
        self.vendor_code = code;
        self
    }
}

impl fmt::Display for SqlWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "[{}] {}", state, self.message),
            None => f.write_str(&self.message),
        }
    }
}
