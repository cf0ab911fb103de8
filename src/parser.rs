//! Query labelling for annotated spans.
//!
//! Only the leading keyword and the first target table are looked at. Nothing
//! here validates or interprets the query.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading keyword class of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Drop,
    Alter,
    Truncate,
    Begin,
    Commit,
    Rollback,
    Call,
    Set,
    Other,
}

impl QueryKind {
    /// Returns the kind as recorded in `db.operation`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::Merge => "MERGE",
            QueryKind::Create => "CREATE",
            QueryKind::Drop => "DROP",
            QueryKind::Alter => "ALTER",
            QueryKind::Truncate => "TRUNCATE",
            QueryKind::Begin => "BEGIN",
            QueryKind::Commit => "COMMIT",
            QueryKind::Rollback => "ROLLBACK",
            QueryKind::Call => "CALL",
            QueryKind::Set => "SET",
            QueryKind::Other => "QUERY",
        }
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" | "VALUES" => QueryKind::Select,
            "INSERT" | "REPLACE" => QueryKind::Insert,
            "UPDATE" => QueryKind::Update,
            "DELETE" => QueryKind::Delete,
            "MERGE" | "UPSERT" => QueryKind::Merge,
            "CREATE" => QueryKind::Create,
            "DROP" => QueryKind::Drop,
            "ALTER" => QueryKind::Alter,
            "TRUNCATE" => QueryKind::Truncate,
            "BEGIN" | "START" => QueryKind::Begin,
            "COMMIT" | "END" => QueryKind::Commit,
            "ROLLBACK" => QueryKind::Rollback,
            "CALL" | "EXEC" | "EXECUTE" => QueryKind::Call,
            "SET" => QueryKind::Set,
            _ => QueryKind::Other,
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Leading keyword, skipping whitespace, `--` line comments and opening parens.
static LEADING_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\s+|--[^\n]*\n|\()*([A-Za-z]+)").unwrap());

// Table name after the clause that names the target, optionally quoted.
static TABLE_AFTER_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bFROM\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static TABLE_AFTER_INTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bINTO\s+[`"\[]?(\w+)[`"\]]?"#).unwrap());

static TABLE_AFTER_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*UPDATE\s+(?:ONLY\s+)?[`"\[]?(\w+)[`"\]]?"#).unwrap());

static TABLE_AFTER_DDL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:TABLE|TRUNCATE)\s+(?:TEMP(?:ORARY)?\s+)?(?:IF\s+(?:NOT\s+)?EXISTS\s+)?(?:TABLE\s+)?[`"\[]?(\w+)[`"\]]?"#,
    )
    .unwrap()
});

/// Classify a query by its leading keyword.
pub fn classify(sql: &str) -> QueryKind {
    LEADING_KEYWORD
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| QueryKind::from_keyword(m.as_str()))
        .unwrap_or(QueryKind::Other)
}

/// Best-effort name of the table a query targets, lowercased.
pub fn target_table(sql: &str, kind: QueryKind) -> Option<String> {
    let regex: &Regex = match kind {
        QueryKind::Select | QueryKind::Delete => &TABLE_AFTER_FROM,
        QueryKind::Insert | QueryKind::Merge => &TABLE_AFTER_INTO,
        QueryKind::Update => &TABLE_AFTER_UPDATE,
        QueryKind::Create | QueryKind::Drop | QueryKind::Alter | QueryKind::Truncate => {
            &TABLE_AFTER_DDL
        }
        _ => return None,
    };

    regex
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Labels derived from a query's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLabel {
    pub kind: QueryKind,
    pub table: Option<String>,
}

impl QueryLabel {
    pub fn of(sql: &str) -> Self {
        let kind = classify(sql);
        let table = target_table(sql, kind);
        Self { kind, table }
    }
}
