//! Shared plumbing for relational-backed providers: a
//! `{joins, whereClauses, params}` SQL fragment builder every provider's
//! filter translator composes into one query, plus the
//! `rusqlite::Error` → `TerminologyError` bridge.

use rusqlite::types::Value;
use rusqlite::Connection;
use snomed_loader::TerminologyError;

/// One accumulated SQL translation: join clauses, WHERE predicates, and
/// bound parameters in the order they'll be substituted. A provider's
/// filter method pushes onto this as it walks its `FilterDescriptor`
/// list; `execute_filters` composes the final query from it.
#[derive(Debug, Default)]
pub struct SqlFragment {
    /// `JOIN ...` clauses, appended verbatim after the base table.
    pub joins: Vec<String>,
    /// `WHERE` predicates, ANDed together.
    pub where_clauses: Vec<String>,
    /// Bound parameter values, in the order their `?` placeholders appear.
    pub params: Vec<Value>,
}

impl SqlFragment {
    /// An empty fragment (matches every row until a predicate is added).
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = ?`.
    pub fn equals(&mut self, column: &str, value: impl Into<Value>) {
        self.where_clauses.push(format!("{column} = ?"));
        self.params.push(value.into());
    }

    /// `column IN (?, ?, ...)`. An empty `values` becomes an always-false
    /// predicate rather than an empty `IN ()`, which SQLite rejects.
    pub fn is_in(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            self.where_clauses.push("0".to_string());
            return;
        }
        let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        self.where_clauses.push(format!("{column} IN ({placeholders})"));
        self.params.extend(values.iter().cloned().map(Value::from));
    }

    /// `column LIKE ?`, the stand-in for a `regex` filter op — SQLite has
    /// no built-in regex function without a loadable extension, so this
    /// crate degrades `regex` filters to a LIKE-compatible
    /// substring/prefix match instead of vendoring a regex engine into
    /// the database layer.
    pub fn like(&mut self, column: &str, pattern: impl Into<String>) {
        self.where_clauses.push(format!("{column} LIKE ?"));
        self.params.push(Value::from(pattern.into()));
    }

    /// `true` when the column exists with any non-null value.
    pub fn not_null(&mut self, column: &str) {
        self.where_clauses.push(format!("{column} IS NOT NULL"));
    }

    /// `true` when the column is null or missing.
    pub fn is_null(&mut self, column: &str) {
        self.where_clauses.push(format!("{column} IS NULL"));
    }

    /// Registers a join clause (e.g. `"JOIN rel ON rel.concept_id = t.id"`).
    pub fn join(&mut self, clause: impl Into<String>) {
        self.joins.push(clause.into());
    }

    /// Builds the final `SELECT ... FROM <from> t <joins> [WHERE ...]`
    /// query for the given select list.
    pub fn compose(&self, from: &str, select: &str) -> String {
        let mut sql = format!("SELECT {select} FROM {from} t");
        for j in &self.joins {
            sql.push(' ');
            sql.push_str(j);
        }
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
        sql
    }
}

/// Wraps a `rusqlite::Error` as the shared backend-failure variant, so
/// callers don't need a `From<rusqlite::Error>` for a crate-external
/// error type.
pub fn sql_err(err: rusqlite::Error) -> TerminologyError {
    TerminologyError::BackendFailure(err.to_string())
}

/// Opens a fresh connection per request: avoids one request's open
/// cursor or transaction leaking state into another's.
pub fn open_request_connection(path: &str) -> Result<Connection, TerminologyError> {
    Connection::open(path).map_err(sql_err)
}
