use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DbError;

/// The logical database product targeted, independent of which client crate
/// talks to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Microsoft SQL Server
    Mssql,
    /// MySQL / MariaDB
    Mysql,
    /// PostgreSQL
    Postgresql,
    /// SQLite (embedded file database)
    Sqlite,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Mssql => "mssql",
            Family::Mysql => "mysql",
            Family::Postgresql => "postgresql",
            Family::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mssql" => Ok(Family::Mssql),
            "mysql" => Ok(Family::Mysql),
            "postgresql" | "pgsql" | "postgres" => Ok(Family::Postgresql),
            "sqlite" => Ok(Family::Sqlite),
            other => Err(DbError::Programmer(format!(
                "unsupported database family '{other}'"
            ))),
        }
    }
}

/// The concrete client crate selected to communicate with a family.
///
/// Chosen once by the resolver at construction; never changes for the
/// lifetime of a [`crate::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// SQL Server via the `tiberius` crate
    Tiberius,
    /// MySQL via the `mysql_async` crate
    MysqlAsync,
    /// PostgreSQL via the `tokio-postgres` crate
    TokioPostgres,
    /// SQLite via the `rusqlite` crate
    Rusqlite,
    /// SQLite via the `libsql` crate
    Libsql,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Tiberius => "tiberius",
            Backend::MysqlAsync => "mysql_async",
            Backend::TokioPostgres => "tokio-postgres",
            Backend::Rusqlite => "rusqlite",
            Backend::Libsql => "libsql",
        }
    }

    /// The family this backend serves.
    pub fn family(&self) -> Family {
        match self {
            Backend::Tiberius => Family::Mssql,
            Backend::MysqlAsync => Family::Mysql,
            Backend::TokioPostgres => Family::Postgresql,
            Backend::Rusqlite | Backend::Libsql => Family::Sqlite,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters.
///
/// For the [`Family::Sqlite`] family, `database` is a filesystem path rather
/// than a server-side database name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Credentials {
    pub fn new(database: impl Into<String>) -> Self {
        Credentials {
            database: database.into(),
            ..Default::default()
        }
    }
}

/// A single value read back from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
    Json(JsonValue),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(0) => Some(false),
            SqlValue::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(dt) => Some(*dt),
            SqlValue::Text(s) => {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
            }
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// One row of a materialized result, with column names shared across all
/// rows of the same result set.
#[derive(Debug, Clone)]
pub struct SqlRow {
    column_names: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        SqlRow {
            column_names,
            values,
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Look up a value by column name.
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.column_names
            .iter()
            .position(|c| c == column_name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The outcome of executing exactly one statement.
///
/// Created fresh per statement and owned by the caller; never recycled.
/// `rows_returned` and `rows_affected` are mutually exclusive in practical
/// meaning (a SELECT populates the former, a mutating statement the latter)
/// but both always exist.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    sql: String,
    rows: Vec<SqlRow>,
    rows_returned: usize,
    rows_affected: u64,
    generated_id: Option<i64>,
    elapsed: Duration,
}

impl QueryOutcome {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryOutcome {
            sql: sql.into(),
            ..Default::default()
        }
    }

    /// The exact statement text sent to the backend.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The materialized rows (empty for non-row-returning statements).
    pub fn rows(&self) -> &[SqlRow] {
        &self.rows
    }

    pub fn set_rows(&mut self, rows: Vec<SqlRow>) {
        self.rows_returned = rows.len();
        self.rows = rows;
    }

    /// Count of rows available for retrieval; 0 for non-SELECT statements.
    pub fn rows_returned(&self) -> usize {
        self.rows_returned
    }

    /// Count of rows inserted/updated/deleted by the statement.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn set_rows_affected(&mut self, n: u64) {
        self.rows_affected = n;
    }

    /// The auto-increment/identity value assigned for an INSERT, if any.
    pub fn generated_id(&self) -> Option<i64> {
        self.generated_id
    }

    pub fn set_generated_id(&mut self, id: Option<i64>) {
        self.generated_id = id;
    }

    /// Wall-clock time spent executing this statement.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

/// The first SQL keyword of a statement, lowercased.
pub(crate) fn leading_keyword(sql: &str) -> Option<String> {
    sql.trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
}

pub(crate) fn is_insert(sql: &str) -> bool {
    leading_keyword(sql).as_deref() == Some("insert")
}

/// Whether a statement is expected to produce a row set. Used by the drivers
/// that expose separate query/execute entry points.
#[allow(dead_code)]
pub(crate) fn is_row_returning(sql: &str) -> bool {
    matches!(
        leading_keyword(sql).as_deref(),
        Some("select" | "with" | "values" | "show" | "pragma" | "explain" | "describe")
    )
}
