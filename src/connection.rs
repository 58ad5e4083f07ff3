//! The connection facade.
//!
//! One `Connection` owns exactly one driver handle. The family and the
//! resolved backend are fixed at construction; every statement afterwards
//! flows through the same split/execute/normalize/extract pipeline.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{self, BackendHandle};
use crate::codec::{self, SqlKind};
use crate::error::DbError;
use crate::model::{is_insert, Backend, Credentials, Family, QueryOutcome};
use crate::resolver;
use crate::splitter::split_statements;
use crate::translation::SqlTranslator;

/// A single, exclusively-owned database connection.
pub struct Connection {
    family: Family,
    backend: Backend,
    credentials: Credentials,
    handle: Option<BackendHandle>,
    translator: OnceLock<SqlTranslator>,
    total_query_time: Duration,
    debug: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("family", &self.family)
            .field("backend", &self.backend)
            .field("credentials", &self.credentials)
            .field("total_query_time", &self.total_query_time)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

/// Raw statement execution, the surface shared by every backend.
#[async_trait]
pub trait SqlExecutor {
    /// Execute one or more `;`-separated statements in source order,
    /// returning one outcome per executed statement.
    async fn execute_raw(&mut self, sql: &str) -> Result<Vec<QueryOutcome>, DbError>;

    /// Run the dialect translator over `sql` first, then execute.
    async fn execute_translated(&mut self, sql: &str) -> Result<Vec<QueryOutcome>, DbError>;
}

impl Connection {
    /// Resolve the backend for `family`, open the physical connection, and
    /// apply the backend's session settings.
    ///
    /// Fails with [`DbError::Environment`] when the resolved driver is not
    /// compiled in, [`DbError::Connectivity`] when the connection attempt
    /// fails, and never exposes a partially-connected value.
    pub async fn connect(family: Family, credentials: Credentials) -> Result<Self, DbError> {
        let backend = resolver::resolve(family, &credentials)?;
        let handle = backend::connect(backend, &credentials).await?;

        let mut conn = Connection {
            family,
            backend,
            credentials,
            handle: Some(handle),
            translator: OnceLock::new(),
            total_query_time: Duration::ZERO,
            debug: false,
        };
        conn.tune_session().await?;
        Ok(conn)
    }

    /// Parse `family` from text first; an unknown name fails with
    /// [`DbError::Programmer`] before any connection attempt.
    pub async fn connect_by_name(family: &str, credentials: Credentials) -> Result<Self, DbError> {
        let family: Family = family.parse()?;
        Self::connect(family, credentials).await
    }

    /// Backend-specific session settings, issued through the ordinary
    /// execution path; failures surface as normal SQL errors.
    async fn tune_session(&mut self) -> Result<(), DbError> {
        let settings: &[&str] = match self.backend {
            Backend::MysqlAsync => &["SET SESSION sql_mode = 'ANSI,STRICT_ALL_TABLES'"],
            // Short column names keep row lookups consistent with the
            // server-based backends.
            Backend::Rusqlite => &[
                "PRAGMA full_column_names = OFF",
                "PRAGMA short_column_names = ON",
            ],
            Backend::Tiberius => &["SET TEXTSIZE 2147483647"],
            Backend::TokioPostgres => &["SET datestyle TO ISO"],
            Backend::Libsql => &[],
        };
        for sql in settings.iter().copied() {
            self.run_statement(sql).await?;
        }
        Ok(())
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Database name, or file path for the sqlite family.
    pub fn database(&self) -> &str {
        &self.credentials.database
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Running total of wall-clock time spent executing statements.
    pub fn total_query_time(&self) -> Duration {
        self.total_query_time
    }

    /// Convenience wrapper returning the first outcome; most callers send
    /// exactly one statement.
    pub async fn execute_one(&mut self, sql: &str) -> Result<QueryOutcome, DbError> {
        let mut outcomes = self.execute_raw(sql).await?;
        if outcomes.is_empty() {
            return Err(DbError::Programmer("query text is empty".into()));
        }
        Ok(outcomes.remove(0))
    }

    async fn run_statement(&mut self, sql: &str) -> Result<QueryOutcome, DbError> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| DbError::Programmer("connection already closed".into()))?;

        let mut outcome = QueryOutcome::new(sql);
        let started = Instant::now();
        let exec = backend::run(handle, sql).await;
        let elapsed = started.elapsed();
        self.total_query_time += elapsed;
        if self.debug {
            debug!(
                backend = %self.backend,
                elapsed_ms = elapsed.as_millis() as u64,
                sql,
                "statement executed"
            );
        }

        let exec = exec?;
        outcome.set_elapsed(elapsed);
        outcome.set_rows_affected(exec.rows_affected);
        outcome.set_rows(exec.rows);
        if is_insert(sql) {
            outcome.set_generated_id(backend::last_insert_id(handle).await);
        }
        Ok(outcome)
    }

    /// Escape `value` as a literal of the named kind for the active family.
    pub fn escape(&self, kind: SqlKind, value: &str) -> Result<String, DbError> {
        codec::escape(self.family, kind, value)
    }

    /// Reverse [`Connection::escape`] for a value read back as text.
    pub fn unescape(&self, kind: SqlKind, value: &str) -> Result<String, DbError> {
        codec::unescape(self.family, kind, value)
    }

    pub fn escape_string(&self, value: &str) -> String {
        codec::escape_string(self.family, value)
    }

    pub fn unescape_string(&self, value: &str) -> String {
        codec::unescape_string(self.family, value)
    }

    pub fn escape_blob(&self, bytes: &[u8]) -> String {
        codec::escape_blob(self.family, bytes)
    }

    pub fn unescape_blob(&self, value: &str) -> Vec<u8> {
        codec::unescape_blob(self.family, value)
    }

    pub fn escape_boolean(&self, value: bool) -> String {
        codec::escape_boolean(self.family, value)
    }

    pub fn unescape_boolean(&self, value: &str) -> bool {
        codec::unescape_boolean(self.family, value)
    }

    pub fn escape_timestamp(&self, value: &str) -> Result<String, DbError> {
        codec::escape_timestamp(value)
    }

    pub fn unescape_timestamp(&self, value: &str) -> Result<String, DbError> {
        codec::unescape_timestamp(value)
    }

    pub fn escape_date(&self, value: &str) -> Result<String, DbError> {
        codec::escape_date(value)
    }

    pub fn unescape_date(&self, value: &str) -> Result<String, DbError> {
        codec::unescape_date(value)
    }

    pub fn escape_time(&self, value: &str) -> Result<String, DbError> {
        codec::escape_time(value)
    }

    pub fn unescape_time(&self, value: &str) -> Result<String, DbError> {
        codec::unescape_time(value)
    }

    /// Release the driver handle. Safe to call once; later executions fail
    /// with [`DbError::Programmer`].
    pub async fn close(&mut self) -> Result<(), DbError> {
        if let Some(handle) = self.handle.take() {
            debug!(
                backend = %self.backend,
                total_query_time_ms = self.total_query_time.as_millis() as u64,
                "closing connection"
            );
            backend::close(handle).await;
        }
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for Connection {
    async fn execute_raw(&mut self, sql: &str) -> Result<Vec<QueryOutcome>, DbError> {
        if sql.trim().is_empty() {
            return Err(DbError::Programmer("query text is empty".into()));
        }

        let statements = split_statements(sql);
        let mut outcomes = Vec::with_capacity(statements.len());
        for statement in &statements {
            // A failure aborts this statement's pipeline; the remaining
            // statements never run.
            outcomes.push(self.run_statement(statement).await?);
        }
        Ok(outcomes)
    }

    async fn execute_translated(&mut self, sql: &str) -> Result<Vec<QueryOutcome>, DbError> {
        let translator = self
            .translator
            .get_or_init(|| SqlTranslator::new(self.family, self.backend));
        let translated = translator.translate(sql).into_owned();
        self.execute_raw(&translated).await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!(
                backend = %self.backend,
                total_query_time_ms = self.total_query_time.as_millis() as u64,
                "connection dropped without close()"
            );
        }
    }
}
