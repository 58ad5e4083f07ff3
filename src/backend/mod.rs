//! Driver-specific glue.
//!
//! One module per client crate, each exposing the same surface: `connect`,
//! `run` (execute one raw statement, errors already normalized), an
//! auto-increment accessor, and teardown. [`BackendHandle`] holds the live
//! driver handle and dispatches to the module matching the resolved backend.

#[cfg(feature = "libsql")]
pub(crate) mod libsql;
#[cfg(feature = "mssql")]
pub(crate) mod mssql;
#[cfg(feature = "mysql")]
pub(crate) mod mysql;
#[cfg(feature = "postgres")]
pub(crate) mod postgres;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;

use crate::error::DbError;
use crate::model::{Backend, Credentials, SqlRow};

/// Raw per-statement execution result before metadata assembly.
#[derive(Debug, Default)]
pub(crate) struct RawExec {
    pub rows: Vec<SqlRow>,
    pub rows_affected: u64,
}

/// The live driver handle, exclusively owned by one `Connection` and
/// released exactly once at teardown.
pub(crate) enum BackendHandle {
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresHandle),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Connection),
    #[cfg(feature = "libsql")]
    Libsql(libsql::LibsqlHandle),
    #[cfg(feature = "mysql")]
    Mysql(mysql_async::Conn),
    #[cfg(feature = "mssql")]
    Mssql(mssql::MssqlClient),
}

/// Open the physical connection for the resolved backend. Every failure
/// maps to [`DbError::Connectivity`].
pub(crate) async fn connect(
    backend: Backend,
    credentials: &Credentials,
) -> Result<BackendHandle, DbError> {
    match backend {
        #[cfg(feature = "postgres")]
        Backend::TokioPostgres => postgres::connect(credentials).await.map(BackendHandle::Postgres),
        #[cfg(feature = "sqlite")]
        Backend::Rusqlite => sqlite::connect(credentials).map(BackendHandle::Sqlite),
        #[cfg(feature = "libsql")]
        Backend::Libsql => libsql::connect(credentials).await.map(BackendHandle::Libsql),
        #[cfg(feature = "mysql")]
        Backend::MysqlAsync => mysql::connect(credentials).await.map(BackendHandle::Mysql),
        #[cfg(feature = "mssql")]
        Backend::Tiberius => mssql::connect(credentials).await.map(BackendHandle::Mssql),
        #[allow(unreachable_patterns)]
        other => Err(DbError::Environment(format!(
            "backend {other} is not compiled into this build"
        ))),
    }
}

/// Execute one statement. Driver errors come back as [`DbError::Sql`] with
/// the backend name and the failing SQL embedded.
pub(crate) async fn run(handle: &mut BackendHandle, sql: &str) -> Result<RawExec, DbError> {
    match handle {
        #[cfg(feature = "postgres")]
        BackendHandle::Postgres(h) => postgres::run(h, sql).await,
        #[cfg(feature = "sqlite")]
        BackendHandle::Sqlite(conn) => sqlite::run(conn, sql),
        #[cfg(feature = "libsql")]
        BackendHandle::Libsql(h) => libsql::run(h, sql).await,
        #[cfg(feature = "mysql")]
        BackendHandle::Mysql(conn) => mysql::run(conn, sql).await,
        #[cfg(feature = "mssql")]
        BackendHandle::Mssql(client) => mssql::run(client, sql).await,
    }
}

/// Backend-generated identifier for the most recent INSERT, when the driver
/// can report one. Failures inside the PostgreSQL save-point probe are
/// recovered locally; no error escapes from here.
pub(crate) async fn last_insert_id(handle: &mut BackendHandle) -> Option<i64> {
    match handle {
        #[cfg(feature = "postgres")]
        BackendHandle::Postgres(h) => postgres::last_insert_id(h).await,
        #[cfg(feature = "sqlite")]
        BackendHandle::Sqlite(conn) => Some(conn.last_insert_rowid()).filter(|id| *id != 0),
        #[cfg(feature = "libsql")]
        BackendHandle::Libsql(h) => libsql::last_insert_id(h),
        #[cfg(feature = "mysql")]
        BackendHandle::Mysql(conn) => mysql::last_insert_id(conn),
        #[cfg(feature = "mssql")]
        BackendHandle::Mssql(client) => mssql::last_insert_id(client).await,
    }
}

/// Release the handle. Only MySQL wants an explicit quit exchange; the other
/// drivers close on drop.
pub(crate) async fn close(handle: BackendHandle) {
    match handle {
        #[cfg(feature = "mysql")]
        BackendHandle::Mysql(conn) => {
            let _ = conn.disconnect().await;
        }
        #[allow(unreachable_patterns)]
        _ => {}
    }
}
