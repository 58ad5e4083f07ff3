//! # sql-dbal
//!
//! A single-connection, multi-backend SQL access layer. One uniform API for
//! connecting, executing raw SQL, escaping values, and reading result
//! metadata (row counts, generated identifiers) across four database
//! families:
//!
//! | Family | Driver crate | Feature |
//! |--------|--------------|---------|
//! | SQL Server | `tiberius` | `mssql` |
//! | MySQL | `mysql_async` | `mysql` |
//! | PostgreSQL | `tokio-postgres` | `postgres` |
//! | SQLite | `rusqlite` / `libsql` | `sqlite` / `libsql` |
//!
//! The concrete driver is resolved once at connection time; for SQLite the
//! target file's header bytes decide which format generation it is. Every
//! later operation routes through the resolved backend behind one facade.
//!
//! ```no_run
//! use sql_dbal::{Connection, Credentials, Family, SqlExecutor};
//!
//! # async fn demo() -> Result<(), sql_dbal::DbError> {
//! let mut conn = Connection::connect(Family::Sqlite, Credentials::new("app.db")).await?;
//! let outcomes = conn
//!     .execute_raw("INSERT INTO t VALUES (1); INSERT INTO t VALUES (2);")
//!     .await?;
//! assert_eq!(outcomes.len(), 2);
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Out of scope by design: connection pooling, prepared-statement parameter
//! binding, and transaction management. One `Connection` wraps exactly one
//! driver handle; create independent connections for concurrent access.

#[cfg(not(any(
    feature = "postgres",
    feature = "sqlite",
    feature = "mysql",
    feature = "mssql",
    feature = "libsql"
)))]
compile_error!("enable at least one backend feature: postgres, sqlite, mysql, mssql, or libsql");

mod backend;
pub mod codec;
mod connection;
mod error;
mod model;
pub mod resolver;
pub mod splitter;
pub mod translation;

pub use codec::SqlKind;
pub use connection::{Connection, SqlExecutor};
pub use error::DbError;
pub use model::{Backend, Credentials, Family, QueryOutcome, SqlRow, SqlValue};
pub use resolver::resolve;
pub use splitter::split_statements;
pub use translation::SqlTranslator;
