//! Driver resolution.
//!
//! Maps a requested [`Family`] to the concrete [`Backend`] compiled into
//! this build. Driver availability is a compile-time property (cargo
//! features); for SQLite the target file's header bytes additionally decide
//! which file-format generation the database is.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::DbError;
use crate::model::{Backend, Credentials, Family};

const SQLITE3_MAGIC: &[u8] = b"SQLite format 3\0";
const SQLITE2_MAGIC: &[u8] = b"** This file contains an SQLite 2";

/// On-disk format generation of an SQLite database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqliteFormat {
    /// SQLite 3.x file, an empty file, or a file that does not exist yet.
    Modern,
    /// SQLite 2.x file. No maintained Rust driver reads these.
    Legacy,
    /// Non-empty file whose header matches no known signature.
    Unrecognized,
}

/// Select the concrete backend for `family`, or fail with a distinguishable
/// error: [`DbError::Environment`] when the desired driver is missing from
/// the build, [`DbError::Connectivity`] when a database file's format is
/// unrecognized. Never falls back silently.
pub fn resolve(family: Family, credentials: &Credentials) -> Result<Backend, DbError> {
    match family {
        Family::Mssql => {
            if cfg!(feature = "mssql") {
                Ok(Backend::Tiberius)
            } else {
                Err(DbError::Environment(
                    "mssql family requires the tiberius driver (crate feature `mssql`)".into(),
                ))
            }
        }
        Family::Mysql => {
            if cfg!(feature = "mysql") {
                Ok(Backend::MysqlAsync)
            } else {
                Err(DbError::Environment(
                    "mysql family requires the mysql_async driver (crate feature `mysql`)".into(),
                ))
            }
        }
        Family::Postgresql => {
            if cfg!(feature = "postgres") {
                Ok(Backend::TokioPostgres)
            } else {
                Err(DbError::Environment(
                    "postgresql family requires the tokio-postgres driver (crate feature `postgres`)"
                        .into(),
                ))
            }
        }
        Family::Sqlite => resolve_sqlite(Path::new(&credentials.database)),
    }
}

fn resolve_sqlite(path: &Path) -> Result<Backend, DbError> {
    let any_sqlite_driver = cfg!(any(feature = "sqlite", feature = "libsql"));

    match probe_file(path)? {
        SqliteFormat::Modern => {
            if cfg!(feature = "sqlite") {
                Ok(Backend::Rusqlite)
            } else if cfg!(feature = "libsql") {
                Ok(Backend::Libsql)
            } else {
                Err(DbError::Environment(
                    "sqlite family requires the rusqlite or libsql driver \
                     (crate feature `sqlite` or `libsql`)"
                        .into(),
                ))
            }
        }
        SqliteFormat::Legacy => {
            let detail = if any_sqlite_driver {
                "the enabled SQLite drivers only read 3.x files"
            } else {
                "no SQLite driver is enabled in this build"
            };
            Err(DbError::Environment(format!(
                "{} is an SQLite 2.x database; {detail}",
                path.display()
            )))
        }
        SqliteFormat::Unrecognized => Err(DbError::Connectivity(format!(
            "{} does not look like an SQLite database (unrecognized file header)",
            path.display()
        ))),
    }
}

/// Read up to the first 64 bytes of `path` and classify the file format. A
/// missing or empty file is compatible with the modern driver, which will
/// create it on first use.
fn probe_file(path: &Path) -> Result<SqliteFormat, DbError> {
    if !path.exists() {
        return Ok(SqliteFormat::Modern);
    }
    let mut header = [0u8; 64];
    let mut file = File::open(path)
        .map_err(|e| DbError::connectivity(format!("cannot read {}: {e}", path.display())))?;
    let n = file
        .read(&mut header)
        .map_err(|e| DbError::connectivity(format!("cannot read {}: {e}", path.display())))?;
    Ok(probe_header(&header[..n]))
}

pub(crate) fn probe_header(header: &[u8]) -> SqliteFormat {
    if header.is_empty() || header.starts_with(SQLITE3_MAGIC) {
        SqliteFormat::Modern
    } else if header.starts_with(SQLITE2_MAGIC) {
        SqliteFormat::Legacy
    } else {
        SqliteFormat::Unrecognized
    }
}
