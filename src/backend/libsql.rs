//! SQLite glue via the libsql driver.
//!
//! Serves the sqlite family when the dedicated rusqlite driver is not
//! compiled in. Local files only; the remote/replica modes of the driver
//! are outside this layer's scope.

use std::sync::Arc;

use libsql::Value;

use super::RawExec;
use crate::error::DbError;
use crate::model::{is_row_returning, Backend, Credentials, SqlRow, SqlValue};

/// The database object must outlive its connection, so both travel
/// together.
pub(crate) struct LibsqlHandle {
    _db: libsql::Database,
    conn: libsql::Connection,
}

pub(crate) async fn connect(credentials: &Credentials) -> Result<LibsqlHandle, DbError> {
    let db = libsql::Builder::new_local(&credentials.database)
        .build()
        .await
        .map_err(|e| DbError::connectivity(format!("libsql open failed: {e}")))?;
    let conn = db
        .connect()
        .map_err(|e| DbError::connectivity(format!("libsql connect failed: {e}")))?;
    Ok(LibsqlHandle { _db: db, conn })
}

pub(crate) async fn run(handle: &mut LibsqlHandle, sql: &str) -> Result<RawExec, DbError> {
    if !is_row_returning(sql) {
        let affected = handle
            .conn
            .execute(sql, ())
            .await
            .map_err(|e| DbError::sql(Backend::Libsql, e.to_string(), sql))?;
        return Ok(RawExec {
            rows: Vec::new(),
            rows_affected: affected,
        });
    }

    let mut driver_rows = handle
        .conn
        .query(sql, ())
        .await
        .map_err(|e| DbError::sql(Backend::Libsql, e.to_string(), sql))?;

    let column_count = driver_rows.column_count();
    let column_names: Arc<Vec<String>> = Arc::new(
        (0..column_count)
            .map(|i| driver_rows.column_name(i).unwrap_or_default().to_string())
            .collect(),
    );

    let mut rows = Vec::new();
    while let Some(row) = driver_rows
        .next()
        .await
        .map_err(|e| DbError::sql(Backend::Libsql, e.to_string(), sql))?
    {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_count {
            let value = row
                .get_value(i)
                .map_err(|e| DbError::sql(Backend::Libsql, e.to_string(), sql))?;
            values.push(convert_value(value));
        }
        rows.push(SqlRow::new(column_names.clone(), values));
    }

    Ok(RawExec {
        rows,
        rows_affected: 0,
    })
}

pub(crate) fn last_insert_id(handle: &LibsqlHandle) -> Option<i64> {
    Some(handle.conn.last_insert_rowid()).filter(|id| *id != 0)
}

fn convert_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}
