//! SQLite glue via rusqlite.

use std::sync::Arc;

use rusqlite::types::ValueRef;

use super::RawExec;
use crate::error::DbError;
use crate::model::{Backend, Credentials, SqlRow, SqlValue};

pub(crate) fn connect(credentials: &Credentials) -> Result<rusqlite::Connection, DbError> {
    rusqlite::Connection::open(&credentials.database)
        .map_err(|e| DbError::connectivity(format!("sqlite open failed: {e}")))
}

pub(crate) fn run(conn: &mut rusqlite::Connection, sql: &str) -> Result<RawExec, DbError> {
    let as_sql_err = |e: rusqlite::Error| DbError::sql(Backend::Rusqlite, e.to_string(), sql);

    let mut stmt = conn.prepare(sql).map_err(as_sql_err)?;
    if stmt.column_count() == 0 {
        let affected = stmt.execute([]).map_err(as_sql_err)?;
        return Ok(RawExec {
            rows: Vec::new(),
            rows_affected: affected as u64,
        });
    }

    let column_names: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let mut rows = Vec::new();
    let mut rows_iter = stmt.query([]).map_err(as_sql_err)?;
    while let Some(row) = rows_iter.next().map_err(as_sql_err)? {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            values.push(extract_value(row, i).map_err(as_sql_err)?);
        }
        rows.push(SqlRow::new(column_names.clone(), values));
    }

    Ok(RawExec {
        rows,
        rows_affected: 0,
    })
}

fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<SqlValue, rusqlite::Error> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    })
}
