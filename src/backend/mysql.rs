//! MySQL glue via mysql_async.

use std::sync::Arc;

use mysql_async::prelude::Queryable;
use mysql_async::{Column, Row, Value};

use super::RawExec;
use crate::error::DbError;
use crate::model::{Backend, Credentials, SqlRow, SqlValue};

pub(crate) async fn connect(credentials: &Credentials) -> Result<mysql_async::Conn, DbError> {
    let mut opts = mysql_async::OptsBuilder::default()
        .db_name(Some(credentials.database.clone()))
        .user(credentials.username.clone())
        .pass(credentials.password.clone());
    if let Some(host) = &credentials.host {
        opts = opts.ip_or_hostname(host.clone());
    }
    // An unset port stays with the driver default instead of a hardcoded
    // 3306 here.
    if let Some(port) = credentials.port {
        opts = opts.tcp_port(port);
    }

    mysql_async::Conn::new(opts)
        .await
        .map_err(|e| DbError::connectivity(format!("mysql connect failed: {e}")))
}

pub(crate) async fn run(conn: &mut mysql_async::Conn, sql: &str) -> Result<RawExec, DbError> {
    let mut result = conn
        .query_iter(sql)
        .await
        .map_err(|e| DbError::sql(Backend::MysqlAsync, e.to_string(), sql))?;

    let rows_affected = result.affected_rows();
    let columns = result.columns();
    let driver_rows: Vec<Row> = result
        .collect()
        .await
        .map_err(|e| DbError::sql(Backend::MysqlAsync, e.to_string(), sql))?;

    let mut rows = Vec::new();
    if let Some(columns) = columns {
        let column_names: Arc<Vec<String>> = Arc::new(
            columns
                .iter()
                .map(|c: &Column| c.name_str().into_owned())
                .collect(),
        );
        for row in &driver_rows {
            let values = (0..column_names.len())
                .map(|i| convert_value(row.as_ref(i)))
                .collect();
            rows.push(SqlRow::new(column_names.clone(), values));
        }
    }

    // A row-producing statement reports its row count through the result
    // set, not through rows_affected.
    let rows_affected = if rows.is_empty() { rows_affected } else { 0 };
    Ok(RawExec {
        rows,
        rows_affected,
    })
}

pub(crate) fn last_insert_id(conn: &mysql_async::Conn) -> Option<i64> {
    conn.last_insert_id().map(|id| id as i64)
}

fn convert_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::NULL) => SqlValue::Null,
        Some(Value::Bytes(bytes)) => match std::str::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s.to_string()),
            Err(_) => SqlValue::Blob(bytes.clone()),
        },
        Some(Value::Int(i)) => SqlValue::Int(*i),
        Some(Value::UInt(u)) => SqlValue::Int(*u as i64),
        Some(Value::Float(f)) => SqlValue::Float(f64::from(*f)),
        Some(Value::Double(d)) => SqlValue::Float(*d),
        Some(Value::Date(year, month, day, hour, minute, second, micros)) => {
            chrono::NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .map(SqlValue::Timestamp)
                .unwrap_or(SqlValue::Null)
        }
        Some(Value::Time(neg, days, hours, minutes, seconds, _micros)) => {
            let sign = if *neg { "-" } else { "" };
            let total_hours = u32::from(*days) * 24 + u32::from(*hours);
            SqlValue::Text(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}
