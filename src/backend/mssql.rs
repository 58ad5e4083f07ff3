//! SQL Server (MSSQL) glue via Tiberius.

use std::sync::Arc;

use tiberius::{AuthMethod, Client};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::RawExec;
use crate::error::DbError;
use crate::model::{is_row_returning, Backend, Credentials, SqlRow, SqlValue};

/// Type alias for the SQL Server client over a compat TCP stream.
pub(crate) type MssqlClient = Client<Compat<TcpStream>>;

pub(crate) async fn connect(credentials: &Credentials) -> Result<MssqlClient, DbError> {
    let mut config = tiberius::Config::new();
    if let Some(host) = &credentials.host {
        config.host(host);
    }
    if let Some(port) = credentials.port {
        config.port(port);
    }
    config.database(&credentials.database);
    config.authentication(AuthMethod::sql_server(
        credentials.username.as_deref().unwrap_or_default(),
        credentials.password.as_deref().unwrap_or_default(),
    ));

    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| DbError::connectivity(format!("mssql tcp connect failed: {e}")))?;
    let tcp = tcp.compat_write();

    Client::connect(config, tcp)
        .await
        .map_err(|e| DbError::connectivity(format!("mssql connect failed: {e}")))
}

pub(crate) async fn run(client: &mut MssqlClient, sql: &str) -> Result<RawExec, DbError> {
    if !is_row_returning(sql) {
        let result = client
            .execute(sql, &[])
            .await
            .map_err(|e| DbError::sql(Backend::Tiberius, e.to_string(), sql))?;
        let rows_affected: u64 = result.rows_affected().iter().sum();
        return Ok(RawExec {
            rows: Vec::new(),
            rows_affected,
        });
    }

    let stream = client
        .simple_query(sql)
        .await
        .map_err(|e| DbError::sql(Backend::Tiberius, e.to_string(), sql))?;
    let result_sets = stream
        .into_results()
        .await
        .map_err(|e| DbError::sql(Backend::Tiberius, e.to_string(), sql))?;

    let mut rows = Vec::new();
    if let Some(first_set) = result_sets.into_iter().next() {
        let mut column_names: Option<Arc<Vec<String>>> = None;
        for row in first_set {
            let names = column_names.get_or_insert_with(|| {
                Arc::new(row.columns().iter().map(|c| c.name().to_string()).collect())
            });
            let mut values = Vec::with_capacity(names.len());
            for i in 0..names.len() {
                values.push(extract_value(&row, i));
            }
            rows.push(SqlRow::new(names.clone(), values));
        }
    }

    Ok(RawExec {
        rows,
        rows_affected: 0,
    })
}

/// Identity value for the last INSERT on this session. Read with a
/// follow-up query; any failure just leaves the id absent.
pub(crate) async fn last_insert_id(client: &mut MssqlClient) -> Option<i64> {
    let stream = client
        .simple_query("SELECT CAST(@@IDENTITY AS BIGINT)")
        .await
        .ok()?;
    let rows = stream.into_first_result().await.ok()?;
    rows.first().and_then(|row| row.try_get::<i64, _>(0).ok().flatten())
}

/// Tiberius exposes typed accessors only, so probe the common types in
/// order until one matches.
fn extract_value(row: &tiberius::Row, idx: usize) -> SqlValue {
    if let Ok(Some(val)) = row.try_get::<i32, _>(idx) {
        return SqlValue::Int(i64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<i64, _>(idx) {
        return SqlValue::Int(val);
    }
    if let Ok(Some(val)) = row.try_get::<f32, _>(idx) {
        return SqlValue::Float(f64::from(val));
    }
    if let Ok(Some(val)) = row.try_get::<f64, _>(idx) {
        return SqlValue::Float(val);
    }
    if let Ok(Some(val)) = row.try_get::<bool, _>(idx) {
        return SqlValue::Bool(val);
    }
    if let Ok(Some(val)) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
        return SqlValue::Timestamp(val);
    }
    if let Ok(Some(val)) = row.try_get::<&str, _>(idx) {
        return SqlValue::Text(val.to_string());
    }
    if let Ok(Some(val)) = row.try_get::<&[u8], _>(idx) {
        return SqlValue::Blob(val.to_vec());
    }
    SqlValue::Null
}
