//! PostgreSQL glue via tokio-postgres.
//!
//! Raw statements go through the simple-query protocol, which handles both
//! row-returning and mutating statements in one call and reports the
//! command tag for affected-row counts.

use std::sync::Arc;

use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use super::RawExec;
use crate::error::DbError;
use crate::model::{Backend, Credentials, SqlRow, SqlValue};

const SAVEPOINT: &str = "sqldbal_identity";

/// Client plus the spawned connection task driving its socket.
pub(crate) struct PostgresHandle {
    client: Client,
    worker: tokio::task::JoinHandle<()>,
}

impl Drop for PostgresHandle {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

pub(crate) async fn connect(credentials: &Credentials) -> Result<PostgresHandle, DbError> {
    let mut config = tokio_postgres::Config::new();
    config.dbname(&credentials.database);
    if let Some(host) = &credentials.host {
        config.host(host);
    }
    // Only an explicit port goes into the config; otherwise the driver's
    // own default applies.
    if let Some(port) = credentials.port {
        config.port(port);
    }
    if let Some(user) = &credentials.username {
        config.user(user);
    }
    if let Some(password) = &credentials.password {
        config.password(password);
    }

    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| DbError::connectivity(format!("postgres connect failed: {e}")))?;

    let worker = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "postgres connection task ended");
        }
    });

    Ok(PostgresHandle { client, worker })
}

pub(crate) async fn run(handle: &mut PostgresHandle, sql: &str) -> Result<RawExec, DbError> {
    let messages = handle
        .client
        .simple_query(sql)
        .await
        .map_err(|e| DbError::sql(Backend::TokioPostgres, e.to_string(), sql))?;

    let mut rows = Vec::new();
    let mut column_names: Option<Arc<Vec<String>>> = None;
    let mut command_tag = 0u64;

    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                let names = column_names.get_or_insert_with(|| {
                    Arc::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                });
                let values = (0..names.len())
                    .map(|i| match row.get(i) {
                        Some(text) => SqlValue::Text(text.to_string()),
                        None => SqlValue::Null,
                    })
                    .collect();
                rows.push(SqlRow::new(names.clone(), values));
            }
            SimpleQueryMessage::CommandComplete(n) => command_tag = n,
            _ => {}
        }
    }

    // The SELECT command tag repeats the row count; only a non-row-bearing
    // statement reports rows affected.
    let rows_affected = if rows.is_empty() { command_tag } else { 0 };
    Ok(RawExec {
        rows,
        rows_affected,
    })
}

/// Sequence read for the last INSERT, guarded by a save-point so a failing
/// probe cannot disturb a transaction the caller has open. Nothing escapes
/// from here; a failed read only leaves the id absent.
pub(crate) async fn last_insert_id(handle: &mut PostgresHandle) -> Option<i64> {
    let in_transaction = handle
        .client
        .simple_query(&format!("SAVEPOINT {SAVEPOINT}"))
        .await
        .is_ok();

    if !in_transaction {
        // Autocommit mode: a failed probe is its own statement and poisons
        // no surrounding state.
        return read_lastval(&handle.client).await;
    }

    let id = read_lastval(&handle.client).await;
    if id.is_none() {
        let _ = handle
            .client
            .simple_query(&format!("ROLLBACK TO SAVEPOINT {SAVEPOINT}"))
            .await;
    }
    let _ = handle
        .client
        .simple_query(&format!("RELEASE SAVEPOINT {SAVEPOINT}"))
        .await;
    id
}

async fn read_lastval(client: &Client) -> Option<i64> {
    let messages = client.simple_query("SELECT lastval()").await.ok()?;
    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            return row.get(0).and_then(|text| text.parse().ok());
        }
    }
    None
}
