#![cfg(feature = "postgres")]
//! Runs only when a reachable PostgreSQL server is described through the
//! `SQL_DBAL_PG_HOST` / `SQL_DBAL_PG_PORT` / `SQL_DBAL_PG_DB` /
//! `SQL_DBAL_PG_USER` / `SQL_DBAL_PG_PASSWORD` environment variables.

use sql_dbal::{Backend, Connection, Credentials, Family, SqlExecutor};
use tokio::runtime::Runtime;

fn credentials_from_env() -> Option<Credentials> {
    let host = std::env::var("SQL_DBAL_PG_HOST").ok()?;
    Some(Credentials {
        database: std::env::var("SQL_DBAL_PG_DB").unwrap_or_else(|_| "postgres".into()),
        username: std::env::var("SQL_DBAL_PG_USER").ok(),
        password: std::env::var("SQL_DBAL_PG_PASSWORD").ok(),
        host: Some(host),
        port: std::env::var("SQL_DBAL_PG_PORT")
            .ok()
            .and_then(|p| p.parse().ok()),
    })
}

#[test]
fn insert_reports_sequence_value_without_disturbing_transactions()
-> Result<(), Box<dyn std::error::Error>> {
    let Some(creds) = credentials_from_env() else {
        eprintln!("skipping: SQL_DBAL_PG_HOST not set");
        return Ok(());
    };
    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Postgresql, creds).await?;
        assert_eq!(conn.backend(), Backend::TokioPostgres);

        conn.execute_raw(
            "DROP TABLE IF EXISTS dbal_identity_check; \
             CREATE TABLE dbal_identity_check (id BIGSERIAL PRIMARY KEY, v TEXT);",
        )
        .await?;

        // Autocommit path: the save-point probe falls back to a bare
        // lastval() read.
        let outcome = conn
            .execute_one("INSERT INTO dbal_identity_check (v) VALUES ('a')")
            .await?;
        assert_eq!(outcome.rows_affected(), 1);
        assert_eq!(outcome.generated_id(), Some(1));

        // Inside a caller-opened transaction the probe must leave no
        // visible state behind: the transaction still commits cleanly.
        conn.execute_one("BEGIN").await?;
        let outcome = conn
            .execute_one("INSERT INTO dbal_identity_check (v) VALUES ('b')")
            .await?;
        assert_eq!(outcome.generated_id(), Some(2));
        conn.execute_one("COMMIT").await?;

        let select = conn
            .execute_one("SELECT count(*) AS n FROM dbal_identity_check")
            .await?;
        assert_eq!(select.rows()[0].get("n").unwrap().as_text(), Some("2"));

        // No transaction should be left open by the probe.
        let select = conn
            .execute_one("SELECT now() = statement_timestamp() AS fresh")
            .await?;
        assert_eq!(select.rows_returned(), 1);

        conn.execute_one("DROP TABLE dbal_identity_check").await?;
        conn.close().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
