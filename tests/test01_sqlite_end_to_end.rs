#![cfg(feature = "sqlite")]

use sql_dbal::{Backend, Connection, Credentials, DbError, Family, SqlExecutor};
use tokio::runtime::Runtime;

fn temp_db() -> (tempfile::TempDir, Credentials) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.db").display().to_string();
    (dir, Credentials::new(path))
}

#[test]
fn connect_resolves_rusqlite_backend() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let database = creds.database.clone();
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        assert_eq!(conn.family(), Family::Sqlite);
        assert_eq!(conn.backend(), Backend::Rusqlite);
        assert_eq!(conn.database(), database);
        conn.close().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn multi_statement_inserts_report_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_one(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT)",
        )
        .await?;

        let outcomes = conn
            .execute_raw("INSERT INTO t (v) VALUES ('one'); INSERT INTO t (v) VALUES ('two');")
            .await?;
        assert_eq!(outcomes.len(), 2);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.rows_affected(), 1, "statement {i}");
            assert_eq!(outcome.rows_returned(), 0, "statement {i}");
            assert_eq!(outcome.generated_id(), Some(i as i64 + 1), "statement {i}");
        }

        // Source order is preserved.
        let select = conn.execute_one("SELECT id, v FROM t ORDER BY id").await?;
        assert_eq!(select.rows_returned(), 2);
        assert_eq!(select.rows_affected(), 0);
        assert_eq!(select.rows()[0].get("v").unwrap().as_text(), Some("one"));
        assert_eq!(select.rows()[1].get("v").unwrap().as_text(), Some("two"));
        assert_eq!(select.rows()[1].get("id").unwrap().as_int(), Some(2));

        assert!(conn.total_query_time() > std::time::Duration::ZERO);
        conn.close().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn quoted_semicolons_survive_execution() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_one("CREATE TABLE t (v TEXT)").await?;
        let outcomes = conn
            .execute_raw("INSERT INTO t (v) VALUES ('a;b'); INSERT INTO t (v) VALUES ('c');")
            .await?;
        assert_eq!(outcomes.len(), 2);

        let select = conn.execute_one("SELECT v FROM t ORDER BY v").await?;
        assert_eq!(select.rows()[0].get("v").unwrap().as_text(), Some("a;b"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn trigger_body_with_internal_semicolon_is_one_statement()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_raw(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT); \
             CREATE TABLE audit (t_id INTEGER);",
        )
        .await?;

        let sql = "CREATE TRIGGER trg AFTER INSERT ON t \
                   BEGIN INSERT INTO audit VALUES (NEW.id); END; \
                   INSERT INTO t (v) VALUES ('x');";
        let outcomes = conn.execute_raw(sql).await?;
        assert_eq!(outcomes.len(), 2);

        let audit = conn.execute_one("SELECT t_id FROM audit").await?;
        assert_eq!(audit.rows_returned(), 1);
        assert_eq!(audit.rows()[0].get("t_id").unwrap().as_int(), Some(1));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn failing_statement_aborts_remaining_siblings() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_one("CREATE TABLE t (v TEXT)").await?;

        let err = conn
            .execute_raw(
                "INSERT INTO t (v) VALUES ('kept'); \
                 INSERT INTO missing_table VALUES (1); \
                 INSERT INTO t (v) VALUES ('never');",
            )
            .await
            .unwrap_err();
        match err {
            DbError::Sql { backend, sql, .. } => {
                assert_eq!(backend, Backend::Rusqlite);
                assert!(sql.contains("missing_table"));
            }
            other => panic!("expected SQL error, got {other}"),
        }

        let select = conn.execute_one("SELECT v FROM t").await?;
        assert_eq!(select.rows_returned(), 1);
        assert_eq!(select.rows()[0].get("v").unwrap().as_text(), Some("kept"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn blank_sql_is_programmer_error_before_any_backend_call()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        let before = conn.total_query_time();
        assert!(matches!(
            conn.execute_raw("   \n ").await,
            Err(DbError::Programmer(_))
        ));
        assert_eq!(conn.total_query_time(), before);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn closed_connection_rejects_execution() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.close().await?;
        // Idempotent close, then any execution is caller misuse.
        conn.close().await?;
        assert!(matches!(
            conn.execute_raw("SELECT 1").await,
            Err(DbError::Programmer(_))
        ));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn translated_execution_rewrites_boolean_literals() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let (_dir, creds) = temp_db();
    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_one("CREATE TABLE flags (active INTEGER)").await?;
        conn.execute_translated("INSERT INTO flags (active) VALUES (TRUE)")
            .await?;
        let select = conn.execute_one("SELECT active FROM flags").await?;
        assert_eq!(select.rows()[0].get("active").unwrap().as_int(), Some(1));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
