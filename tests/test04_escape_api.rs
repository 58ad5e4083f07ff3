#![cfg(feature = "sqlite")]

use sql_dbal::{Connection, Credentials, DbError, Family, SqlExecutor, SqlKind};
use tokio::runtime::Runtime;

#[test]
fn escaped_values_round_trip_through_the_database() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let creds = Credentials::new(dir.path().join("escape.db").display().to_string());

    rt.block_on(async {
        let mut conn = Connection::connect(Family::Sqlite, creds).await?;
        conn.execute_one("CREATE TABLE vals (s TEXT, b BLOB, flag TEXT, ts TEXT)")
            .await?;

        let sql = format!(
            "INSERT INTO vals (s, b, flag, ts) VALUES ({}, {}, {}, {})",
            conn.escape_string("it's; tricky"),
            conn.escape_blob(b"\x00\x01binary"),
            conn.escape_boolean(false),
            conn.escape_timestamp("2024-03-05 12:34:56.999")?,
        );
        let outcome = conn.execute_one(&sql).await?;
        assert_eq!(outcome.rows_affected(), 1);

        let select = conn.execute_one("SELECT s, b, flag, ts FROM vals").await?;
        let row = &select.rows()[0];
        assert_eq!(row.get("s").unwrap().as_text(), Some("it's; tricky"));
        assert_eq!(row.get("b").unwrap().as_blob(), Some(&b"\x00\x01binary"[..]));
        assert!(!conn.unescape_boolean(row.get("flag").unwrap().as_text().unwrap()));
        assert_eq!(row.get("ts").unwrap().as_text(), Some("2024-03-05 12:34:56"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn kind_names_drive_the_generic_escape_entry_point() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let creds = Credentials::new(dir.path().join("kinds.db").display().to_string());

    rt.block_on(async {
        let conn = Connection::connect(Family::Sqlite, creds).await?;

        let kind: SqlKind = "timestamp".parse()?;
        assert_eq!(
            conn.escape(kind, "2024-01-02 03:04:05")?,
            "'2024-01-02 03:04:05'"
        );
        assert_eq!(
            conn.unescape(kind, "'2024-01-02 03:04:05'")?,
            "2024-01-02 03:04:05"
        );
        assert_eq!(conn.escape("boolean".parse()?, "0")?, "'0'");

        // An unknown element name is caller misuse.
        assert!(matches!(
            "uuid".parse::<SqlKind>(),
            Err(DbError::Programmer(_))
        ));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
