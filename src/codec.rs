//! Per-type value escaping and unescaping.
//!
//! String, blob, and boolean rules differ per family; timestamp, date, and
//! time are rendered in one canonical textual form every supported family
//! accepts.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::DbError;
use crate::model::Family;

/// The kinds of values the codec knows how to escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlKind {
    String,
    Blob,
    Boolean,
    Timestamp,
    Date,
    Time,
}

impl fmt::Display for SqlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlKind::String => "string",
            SqlKind::Blob => "blob",
            SqlKind::Boolean => "boolean",
            SqlKind::Timestamp => "timestamp",
            SqlKind::Date => "date",
            SqlKind::Time => "time",
        };
        f.write_str(name)
    }
}

impl FromStr for SqlKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(SqlKind::String),
            "blob" | "binary" => Ok(SqlKind::Blob),
            "boolean" | "bool" => Ok(SqlKind::Boolean),
            "timestamp" | "datetime" => Ok(SqlKind::Timestamp),
            "date" => Ok(SqlKind::Date),
            "time" => Ok(SqlKind::Time),
            other => Err(DbError::Programmer(format!(
                "unknown escape element '{other}'"
            ))),
        }
    }
}

/// Escape `value` as a `kind` literal for `family`. The result is a complete
/// SQL literal, quoting included where the type calls for it.
pub fn escape(family: Family, kind: SqlKind, value: &str) -> Result<String, DbError> {
    match kind {
        SqlKind::String => Ok(escape_string(family, value)),
        SqlKind::Blob => Ok(escape_blob(family, value.as_bytes())),
        SqlKind::Boolean => Ok(escape_boolean(family, parse_truthy(value))),
        SqlKind::Timestamp => escape_timestamp(value),
        SqlKind::Date => escape_date(value),
        SqlKind::Time => escape_time(value),
    }
}

/// Reverse [`escape`] for values read back as text.
pub fn unescape(family: Family, kind: SqlKind, value: &str) -> Result<String, DbError> {
    match kind {
        SqlKind::String => Ok(unescape_string(family, value)),
        SqlKind::Blob => Ok(String::from_utf8_lossy(&unescape_blob(family, value)).into_owned()),
        SqlKind::Boolean => Ok(if unescape_boolean(family, value) {
            "true".to_string()
        } else {
            "false".to_string()
        }),
        SqlKind::Timestamp => unescape_timestamp(value),
        SqlKind::Date => unescape_date(value),
        SqlKind::Time => unescape_time(value),
    }
}

/// Quote a string literal. MySQL escapes metacharacters with backslashes;
/// the other families have no such syntax and double embedded quotes
/// instead.
pub fn escape_string(family: Family, value: &str) -> String {
    match family {
        Family::Mysql => {
            let mut out = String::with_capacity(value.len() + 2);
            out.push('\'');
            for c in value.chars() {
                match c {
                    '\0' => out.push_str("\\0"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '"' => out.push_str("\\\""),
                    '\x1a' => out.push_str("\\Z"),
                    _ => out.push(c),
                }
            }
            out.push('\'');
            out
        }
        _ => format!("'{}'", value.replace('\'', "''")),
    }
}

pub fn unescape_string(family: Family, value: &str) -> String {
    let inner = strip_quotes(value);
    match family {
        Family::Mysql => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    match chars.next() {
                        Some('0') => out.push('\0'),
                        Some('n') => out.push('\n'),
                        Some('r') => out.push('\r'),
                        Some('Z') => out.push('\x1a'),
                        Some(other) => out.push(other),
                        None => out.push('\\'),
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        _ => inner.replace("''", "'"),
    }
}

/// Render binary data as a literal in the family's blob syntax.
pub fn escape_blob(family: Family, bytes: &[u8]) -> String {
    let hex = hex_encode(bytes);
    match family {
        Family::Postgresql => format!("'\\x{hex}'"),
        Family::Mssql => format!("0x{hex}"),
        Family::Mysql | Family::Sqlite => format!("X'{hex}'"),
    }
}

/// Identity for every family except PostgreSQL, whose bytea values come back
/// in `\x`-prefixed hex form and must be decoded.
pub fn unescape_blob(family: Family, value: &str) -> Vec<u8> {
    if family == Family::Postgresql {
        let inner = strip_quotes(value);
        if let Some(hex) = inner.strip_prefix("\\x") {
            if let Some(bytes) = hex_decode(hex) {
                return bytes;
            }
        }
    }
    value.as_bytes().to_vec()
}

/// Boolean literal: keyword for the families with a boolean type, quoted
/// `'1'`/`'0'` for the rest.
pub fn escape_boolean(family: Family, value: bool) -> String {
    let literal = match (family, value) {
        (Family::Postgresql | Family::Mysql, true) => "TRUE",
        (Family::Postgresql | Family::Mysql, false) => "FALSE",
        (Family::Mssql | Family::Sqlite, true) => "'1'",
        (Family::Mssql | Family::Sqlite, false) => "'0'",
    };
    literal.to_string()
}

/// The family's false marker and any falsy rendering map to `false`;
/// everything else is `true`.
pub fn unescape_boolean(_family: Family, value: &str) -> bool {
    parse_truthy(value)
}

fn parse_truthy(value: &str) -> bool {
    !matches!(
        strip_quotes(value.trim()).to_ascii_lowercase().as_str(),
        "" | "0" | "f" | "false"
    )
}

/// Canonical quoted timestamp literal, `'YYYY-MM-DD HH:MM:SS'`.
pub fn escape_timestamp(value: &str) -> Result<String, DbError> {
    let dt = parse_datetime(value)?;
    Ok(format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")))
}

pub fn unescape_timestamp(value: &str) -> Result<String, DbError> {
    let dt = parse_datetime(value)?;
    Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Canonical quoted date literal, `'YYYY-MM-DD'`.
pub fn escape_date(value: &str) -> Result<String, DbError> {
    let dt = parse_datetime(value)?;
    Ok(format!("'{}'", dt.format("%Y-%m-%d")))
}

pub fn unescape_date(value: &str) -> Result<String, DbError> {
    let dt = parse_datetime(value)?;
    Ok(dt.format("%Y-%m-%d").to_string())
}

/// Canonical quoted time literal, `'HH:MM:SS'`.
pub fn escape_time(value: &str) -> Result<String, DbError> {
    let t = parse_time_of_day(value)?;
    Ok(format!("'{}'", t.format("%H:%M:%S")))
}

pub fn unescape_time(value: &str) -> Result<String, DbError> {
    let t = parse_time_of_day(value)?;
    Ok(t.format("%H:%M:%S").to_string())
}

const DATETIME_SHAPES: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

fn parse_datetime(value: &str) -> Result<NaiveDateTime, DbError> {
    let s = strip_quotes(value.trim());
    for shape in DATETIME_SHAPES {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, shape) {
            return Ok(dt);
        }
    }
    for shape in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, shape) {
            return Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default());
        }
    }
    Err(DbError::Programmer(format!(
        "unparseable date/time value '{s}'"
    )))
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, DbError> {
    let s = strip_quotes(value.trim());
    for shape in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(s, shape) {
            return Ok(t);
        }
    }
    // Accept a full timestamp and keep only its time-of-day part.
    parse_datetime(s).map(|dt| dt.time())
}

fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    for pair in bytes.chunks(2) {
        let s = std::str::from_utf8(pair).ok()?;
        out.push(u8::from_str_radix(s, 16).ok()?);
    }
    Some(out)
}
