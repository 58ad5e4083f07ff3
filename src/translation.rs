//! Dialect translation.
//!
//! Rewrites portable SQL constructs into the active backend's dialect before
//! execution. The scanner leaves single/double-quoted literals and `--` /
//! `/* */` comments untouched.

use std::borrow::Cow;

use crate::model::{Backend, Family};

/// Per-connection SQL rewriter, created lazily on first use of
/// [`crate::Connection::execute_translated`].
#[derive(Debug, Clone)]
pub struct SqlTranslator {
    family: Family,
    #[allow(dead_code)]
    backend: Backend,
}

impl SqlTranslator {
    pub fn new(family: Family, backend: Backend) -> Self {
        SqlTranslator { family, backend }
    }

    /// Rewrite `sql` for the active dialect. Returns a borrowed `Cow` when
    /// no changes are needed.
    pub fn translate<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.family {
            // These two speak the portable forms natively.
            Family::Postgresql | Family::Mysql => Cow::Borrowed(sql),
            Family::Mssql | Family::Sqlite => rewrite(sql, self.family),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

fn rewrite(sql: &str, family: Family) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    // Copied bytes come straight from the (valid UTF-8) input; replacements
    // are ASCII. Buffering bytes keeps multi-byte characters intact.
    let mut out: Option<Vec<u8>> = None;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                if b == b'\'' {
                    state = State::SingleQuoted;
                } else if b == b'"' {
                    state = State::DoubleQuoted;
                } else if b == b'-' && bytes.get(idx + 1) == Some(&b'-') {
                    state = State::LineComment;
                } else if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment;
                } else if is_word_start(b) && !prev_is_word(bytes, idx) {
                    let end = word_end(bytes, idx);
                    let word = &sql[idx..end];
                    if let Some(replacement) = replace_token(word, bytes, end, family) {
                        let buf = out.get_or_insert_with(|| bytes[..idx].to_vec());
                        buf.extend_from_slice(replacement.text.as_bytes());
                        idx = end + replacement.consumed_after;
                        continue;
                    }
                    if let Some(ref mut buf) = out {
                        buf.extend_from_slice(word.as_bytes());
                    }
                    idx = end;
                    continue;
                }
            }
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        push_byte(&mut out, b'\'');
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    push_byte(&mut out, b'*');
                    idx += 1;
                    state = State::Normal;
                }
            }
        }
        push_byte(&mut out, bytes[idx]);
        idx += 1;
    }

    match out {
        Some(buf) => Cow::Owned(String::from_utf8_lossy(&buf).into_owned()),
        None => Cow::Borrowed(sql),
    }
}

struct Replacement {
    text: &'static str,
    /// Extra source bytes consumed past the word itself.
    consumed_after: usize,
}

fn replace_token(
    word: &str,
    bytes: &[u8],
    word_end: usize,
    family: Family,
) -> Option<Replacement> {
    if word.eq_ignore_ascii_case("true") {
        return Some(Replacement {
            text: "1",
            consumed_after: 0,
        });
    }
    if word.eq_ignore_ascii_case("false") {
        return Some(Replacement {
            text: "0",
            consumed_after: 0,
        });
    }
    if family == Family::Mssql
        && word.eq_ignore_ascii_case("now")
        && bytes.get(word_end) == Some(&b'(')
        && bytes.get(word_end + 1) == Some(&b')')
    {
        return Some(Replacement {
            text: "GETDATE()",
            consumed_after: 2,
        });
    }
    None
}

fn push_byte(out: &mut Option<Vec<u8>>, b: u8) {
    if let Some(buf) = out {
        buf.push(b);
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn prev_is_word(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && is_word_byte(bytes[idx - 1])
}

fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && is_word_byte(bytes[idx]) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_and_mysql_are_identity() {
        let t = SqlTranslator::new(Family::Postgresql, Backend::TokioPostgres);
        let sql = "SELECT TRUE, NOW()";
        assert!(matches!(t.translate(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn sqlite_booleans_become_integers() {
        let t = SqlTranslator::new(Family::Sqlite, Backend::Rusqlite);
        assert_eq!(
            t.translate("UPDATE t SET a = TRUE WHERE b = false"),
            "UPDATE t SET a = 1 WHERE b = 0"
        );
    }

    #[test]
    fn mssql_now_becomes_getdate() {
        let t = SqlTranslator::new(Family::Mssql, Backend::Tiberius);
        assert_eq!(
            t.translate("INSERT INTO t (ts) VALUES (now())"),
            "INSERT INTO t (ts) VALUES (GETDATE())"
        );
    }

    #[test]
    fn literals_and_comments_are_untouched() {
        let t = SqlTranslator::new(Family::Sqlite, Backend::Rusqlite);
        let sql = "SELECT 'TRUE', \"false\" -- TRUE\n/* false */ , TRUE";
        assert_eq!(
            t.translate(sql),
            "SELECT 'TRUE', \"false\" -- TRUE\n/* false */ , 1"
        );
    }

    #[test]
    fn identifier_substrings_are_not_rewritten() {
        let t = SqlTranslator::new(Family::Sqlite, Backend::Rusqlite);
        assert_eq!(
            t.translate("SELECT truestory FROM falsehoods"),
            "SELECT truestory FROM falsehoods"
        );
    }
}
